//! Attack table.
//!
//! Every attack type maps to one fixed definition. Damage scaling lives here
//! too because it is part of the contract clients use to predict feedback.

use serde::{Deserialize, Serialize};

use crate::constants::DAMAGE_BONUS_PER_LEVEL;
use crate::skills::SkillKey;

/// Attack types a client may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackType {
    /// Melee swing, hits everything in its arc.
    Sword,
    /// Narrow ranged shot, hits the nearest target.
    Archer,
    /// Wider ranged bolt, hits the nearest target.
    Mage,
}

/// How an attack picks its victims.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttackFamily {
    /// Every eligible target is hit.
    Melee,
    /// Only the nearest eligible target is hit, after aim spread.
    Ranged {
        /// Total angular spread in degrees.
        spread_deg: f32,
    },
}

/// Tuning for one attack type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackDefinition {
    /// Per-type cooldown.
    pub cooldown_ms: u64,
    /// Maximum 3D distance to a target.
    pub range: f32,
    /// Full field-of-view angle in degrees.
    pub fov_deg: f32,
    /// Base damage at skill level 1.
    pub damage: u32,
    /// Experience awarded to the attacker per hit.
    pub xp_on_hit: u32,
    /// Skill track trained and used for scaling.
    pub skill: SkillKey,
    /// Target selection behaviour.
    pub family: AttackFamily,
}

const SWORD: AttackDefinition = AttackDefinition {
    cooldown_ms: 900,
    range: 3.2,
    fov_deg: 95.0,
    damage: 16,
    xp_on_hit: 14,
    skill: SkillKey::SwordPrecision,
    family: AttackFamily::Melee,
};

const ARCHER: AttackDefinition = AttackDefinition {
    cooldown_ms: 700,
    range: 28.0,
    fov_deg: 14.0,
    damage: 13,
    xp_on_hit: 11,
    skill: SkillKey::ArcheryAccuracy,
    family: AttackFamily::Ranged { spread_deg: 3.5 },
};

const MAGE: AttackDefinition = AttackDefinition {
    cooldown_ms: 1100,
    range: 24.0,
    fov_deg: 20.0,
    damage: 19,
    xp_on_hit: 12,
    skill: SkillKey::MagicControl,
    family: AttackFamily::Ranged { spread_deg: 6.0 },
};

impl AttackType {
    /// All attack types.
    pub const ALL: [Self; 3] = [Self::Sword, Self::Archer, Self::Mage];

    /// Returns the fixed definition for this attack.
    #[inline]
    #[must_use]
    pub const fn definition(self) -> &'static AttackDefinition {
        match self {
            Self::Sword => &SWORD,
            Self::Archer => &ARCHER,
            Self::Mage => &MAGE,
        }
    }

    /// Decodes a wire name (`"sword"`, `"archer"`, `"mage"`).
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "sword" => Some(Self::Sword),
            "archer" => Some(Self::Archer),
            "mage" => Some(Self::Mage),
            _ => None,
        }
    }

    /// Dense index, used for per-type cooldown slots.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Sword => 0,
            Self::Archer => 1,
            Self::Mage => 2,
        }
    }
}

/// Damage after the skill bonus: each level above 1 adds a flat 2%.
#[must_use]
pub fn scaled_damage(base_damage: u32, skill_level: u32) -> u32 {
    let bonus = f64::from(skill_level.saturating_sub(1)) * DAMAGE_BONUS_PER_LEVEL;
    (f64::from(base_damage) * (1.0 + bonus)).round() as u32
}
