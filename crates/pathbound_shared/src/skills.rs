//! Skill tracks and the progression model.
//!
//! Every player carries four independent skill tracks. A track only stores
//! experience; the level is always derived from it, so the two can never
//! drift apart.

use serde::{Deserialize, Serialize};

use crate::constants::XP_PER_LEVEL;

/// One of the four progression tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillKey {
    /// Trained by archer hits.
    ArcheryAccuracy,
    /// Trained by sword hits.
    SwordPrecision,
    /// Not trained by any attack yet.
    Assassination,
    /// Trained by mage hits.
    MagicControl,
}

impl SkillKey {
    /// All skill keys, in wire order.
    pub const ALL: [Self; 4] = [
        Self::ArcheryAccuracy,
        Self::SwordPrecision,
        Self::Assassination,
        Self::MagicControl,
    ];

    const fn index(self) -> usize {
        match self {
            Self::ArcheryAccuracy => 0,
            Self::SwordPrecision => 1,
            Self::Assassination => 2,
            Self::MagicControl => 3,
        }
    }
}

/// Derives a level from accumulated experience.
///
/// `level = 1 + floor(xp / XP_PER_LEVEL)`.
#[inline]
#[must_use]
pub const fn level_from_xp(xp: u32) -> u32 {
    1 + xp / XP_PER_LEVEL
}

/// Result of adding experience to a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XpGain {
    /// Experience after the change.
    pub xp: u32,
    /// Level derived from `xp`.
    pub level: u32,
}

/// Adds `amount` to `current_xp`, flooring the result at zero.
#[must_use]
pub fn add_xp(current_xp: u32, amount: i64) -> XpGain {
    let xp = (i64::from(current_xp) + amount).clamp(0, i64::from(u32::MAX)) as u32;
    XpGain {
        xp,
        level: level_from_xp(xp),
    }
}

/// Experience held by the four skill tracks of one player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkillTracks {
    xp: [u32; 4],
}

impl SkillTracks {
    /// Fresh tracks: 0 xp, level 1 everywhere.
    #[must_use]
    pub const fn new() -> Self {
        Self { xp: [0; 4] }
    }

    /// Experience of one track.
    #[inline]
    #[must_use]
    pub const fn xp(&self, skill: SkillKey) -> u32 {
        self.xp[skill.index()]
    }

    /// Level of one track.
    #[inline]
    #[must_use]
    pub const fn level(&self, skill: SkillKey) -> u32 {
        level_from_xp(self.xp(skill))
    }

    /// Awards experience to one track and returns the new state of that track.
    pub fn award(&mut self, skill: SkillKey, amount: u32) -> XpGain {
        let gain = add_xp(self.xp(skill), i64::from(amount));
        self.xp[skill.index()] = gain.xp;
        gain
    }

    /// Iterates `(skill, xp, level)` in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (SkillKey, u32, u32)> + '_ {
        SkillKey::ALL
            .into_iter()
            .map(|skill| (skill, self.xp(skill), self.level(skill)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_xp_below_boundary() {
        assert_eq!(add_xp(0, 20), XpGain { xp: 20, level: 1 });
    }

    #[test]
    fn test_add_xp_crosses_boundary_once() {
        assert_eq!(add_xp(95, 15), XpGain { xp: 110, level: 2 });
    }

    #[test]
    fn test_add_xp_floors_at_zero() {
        assert_eq!(add_xp(10, -50), XpGain { xp: 0, level: 1 });
    }

    #[test]
    fn test_level_from_xp() {
        assert_eq!(level_from_xp(0), 1);
        assert_eq!(level_from_xp(99), 1);
        assert_eq!(level_from_xp(100), 2);
        assert_eq!(level_from_xp(1050), 11);
    }

    #[test]
    fn test_tracks_are_independent() {
        let mut tracks = SkillTracks::new();
        tracks.award(SkillKey::SwordPrecision, 140);

        assert_eq!(tracks.xp(SkillKey::SwordPrecision), 140);
        assert_eq!(tracks.level(SkillKey::SwordPrecision), 2);
        assert_eq!(tracks.xp(SkillKey::ArcheryAccuracy), 0);
        assert_eq!(tracks.level(SkillKey::MagicControl), 1);
    }
}
