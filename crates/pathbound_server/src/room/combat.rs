//! # Combat Resolution
//!
//! Applies an admitted attack intent to the world.
//!
//! ## Families
//!
//! - **Melee**: every eligible target in the arc is hit
//! - **Ranged**: the aim is perturbed by the spread, then only the nearest
//!   eligible target is hit (strictly nearer replaces, so ties go to the
//!   first one scanned)
//!
//! Dummies are scanned before players, both in id order. The attacker never
//! targets itself.

use rand::Rng;

use pathbound_security::is_within_range_and_arc;
use pathbound_shared::attacks::{scaled_damage, AttackFamily, AttackType};
use pathbound_shared::math::{Vec2, Vec3};
use pathbound_shared::protocol::{AttackIntent, CombatFeedback, PlayerId, TargetRef};

use super::respawn::{respawn_player, schedule_dummy_respawn};
use super::state::ArenaState;

/// Resolves an attack that already passed every gate.
///
/// Returns one feedback event per hit, in hit order. An attacker that is no
/// longer in the world resolves to nothing.
pub fn resolve_attack<R: Rng + ?Sized>(
    state: &mut ArenaState,
    attacker_id: PlayerId,
    intent: &AttackIntent,
    now_ms: u64,
    rng: &mut R,
) -> Vec<CombatFeedback> {
    let Some(origin) = state.player(attacker_id).map(|p| p.position) else {
        return Vec::new();
    };
    let definition = intent.kind.definition();

    let aim = aim_yaw(intent.yaw, definition.family, rng);
    let forward = Vec2::from_yaw(aim);
    let targets = collect_targets(state, attacker_id, origin, forward, intent.kind);

    let chosen: Vec<TargetRef> = match definition.family {
        AttackFamily::Melee => targets.into_iter().map(|(target, _)| target).collect(),
        AttackFamily::Ranged { .. } => nearest(origin, targets).into_iter().collect(),
    };

    chosen
        .into_iter()
        .filter_map(|target| apply_hit(state, attacker_id, target, intent.kind, now_ms, rng))
        .collect()
}

/// Aim direction after spread: melee is exact, ranged deviates by up to
/// half the spread either side.
pub fn aim_yaw<R: Rng + ?Sized>(intent_yaw: f32, family: AttackFamily, rng: &mut R) -> f32 {
    match family {
        AttackFamily::Melee => intent_yaw,
        AttackFamily::Ranged { spread_deg } => {
            intent_yaw + (rng.gen::<f32>() - 0.5) * spread_deg.to_radians()
        }
    }
}

/// Living targets inside the attack's range and arc, dummies first.
fn collect_targets(
    state: &ArenaState,
    attacker_id: PlayerId,
    origin: Vec3,
    forward: Vec2,
    kind: AttackType,
) -> Vec<(TargetRef, Vec3)> {
    let definition = kind.definition();
    let eligible =
        |position: Vec3| is_within_range_and_arc(origin, position, forward, definition.range, definition.fov_deg);

    let dummies = state
        .dummies()
        .iter()
        .filter(|d| d.is_alive() && eligible(d.position))
        .map(|d| (TargetRef::Dummy(d.id), d.position));
    let players = state
        .players()
        .filter(|p| p.id != attacker_id && p.is_alive() && eligible(p.position))
        .map(|p| (TargetRef::Player(p.id), p.position));

    dummies.chain(players).collect()
}

fn nearest(origin: Vec3, targets: Vec<(TargetRef, Vec3)>) -> Option<TargetRef> {
    let mut best: Option<(TargetRef, f32)> = None;
    for (target, position) in targets {
        let distance = origin.distance_squared(position);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((target, distance)),
        }
    }
    best.map(|(target, _)| target)
}

/// Damages one target, awards xp and builds the feedback event.
///
/// Damage uses the attacker's skill level before this hit's xp is added.
fn apply_hit<R: Rng + ?Sized>(
    state: &mut ArenaState,
    attacker_id: PlayerId,
    target: TargetRef,
    kind: AttackType,
    now_ms: u64,
    rng: &mut R,
) -> Option<CombatFeedback> {
    let definition = kind.definition();
    let level = state.player(attacker_id)?.skills.level(definition.skill);
    let damage = scaled_damage(definition.damage, level);

    let (target_hp, target_max_hp) = match target {
        TargetRef::Dummy(id) => {
            let dummy = state.dummy_mut(id)?;
            dummy.hp = dummy.hp.saturating_sub(damage);
            if dummy.hp == 0 {
                schedule_dummy_respawn(dummy, now_ms);
            }
            (dummy.hp, dummy.max_hp)
        }
        TargetRef::Player(id) => {
            let victim = state.player_mut(id)?;
            victim.hp = victim.hp.saturating_sub(damage);
            if victim.hp == 0 {
                respawn_player(victim, rng);
            }
            (victim.hp, victim.max_hp)
        }
    };

    let attacker = state.player_mut(attacker_id)?;
    let gain = attacker.skills.award(definition.skill, definition.xp_on_hit);

    Some(CombatFeedback {
        source_id: attacker_id,
        target,
        attack_type: kind,
        damage,
        skill: definition.skill,
        skill_level: gain.level,
        xp_awarded: definition.xp_on_hit,
        target_hp,
        target_max_hp,
        timestamp: now_ms,
    })
}
