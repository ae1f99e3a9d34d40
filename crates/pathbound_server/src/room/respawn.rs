//! # Respawn Scheduling
//!
//! Spawn points and revival rules.
//!
//! - Joining players spawn on a fixed spiral of the spawn circle
//! - Dead dummies revive once their respawn time is reached
//! - Dead players respawn immediately at a random point of the respawn band

use std::f32::consts::TAU;

use rand::Rng;

use pathbound_shared::constants::{
    DUMMY_RESPAWN_MS, RESPAWN_RADIUS_MIN, RESPAWN_RADIUS_SPAN, SPAWN_ANGLE_STEP, SPAWN_RADIUS,
};
use pathbound_shared::math::Vec3;

use super::state::{Dummy, Player};

/// Join spawn point for the `joined_count`-th player (1-based, counting the joiner).
#[must_use]
pub fn join_spawn_point(joined_count: usize) -> Vec3 {
    let angle = joined_count as f32 * SPAWN_ANGLE_STEP;
    Vec3::new(angle.cos() * SPAWN_RADIUS, 0.0, angle.sin() * SPAWN_RADIUS)
}

/// Marks a dummy that just reached 0 hp for revival.
pub fn schedule_dummy_respawn(dummy: &mut Dummy, now_ms: u64) {
    dummy.respawn_at = Some(now_ms + DUMMY_RESPAWN_MS);
}

/// Revives every dead dummy whose respawn time has been reached.
///
/// Returns how many were revived.
pub fn refresh_dummies(dummies: &mut [Dummy], now_ms: u64) -> usize {
    let mut revived = 0;
    for dummy in dummies.iter_mut().filter(|d| !d.is_alive()) {
        // a dead dummy without a timer is revived straight away
        if dummy.respawn_at.map_or(true, |at| now_ms >= at) {
            dummy.hp = dummy.max_hp;
            dummy.respawn_at = None;
            revived += 1;
        }
    }
    revived
}

/// Restores a dead player to full health at a random point of the respawn band.
pub fn respawn_player<R: Rng + ?Sized>(player: &mut Player, rng: &mut R) {
    let angle = rng.gen::<f32>() * TAU;
    let radius = RESPAWN_RADIUS_MIN + rng.gen::<f32>() * RESPAWN_RADIUS_SPAN;

    player.hp = player.max_hp;
    player.position = Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);
    player.vy = 0.0;
    player.on_ground = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::state::seed_dummies;
    use pathbound_shared::protocol::{Archetype, PlayerId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_join_spawn_point() {
        let first = join_spawn_point(1);
        assert!((first.x - 0.8f32.cos() * 5.0).abs() < 1e-5);
        assert!((first.z - 0.8f32.sin() * 5.0).abs() < 1e-5);
        assert_eq!(first.y, 0.0);
        assert!((join_spawn_point(7).planar().length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_dummy_revives_at_threshold() {
        let mut dummies = seed_dummies();
        dummies[0].hp = 0;
        schedule_dummy_respawn(&mut dummies[0], 10_000);
        assert_eq!(dummies[0].respawn_at, Some(13_500));

        assert_eq!(refresh_dummies(&mut dummies, 13_499), 0);
        assert!(!dummies[0].is_alive());

        assert_eq!(refresh_dummies(&mut dummies, 13_500), 1);
        assert_eq!(dummies[0].hp, dummies[0].max_hp);
        assert_eq!(dummies[0].respawn_at, None);
    }

    #[test]
    fn test_living_dummies_untouched() {
        let mut dummies = seed_dummies();
        dummies[3].hp = 50;
        assert_eq!(refresh_dummies(&mut dummies, u64::MAX), 0);
        assert_eq!(dummies[3].hp, 50);
    }

    #[test]
    fn test_player_respawn_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut player = Player::new(PlayerId(1), "p".into(), Archetype::Archer, Vec3::ZERO);

        for _ in 0..200 {
            player.hp = 0;
            player.position = Vec3::new(30.0, 3.0, 30.0);
            player.vy = -4.0;
            player.on_ground = false;

            respawn_player(&mut player, &mut rng);

            let radius = player.position.planar().length();
            assert!((4.0 - 1e-4..8.0 + 1e-4).contains(&radius));
            assert_eq!(player.hp, player.max_hp);
            assert_eq!(player.position.y, 0.0);
            assert_eq!(player.vy, 0.0);
            assert!(player.on_ground);
        }
    }
}
