//! # Arena World State
//!
//! The authoritative state of one room.
//!
//! ## Design
//!
//! - Players in an ordered map, keyed by session id
//! - Dummies in a vector, seeded once and never removed
//! - Snapshots are produced by a separate pass, not by the entities

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use pathbound_shared::constants::{
    DUMMY_COUNT, DUMMY_INNER_RADIUS, DUMMY_MAX_HEALTH, DUMMY_OUTER_RADIUS, PLAYER_MAX_HEALTH,
};
use pathbound_shared::math::Vec3;
use pathbound_shared::protocol::{
    Archetype, DummyId, DummyView, PlayerId, PlayerView, SkillView, WorldSnapshot,
};
use pathbound_shared::skills::SkillTracks;

/// A connected player's authoritative state.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    /// Session id.
    pub id: PlayerId,
    /// Sanitized display name.
    pub name: String,
    /// Combat class.
    pub archetype: Archetype,
    /// External identity reference, if the client supplied one.
    pub external_id: Option<String>,
    /// Position. `y` is height above the ground plane.
    pub position: Vec3,
    /// Vertical velocity.
    pub vy: f32,
    /// Standing on the ground.
    pub on_ground: bool,
    /// Facing, taken from the latest move intent.
    pub yaw: f32,
    /// Current health.
    pub hp: u32,
    /// Maximum health.
    pub max_hp: u32,
    /// Progression.
    pub skills: SkillTracks,
}

impl Player {
    /// Creates a fresh player at `position`, grounded and at full health.
    #[must_use]
    pub fn new(id: PlayerId, name: String, archetype: Archetype, position: Vec3) -> Self {
        Self {
            id,
            name,
            archetype,
            external_id: None,
            position,
            vy: 0.0,
            on_ground: true,
            yaw: 0.0,
            hp: PLAYER_MAX_HEALTH,
            max_hp: PLAYER_MAX_HEALTH,
            skills: SkillTracks::new(),
        }
    }

    /// Returns true while hp is above zero.
    #[inline]
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Replicated view of this player.
    #[must_use]
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            archetype: self.archetype,
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            yaw: self.yaw,
            vy: self.vy,
            on_ground: self.on_ground,
            hp: self.hp,
            max_hp: self.max_hp,
            skills: self
                .skills
                .iter()
                .map(|(skill, xp, level)| SkillView { skill, xp, level })
                .collect(),
        }
    }
}

/// A training dummy.
#[derive(Clone, Debug, PartialEq)]
pub struct Dummy {
    /// Dummy id.
    pub id: DummyId,
    /// Fixed position.
    pub position: Vec3,
    /// Current health.
    pub hp: u32,
    /// Maximum health.
    pub max_hp: u32,
    /// Revival time while dead.
    pub respawn_at: Option<u64>,
}

impl Dummy {
    /// Returns true while hp is above zero.
    #[inline]
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Replicated view of this dummy.
    #[must_use]
    pub const fn view(&self) -> DummyView {
        DummyView {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            hp: self.hp,
            max_hp: self.max_hp,
            respawn_at: self.respawn_at,
        }
    }
}

/// The fixed dummy ring: even indices on the outer radius, odd on the inner.
#[must_use]
pub fn seed_dummies() -> Vec<Dummy> {
    (0..DUMMY_COUNT)
        .map(|index| {
            let angle = index as f32 / DUMMY_COUNT as f32 * TAU;
            let radius = if index % 2 == 0 {
                DUMMY_OUTER_RADIUS
            } else {
                DUMMY_INNER_RADIUS
            };
            Dummy {
                id: DummyId(index as u16 + 1),
                position: Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius),
                hp: DUMMY_MAX_HEALTH,
                max_hp: DUMMY_MAX_HEALTH,
                respawn_at: None,
            }
        })
        .collect()
}

/// Room world state.
///
/// Contains all state that is synchronized to clients.
#[derive(Clone, Debug)]
pub struct ArenaState {
    /// Connected players.
    players: BTreeMap<PlayerId, Player>,
    /// Training dummies, in id order.
    dummies: Vec<Dummy>,
    /// Server time of the last update (ms since the Unix epoch).
    server_time: u64,
}

impl ArenaState {
    /// Creates a world with the dummy ring seeded and no players.
    #[must_use]
    pub fn new(server_time: u64) -> Self {
        Self {
            players: BTreeMap::new(),
            dummies: seed_dummies(),
            server_time,
        }
    }

    /// Adds a player, replacing any previous entry with the same id.
    pub fn insert_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Removes a player. Unknown ids are ignored.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Gets a player by id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Gets a mutable player reference.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Iterates over players in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Iterates mutably over players in id order.
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Number of connected players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Dummies in id order.
    #[must_use]
    pub fn dummies(&self) -> &[Dummy] {
        &self.dummies
    }

    /// Mutable dummies in id order.
    pub fn dummies_mut(&mut self) -> &mut [Dummy] {
        &mut self.dummies
    }

    /// Gets a dummy by id.
    #[must_use]
    pub fn dummy(&self, id: DummyId) -> Option<&Dummy> {
        self.dummies.iter().find(|d| d.id == id)
    }

    /// Gets a mutable dummy reference.
    pub fn dummy_mut(&mut self, id: DummyId) -> Option<&mut Dummy> {
        self.dummies.iter_mut().find(|d| d.id == id)
    }

    /// Server time of the last update.
    #[must_use]
    pub const fn server_time(&self) -> u64 {
        self.server_time
    }

    /// Stamps the server time.
    pub fn set_server_time(&mut self, now_ms: u64) {
        self.server_time = now_ms;
    }

    /// Generates a full world snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            server_time: self.server_time,
            players: self.players.values().map(Player::view).collect(),
            dummies: self.dummies.iter().map(Dummy::view).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_creation() {
        let state = ArenaState::new(1_000);
        assert_eq!(state.player_count(), 0);
        assert_eq!(state.dummies().len(), DUMMY_COUNT);
        assert_eq!(state.server_time(), 1_000);
    }

    #[test]
    fn test_dummy_ring() {
        let dummies = seed_dummies();

        assert_eq!(dummies[0].id, DummyId(1));
        assert!((dummies[0].position.x - 16.0).abs() < 1e-4);
        assert!(dummies[0].position.z.abs() < 1e-4);

        // index 2 sits at a quarter turn on the outer ring
        assert!(dummies[2].position.x.abs() < 1e-4);
        assert!((dummies[2].position.z - 16.0).abs() < 1e-4);

        // odd indices use the inner ring
        let inner = dummies[1].position.planar().length();
        assert!((inner - 12.0).abs() < 1e-4);

        assert!(dummies.iter().all(|d| d.hp == 140 && d.respawn_at.is_none()));
    }

    #[test]
    fn test_player_management() {
        let mut state = ArenaState::new(0);
        let id = PlayerId(1);
        state.insert_player(Player::new(id, "Rin".into(), Archetype::Mage, Vec3::ZERO));

        assert_eq!(state.player_count(), 1);
        assert_eq!(state.player(id).map(|p| p.hp), Some(100));

        assert!(state.remove_player(id).is_some());
        assert!(state.remove_player(id).is_none());
        assert_eq!(state.player_count(), 0);
    }

    #[test]
    fn test_snapshot_generation() {
        let mut state = ArenaState::new(0);
        state.insert_player(Player::new(PlayerId(2), "B".into(), Archetype::Archer, Vec3::ZERO));
        state.insert_player(Player::new(PlayerId(1), "A".into(), Archetype::Mage, Vec3::ZERO));
        state.set_server_time(42);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.server_time, 42);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].id, PlayerId(1));
        assert_eq!(snapshot.players[0].skills.len(), 4);
        assert!(snapshot.players[0].skills.iter().all(|s| s.level == 1 && s.xp == 0));
        assert_eq!(snapshot.dummies.len(), DUMMY_COUNT);
    }
}
