//! # Arena Room
//!
//! One authoritative arena instance.
//!
//! ## Tick Order (20Hz)
//!
//! ```text
//! between ticks:  join / leave / move (slot overwrite) / attack (resolved now)
//! 1. Stamp server time
//! 2. Integrate every player from its latest move intent
//! 3. Revive dummies whose timer expired
//! 4. Publish the world (full or delta) to the outbox
//! ```
//!
//! The room is plain synchronous state. It never blocks and never sleeps;
//! the runner owns the clock and the channels.

mod combat;
mod movement;
mod respawn;
mod session;
pub mod state;

pub use movement::NonFiniteState;
pub use session::PlayerSession;
pub use state::{ArenaState, Dummy, Player};

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use pathbound_security::{sanitize_attack, sanitize_display_name, sanitize_move, Rejection};
use pathbound_shared::protocol::{
    Archetype, AttackIntent, AttackRequest, ClientMessage, JoinRequest, MoveIntent, PlayerId,
    ServerMessage, WorldSnapshot,
};

use crate::config::RoomConfig;
use crate::error::{ArenaError, ArenaResult};
use crate::sync::SnapshotEncoder;

/// Room statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoomStats {
    /// Total ticks processed.
    pub ticks: u64,
    /// Players that joined.
    pub joins: u64,
    /// Players that left.
    pub leaves: u64,
    /// Attack intents that passed validation.
    pub attacks_accepted: u64,
    /// Attack intents dropped by validation.
    pub attacks_rejected: u64,
    /// Hits landed.
    pub hits: u64,
    /// Total damage dealt.
    pub damage_dealt: u64,
    /// Dummies revived.
    pub dummies_revived: u64,
    /// Integrations rolled back for non-finite state.
    pub movement_faults: u64,
}

/// The arena room.
pub struct ArenaRoom {
    /// Configuration.
    config: RoomConfig,
    /// Replicated world.
    state: ArenaState,
    /// Per-player runtime state.
    sessions: BTreeMap<PlayerId, PlayerSession>,
    /// Next session id to hand out.
    next_player_id: u32,
    /// Aim spread and respawn points.
    rng: ChaCha8Rng,
    /// Publication encoder.
    encoder: SnapshotEncoder,
    /// Messages waiting to be broadcast.
    outbox: Vec<ServerMessage>,
    /// Stats.
    stats: RoomStats,
}

impl ArenaRoom {
    /// Creates a room with the dummy ring seeded and no players.
    #[must_use]
    pub fn new(config: RoomConfig, now_ms: u64) -> Self {
        let seed = config.rng_seed.unwrap_or_else(clock_seed);
        let encoder = SnapshotEncoder::new(config.full_snapshot_interval);
        Self {
            config,
            state: ArenaState::new(now_ms),
            sessions: BTreeMap::new(),
            next_player_id: 1,
            rng: ChaCha8Rng::seed_from_u64(seed),
            encoder,
            outbox: Vec::new(),
            stats: RoomStats::default(),
        }
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Admits a player.
    ///
    /// # Errors
    ///
    /// [`ArenaError::RoomFull`] when the room is at capacity.
    pub fn join(&mut self, request: &JoinRequest, now_ms: u64) -> ArenaResult<PlayerId> {
        if self.state.player_count() >= self.config.max_clients {
            return Err(ArenaError::RoomFull {
                capacity: self.config.max_clients,
            });
        }

        let joined_count = self.state.player_count() + 1;
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        let name = sanitize_display_name(request.display_name.as_deref(), joined_count);
        let archetype = request
            .archetype
            .as_deref()
            .and_then(Archetype::from_wire)
            .unwrap_or_default();
        let mut player = Player::new(id, name, archetype, respawn::join_spawn_point(joined_count));
        player.external_id = request.external_id.clone();

        info!(player = %id, name = %player.name, ?archetype, "player joined");
        self.state.insert_player(player);
        self.sessions.insert(id, PlayerSession::new(now_ms));
        self.encoder.force_full();
        self.stats.joins += 1;
        Ok(id)
    }

    /// Removes a player and all of its runtime state.
    ///
    /// Idempotent: returns false, and changes nothing, for unknown ids.
    pub fn leave(&mut self, id: PlayerId, code: u16) -> bool {
        let session = self.sessions.remove(&id);
        let Some(player) = self.state.remove_player(id) else {
            return false;
        };

        let (session_ms, moves) = session.map_or((0, 0), |s| {
            (
                self.state.server_time().saturating_sub(s.joined_at()),
                s.moves_received(),
            )
        });
        info!(player = %id, name = %player.name, code, session_ms, moves, "player left");
        self.outbox.push(ServerMessage::PlayerLeft {
            player_id: id,
            code,
        });
        self.encoder.force_full();
        self.stats.leaves += 1;
        true
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Dispatches one decoded client message.
    pub fn handle(&mut self, id: PlayerId, message: ClientMessage, now_ms: u64) {
        match message {
            ClientMessage::Move(intent) => self.submit_move(id, intent),
            ClientMessage::Attack(request) => {
                // rejections are already logged and counted
                let _ = self.submit_attack(id, &request, now_ms);
            }
        }
    }

    /// Overwrites a player's move slot. Unknown players are ignored.
    pub fn submit_move(&mut self, id: PlayerId, intent: MoveIntent) {
        match self.sessions.get_mut(&id) {
            Some(session) => session.set_intent(sanitize_move(intent)),
            None => debug!(player = %id, "move from unknown player ignored"),
        }
    }

    /// Validates and resolves an attack immediately.
    ///
    /// Hits are queued as `combat_feedback` messages. Returns the number of
    /// hits.
    ///
    /// # Errors
    ///
    /// The [`Rejection`] that dropped the intent. Nothing was changed.
    pub fn submit_attack(
        &mut self,
        id: PlayerId,
        request: &AttackRequest,
        now_ms: u64,
    ) -> Result<usize, Rejection> {
        let outcome = self.admit_attack(id, request, now_ms);
        if let Some(session) = self.sessions.get_mut(&id) {
            session.record_attack(outcome.is_ok());
        }

        let intent = match outcome {
            Ok(intent) => intent,
            Err(rejection) => {
                debug!(player = %id, reason = %rejection, "attack dropped");
                self.stats.attacks_rejected += 1;
                return Err(rejection);
            }
        };
        self.stats.attacks_accepted += 1;

        let hits = combat::resolve_attack(&mut self.state, id, &intent, now_ms, &mut self.rng);
        for hit in &hits {
            debug!(
                player = %id,
                target = ?hit.target,
                attack = ?hit.attack_type,
                damage = hit.damage,
                target_hp = hit.target_hp,
                "hit"
            );
            self.stats.hits += 1;
            self.stats.damage_dealt += u64::from(hit.damage);
        }

        let count = hits.len();
        self.outbox
            .extend(hits.into_iter().map(ServerMessage::CombatFeedback));
        Ok(count)
    }

    fn admit_attack(
        &mut self,
        id: PlayerId,
        request: &AttackRequest,
        now_ms: u64,
    ) -> Result<AttackIntent, Rejection> {
        let facing = match self.state.player(id) {
            Some(attacker) if attacker.is_alive() => attacker.yaw,
            _ => return Err(Rejection::AttackerUnavailable),
        };
        let intent = sanitize_attack(request, facing)?;
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(Rejection::AttackerUnavailable)?;
        session.gates_mut().admit(&intent, facing, now_ms)?;
        Ok(intent)
    }

    // =========================================================================
    // SIMULATION
    // =========================================================================

    /// Advances the world by `dt` seconds. Negative deltas count as zero.
    pub fn update(&mut self, dt: f32, now_ms: u64) {
        let dt = dt.max(0.0);
        self.stats.ticks += 1;
        self.state.set_server_time(now_ms);

        let sessions = &mut self.sessions;
        for player in self.state.players_mut() {
            let intent = sessions
                .get_mut(&player.id)
                .map_or(MoveIntent::IDLE, PlayerSession::take_intent);
            if let Err(fault) = movement::integrate(player, &intent, dt) {
                warn!(player = %player.id, %fault, "movement rolled back");
                self.stats.movement_faults += 1;
            }
        }

        let revived = respawn::refresh_dummies(self.state.dummies_mut(), now_ms);
        if revived > 0 {
            debug!(revived, "dummies revived");
        }
        self.stats.dummies_revived += revived as u64;
    }

    /// Makes the next publication a full snapshot.
    pub fn request_full(&mut self) {
        self.encoder.force_full();
    }

    /// Queues this tick's world publication.
    pub fn publish(&mut self) {
        let patch = self.encoder.encode(self.state.snapshot());
        self.outbox.push(ServerMessage::State(patch));
    }

    /// Takes every queued outbound message, oldest first.
    pub fn drain_outbox(&mut self) -> std::vec::Drain<'_, ServerMessage> {
        self.outbox.drain(..)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Full snapshot of the world as it is now.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        self.state.snapshot()
    }

    /// Read-only world access.
    #[must_use]
    pub const fn state(&self) -> &ArenaState {
        &self.state
    }

    /// Runtime state of one player.
    #[must_use]
    pub fn session(&self, id: PlayerId) -> Option<&PlayerSession> {
        self.sessions.get(&id)
    }

    /// Number of connected players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.state.player_count()
    }

    /// Room statistics.
    #[must_use]
    pub const fn stats(&self) -> &RoomStats {
        &self.stats
    }

    /// Room configuration.
    #[must_use]
    pub const fn config(&self) -> &RoomConfig {
        &self.config
    }

    // =========================================================================
    // TEST-ONLY METHODS
    // =========================================================================

    /// Mutable world access, bypassing every rule.
    ///
    /// ONLY for tests and benchmarks that need to stage positions or health.
    #[doc(hidden)]
    pub fn test_state_mut(&mut self) -> &mut ArenaState {
        &mut self.state
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathbound_shared::attacks::AttackType;
    use pathbound_shared::math::Vec3;
    use pathbound_shared::protocol::{leave_code, DummyId, TargetRef, WorldPatch};
    use pathbound_shared::skills::SkillKey;

    const T0: u64 = 1_700_000_000_000;

    fn room() -> ArenaRoom {
        let config = RoomConfig {
            rng_seed: Some(1),
            ..RoomConfig::default()
        };
        ArenaRoom::new(config, T0)
    }

    fn join(room: &mut ArenaRoom, name: &str) -> PlayerId {
        room.join(&JoinRequest::new(name, Archetype::Swordsman), T0)
            .unwrap()
    }

    fn feedback(room: &mut ArenaRoom) -> Vec<pathbound_shared::protocol::CombatFeedback> {
        room.drain_outbox()
            .filter_map(|m| match m {
                ServerMessage::CombatFeedback(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_join_sanitizes_options() {
        let mut room = room();
        let first = room
            .join(
                &JoinRequest {
                    display_name: Some("   ".into()),
                    archetype: Some("Necromancer".into()),
                    external_id: Some("ext-1".into()),
                },
                T0,
            )
            .unwrap();
        let second = join(&mut room, "  Kaito the Extremely Verbose  ");

        let p1 = room.state().player(first).unwrap();
        assert_eq!(p1.name, "Player-1");
        assert_eq!(p1.archetype, Archetype::Swordsman);
        assert_eq!(p1.external_id.as_deref(), Some("ext-1"));
        assert!((p1.position.x - 0.8f32.cos() * 5.0).abs() < 1e-5);

        let p2 = room.state().player(second).unwrap();
        assert_eq!(p2.name, "Kaito the Extrem");
        assert!((p2.position.z - 1.6f32.sin() * 5.0).abs() < 1e-5);
        assert_ne!(first, second);
    }

    #[test]
    fn test_room_full() {
        let config = RoomConfig {
            max_clients: 2,
            rng_seed: Some(1),
            ..RoomConfig::default()
        };
        let mut room = ArenaRoom::new(config, T0);
        join(&mut room, "a");
        join(&mut room, "b");

        let err = room.join(&JoinRequest::default(), T0).unwrap_err();
        assert!(matches!(err, ArenaError::RoomFull { capacity: 2 }));
        assert_eq!(room.player_count(), 2);
    }

    #[test]
    fn test_leave_is_idempotent() {
        let mut room = room();
        let id = join(&mut room, "a");
        room.drain_outbox().for_each(drop);

        assert!(room.leave(id, leave_code::CONSENTED));
        let before = room.snapshot();

        assert!(!room.leave(id, leave_code::CONSENTED));
        assert!(!room.leave(PlayerId(999), leave_code::NORMAL));
        assert_eq!(room.snapshot(), before);
        assert!(room.session(id).is_none());

        let left: Vec<_> = room.drain_outbox().collect();
        assert_eq!(
            left,
            vec![ServerMessage::PlayerLeft {
                player_id: id,
                code: leave_code::CONSENTED
            }]
        );
    }

    #[test]
    fn test_sword_hit_end_to_end() {
        let mut room = room();
        let attacker = join(&mut room, "attacker");
        let _bystander = join(&mut room, "bystander");

        let world = room.test_state_mut();
        world.player_mut(attacker).unwrap().position = Vec3::ZERO;
        world.dummies_mut()[0].position = Vec3::new(0.0, 0.0, 2.0);

        let hits = room
            .submit_attack(attacker, &AttackRequest::new(AttackType::Sword, 0.0), T0)
            .unwrap();
        assert_eq!(hits, 1);

        let events = feedback(&mut room);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target, TargetRef::Dummy(DummyId(1)));
        assert_eq!(events[0].damage, 16);

        assert_eq!(room.state().dummy(DummyId(1)).map(|d| d.hp), Some(140 - 16));
        let attacker = room.state().player(attacker).unwrap();
        assert_eq!(attacker.skills.xp(SkillKey::SwordPrecision), 14);
    }

    #[test]
    fn test_attack_pipeline_rejections() {
        let mut room = room();
        let id = join(&mut room, "a");

        assert_eq!(
            room.submit_attack(PlayerId(42), &AttackRequest::new(AttackType::Sword, 0.0), T0),
            Err(Rejection::AttackerUnavailable)
        );
        assert_eq!(
            room.submit_attack(id, &AttackRequest::default(), T0),
            Err(Rejection::UnknownAttackType)
        );
        assert!(matches!(
            room.submit_attack(id, &AttackRequest::new(AttackType::Mage, 2.0), T0),
            Err(Rejection::FacingDrift { .. })
        ));

        assert!(room
            .submit_attack(id, &AttackRequest::new(AttackType::Mage, 0.0), T0)
            .is_ok());
        assert!(matches!(
            room.submit_attack(id, &AttackRequest::new(AttackType::Archer, 0.0), T0 + 50),
            Err(Rejection::RateLimited { .. })
        ));
        assert!(matches!(
            room.submit_attack(id, &AttackRequest::new(AttackType::Mage, 0.0), T0 + 500),
            Err(Rejection::OnCooldown { .. })
        ));

        let session = room.session(id).unwrap();
        assert_eq!(session.attacks_accepted(), 1);
        assert_eq!(session.attacks_rejected(), 4);
        assert_eq!(room.stats().attacks_rejected, 5);
    }

    #[test]
    fn test_dead_attacker_rejected() {
        let mut room = room();
        let id = join(&mut room, "a");
        room.test_state_mut().player_mut(id).unwrap().hp = 0;

        assert_eq!(
            room.submit_attack(id, &AttackRequest::new(AttackType::Sword, 0.0), T0),
            Err(Rejection::AttackerUnavailable)
        );
    }

    #[test]
    fn test_update_moves_players_and_tracks_facing() {
        let mut room = room();
        let id = join(&mut room, "a");
        let start = room.state().player(id).unwrap().position;

        room.submit_move(
            id,
            MoveIntent {
                move_z: 1.0,
                yaw: 0.0,
                ..MoveIntent::IDLE
            },
        );
        room.update(0.05, T0 + 50);

        let player = room.state().player(id).unwrap();
        assert!((player.position.z - (start.z + 0.35)).abs() < 1e-4);
        assert_eq!(room.state().server_time(), T0 + 50);
        assert_eq!(room.stats().ticks, 1);
    }

    #[test]
    fn test_dummy_respawn_round_trip() {
        let mut room = room();
        let id = join(&mut room, "a");
        let world = room.test_state_mut();
        world.player_mut(id).unwrap().position = Vec3::ZERO;
        world.dummies_mut()[0].position = Vec3::new(0.0, 0.0, 2.0);
        world.dummies_mut()[0].hp = 5;

        room.submit_attack(id, &AttackRequest::new(AttackType::Sword, 0.0), T0)
            .unwrap();
        let dummy = room.state().dummy(DummyId(1)).unwrap();
        assert_eq!(dummy.hp, 0);
        assert_eq!(dummy.respawn_at, Some(T0 + 3_500));

        // untargetable while dead
        assert_eq!(
            room.submit_attack(id, &AttackRequest::new(AttackType::Sword, 0.0), T0 + 1_000),
            Ok(0)
        );

        room.update(0.05, T0 + 3_450);
        assert_eq!(room.state().dummy(DummyId(1)).map(|d| d.hp), Some(0));

        room.update(0.05, T0 + 3_500);
        let dummy = room.state().dummy(DummyId(1)).unwrap();
        assert_eq!(dummy.hp, dummy.max_hp);
        assert_eq!(dummy.respawn_at, None);

        room.update(0.05, T0 + 3_550);
        assert_eq!(room.state().dummy(DummyId(1)).map(|d| d.hp), Some(140));
        assert_eq!(room.stats().dummies_revived, 1);
    }

    #[test]
    fn test_publish_full_after_join_then_delta() {
        let mut room = room();
        join(&mut room, "a");

        room.update(0.05, T0 + 50);
        room.publish();
        room.update(0.05, T0 + 100);
        room.publish();
        join(&mut room, "b");
        room.update(0.05, T0 + 150);
        room.publish();

        let patches: Vec<_> = room
            .drain_outbox()
            .filter_map(|m| match m {
                ServerMessage::State(patch) => Some(patch),
                _ => None,
            })
            .collect();
        assert!(matches!(patches[0], WorldPatch::Full { seq: 1, .. }));
        assert!(matches!(patches[1], WorldPatch::Delta { seq: 2, .. }));
        assert!(matches!(patches[2], WorldPatch::Full { seq: 3, .. }));
    }

    #[test]
    fn test_request_full_resets_delta_chain() {
        let mut room = room();
        room.update(0.05, T0 + 50);
        room.publish();
        room.update(0.05, T0 + 100);
        room.publish();
        room.request_full();
        room.update(0.05, T0 + 150);
        room.publish();

        let patches: Vec<_> = room
            .drain_outbox()
            .filter_map(|m| match m {
                ServerMessage::State(patch) => Some(patch),
                _ => None,
            })
            .collect();
        assert!(matches!(patches[1], WorldPatch::Delta { seq: 2, .. }));
        assert!(matches!(patches[2], WorldPatch::Full { seq: 3, .. }));
    }
}
