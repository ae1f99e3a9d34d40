//! # State Synchronization
//!
//! Turns per-tick world snapshots into sequenced publications, and applies
//! them on the receiving side.
//!
//! ## Publications
//!
//! ```text
//! seq:     1      2      3      4   join   5      6  ...  N
//!        [FULL] [Δ 1] [Δ 2] [Δ 3]   ──►  [FULL] [Δ 5]     [FULL] (interval)
//! ```
//!
//! - A full snapshot goes out first, after any join or leave, and every
//!   `full_snapshot_interval` publications
//! - A delta only carries players and dummies that changed since the
//!   previous publication, plus removed player ids
//! - Sequence numbers only move forward; a mirror refuses stale or gapped
//!   patches and waits for the next full snapshot

use thiserror::Error;

use pathbound_shared::protocol::{
    DummyView, PlayerId, PlayerView, WorldPatch, WorldSnapshot, PROTOCOL_VERSION,
};

/// Server-side publication encoder.
#[derive(Clone, Debug)]
pub struct SnapshotEncoder {
    /// Sequence of the last publication.
    seq: u64,
    /// World as of the last publication.
    last: Option<WorldSnapshot>,
    /// Next publication must be full.
    force_full: bool,
    /// Publications since the last full one.
    since_full: u64,
    /// Forced full interval.
    full_interval: u64,
}

impl SnapshotEncoder {
    /// Creates an encoder. The first publication is always full.
    #[must_use]
    pub fn new(full_interval: u64) -> Self {
        Self {
            seq: 0,
            last: None,
            force_full: true,
            since_full: 0,
            full_interval: full_interval.max(1),
        }
    }

    /// Makes the next publication a full snapshot.
    pub fn force_full(&mut self) {
        self.force_full = true;
    }

    /// Sequence of the last publication (0 before the first).
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Encodes the next publication.
    pub fn encode(&mut self, snapshot: WorldSnapshot) -> WorldPatch {
        self.seq += 1;
        let seq = self.seq;

        let full_due = self.force_full || self.since_full + 1 >= self.full_interval;
        let patch = match self.last.as_ref() {
            Some(previous) if !full_due => {
                self.since_full += 1;
                diff(previous, &snapshot, seq)
            }
            _ => {
                self.force_full = false;
                self.since_full = 0;
                WorldPatch::Full {
                    version: PROTOCOL_VERSION,
                    seq,
                    snapshot: snapshot.clone(),
                }
            }
        };

        self.last = Some(snapshot);
        patch
    }
}

/// Delta from `previous` to `current`. Both lists are ordered by id.
fn diff(previous: &WorldSnapshot, current: &WorldSnapshot, seq: u64) -> WorldPatch {
    let players = current
        .players
        .iter()
        .filter(|p| find_player(&previous.players, p.id) != Some(*p))
        .cloned()
        .collect();
    let removed_players = previous
        .players
        .iter()
        .filter(|p| find_player(&current.players, p.id).is_none())
        .map(|p| p.id)
        .collect();
    let dummies = current
        .dummies
        .iter()
        .filter(|d| previous.dummies.iter().find(|old| old.id == d.id) != Some(*d))
        .cloned()
        .collect();

    WorldPatch::Delta {
        version: PROTOCOL_VERSION,
        seq,
        base_seq: seq - 1,
        server_time: current.server_time,
        players,
        removed_players,
        dummies,
    }
}

fn find_player(players: &[PlayerView], id: PlayerId) -> Option<&PlayerView> {
    players
        .binary_search_by_key(&id, |p| p.id)
        .ok()
        .map(|index| &players[index])
}

/// Why a mirror refused a patch.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorError {
    /// Patch was produced by an incompatible protocol version.
    #[error("protocol version {found}, expected {expected}")]
    VersionMismatch {
        /// Version carried by the patch.
        found: u16,
        /// Version this mirror understands.
        expected: u16,
    },
    /// Patch is not newer than the mirror.
    #[error("stale patch {seq} (mirror at {current})")]
    Stale {
        /// Patch sequence.
        seq: u64,
        /// Mirror sequence.
        current: u64,
    },
    /// Delta does not apply on top of the mirror's state.
    #[error("gap: delta based on {base_seq}, mirror at {current:?}")]
    Gap {
        /// Base the delta expects.
        base_seq: u64,
        /// Mirror sequence, `None` before the first full snapshot.
        current: Option<u64>,
    },
}

/// Receiving-side copy of the world, rebuilt from publications.
#[derive(Clone, Debug, Default)]
pub struct WorldMirror {
    /// Sequence of the last applied patch.
    seq: Option<u64>,
    /// Reconstructed world.
    snapshot: WorldSnapshot,
}

impl WorldMirror {
    /// Creates an empty mirror waiting for a full snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence of the last applied patch.
    #[must_use]
    pub const fn seq(&self) -> Option<u64> {
        self.seq
    }

    /// Reconstructed world.
    #[must_use]
    pub const fn snapshot(&self) -> &WorldSnapshot {
        &self.snapshot
    }

    /// Applies one publication.
    ///
    /// # Errors
    ///
    /// The patch is refused and the mirror is left unchanged when it comes
    /// from another protocol version, is not newer than the mirror, or is a
    /// delta whose base is not the mirror's current sequence.
    pub fn apply(&mut self, patch: &WorldPatch) -> Result<(), MirrorError> {
        let (version, seq) = match patch {
            WorldPatch::Full { version, seq, .. } | WorldPatch::Delta { version, seq, .. } => {
                (*version, *seq)
            }
        };
        if version != PROTOCOL_VERSION {
            return Err(MirrorError::VersionMismatch {
                found: version,
                expected: PROTOCOL_VERSION,
            });
        }
        if let Some(current) = self.seq {
            if seq <= current {
                return Err(MirrorError::Stale { seq, current });
            }
        }

        match patch {
            WorldPatch::Full { snapshot, .. } => {
                self.snapshot = snapshot.clone();
            }
            WorldPatch::Delta {
                base_seq,
                server_time,
                players,
                removed_players,
                dummies,
                ..
            } => {
                if self.seq != Some(*base_seq) {
                    return Err(MirrorError::Gap {
                        base_seq: *base_seq,
                        current: self.seq,
                    });
                }
                self.snapshot.server_time = *server_time;
                self.snapshot.players.retain(|p| !removed_players.contains(&p.id));
                for player in players {
                    upsert_player(&mut self.snapshot.players, player);
                }
                for dummy in dummies {
                    upsert_dummy(&mut self.snapshot.dummies, dummy);
                }
            }
        }

        self.seq = Some(seq);
        Ok(())
    }
}

fn upsert_player(players: &mut Vec<PlayerView>, player: &PlayerView) {
    match players.binary_search_by_key(&player.id, |p| p.id) {
        Ok(index) => players[index] = player.clone(),
        Err(index) => players.insert(index, player.clone()),
    }
}

fn upsert_dummy(dummies: &mut Vec<DummyView>, dummy: &DummyView) {
    match dummies.binary_search_by_key(&dummy.id, |d| d.id) {
        Ok(index) => dummies[index] = dummy.clone(),
        Err(index) => dummies.insert(index, dummy.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::state::{ArenaState, Player};
    use pathbound_shared::math::Vec3;
    use pathbound_shared::protocol::Archetype;

    fn world() -> ArenaState {
        let mut state = ArenaState::new(1_000);
        for id in 1..=2 {
            state.insert_player(Player::new(
                PlayerId(id),
                format!("p{id}"),
                Archetype::Archer,
                Vec3::new(id as f32, 0.0, 0.0),
            ));
        }
        state
    }

    #[test]
    fn test_first_publication_is_full() {
        let mut encoder = SnapshotEncoder::new(100);
        let patch = encoder.encode(world().snapshot());
        assert!(matches!(patch, WorldPatch::Full { seq: 1, .. }));
        assert_eq!(encoder.seq(), 1);
    }

    #[test]
    fn test_delta_carries_only_changes() {
        let mut state = world();
        let mut encoder = SnapshotEncoder::new(100);
        encoder.encode(state.snapshot());

        state.player_mut(PlayerId(2)).unwrap().position.x = 9.0;
        state.dummies_mut()[4].hp = 1;
        state.set_server_time(1_050);

        let WorldPatch::Delta {
            seq,
            base_seq,
            server_time,
            players,
            removed_players,
            dummies,
            ..
        } = encoder.encode(state.snapshot())
        else {
            panic!("expected delta");
        };
        assert_eq!((seq, base_seq, server_time), (2, 1, 1_050));
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, PlayerId(2));
        assert!(removed_players.is_empty());
        assert_eq!(dummies.len(), 1);
        assert_eq!(dummies[0].hp, 1);
    }

    #[test]
    fn test_forced_and_periodic_full() {
        let state = world();
        let mut encoder = SnapshotEncoder::new(3);

        assert!(matches!(encoder.encode(state.snapshot()), WorldPatch::Full { .. }));
        assert!(matches!(encoder.encode(state.snapshot()), WorldPatch::Delta { .. }));
        assert!(matches!(encoder.encode(state.snapshot()), WorldPatch::Delta { .. }));
        assert!(matches!(encoder.encode(state.snapshot()), WorldPatch::Full { seq: 4, .. }));

        encoder.force_full();
        assert!(matches!(encoder.encode(state.snapshot()), WorldPatch::Full { seq: 5, .. }));
    }

    #[test]
    fn test_mirror_tracks_server() {
        let mut state = world();
        let mut encoder = SnapshotEncoder::new(100);
        let mut mirror = WorldMirror::new();

        mirror.apply(&encoder.encode(state.snapshot())).unwrap();

        state.remove_player(PlayerId(1));
        state.player_mut(PlayerId(2)).unwrap().hp = 40;
        state.dummies_mut()[0].hp = 0;
        state.dummies_mut()[0].respawn_at = Some(9_999);
        mirror.apply(&encoder.encode(state.snapshot())).unwrap();

        state.insert_player(Player::new(PlayerId(3), "p3".into(), Archetype::Mage, Vec3::ZERO));
        mirror.apply(&encoder.encode(state.snapshot())).unwrap();

        assert_eq!(mirror.seq(), Some(3));
        assert_eq!(mirror.snapshot(), &state.snapshot());
    }

    #[test]
    fn test_mirror_refuses_stale_and_gapped() {
        let state = world();
        let mut encoder = SnapshotEncoder::new(100);
        let mut mirror = WorldMirror::new();

        let first = encoder.encode(state.snapshot());
        let second = encoder.encode(state.snapshot());
        let third = encoder.encode(state.snapshot());

        // a delta before any full snapshot has nothing to apply on
        assert_eq!(
            mirror.apply(&second),
            Err(MirrorError::Gap {
                base_seq: 1,
                current: None
            })
        );

        mirror.apply(&first).unwrap();
        assert_eq!(
            mirror.apply(&third),
            Err(MirrorError::Gap {
                base_seq: 2,
                current: Some(1)
            })
        );
        mirror.apply(&second).unwrap();
        assert_eq!(
            mirror.apply(&first),
            Err(MirrorError::Stale { seq: 1, current: 2 })
        );
        assert_eq!(mirror.seq(), Some(2));
    }

    #[test]
    fn test_mirror_refuses_other_versions() {
        let mut mirror = WorldMirror::new();
        let patch = WorldPatch::Full {
            version: PROTOCOL_VERSION + 1,
            seq: 1,
            snapshot: WorldSnapshot::default(),
        };
        assert!(matches!(
            mirror.apply(&patch),
            Err(MirrorError::VersionMismatch { .. })
        ));
        assert_eq!(mirror.seq(), None);
    }
}
