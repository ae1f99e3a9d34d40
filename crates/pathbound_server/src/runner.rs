//! # Room Runner
//!
//! Drives one [`ArenaRoom`] on its own tokio task.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  RoomCommand (mpsc)  ┌───────────────────────────┐
//! │  RoomHandle  │ ───────────────────► │        room task          │
//! │  (cloneable) │                      │                           │
//! └──────────────┘                      │  select! {                │
//!        ▲                              │    command => apply now   │
//!        │   ServerMessage (broadcast)  │    interval => tick 20Hz  │
//!        └───────────────────────────── │  }                        │
//!                                       └───────────────────────────┘
//! ```
//!
//! The task is the only owner of the room, so commands and ticks never
//! interleave. Attacks resolve as soon as their command is received;
//! movement waits for the next tick. Outbound messages are flushed after
//! every command and every tick.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use pathbound_shared::protocol::{leave_code, ClientMessage, JoinRequest, PlayerId, ServerMessage};

use crate::config::RoomConfig;
use crate::error::{ArenaError, ArenaResult};
use crate::room::{ArenaRoom, RoomStats};
use crate::tick::{TickStats, TickTimer};

/// Requests accepted by a room task.
#[derive(Debug)]
pub enum RoomCommand {
    /// Admit a player.
    Join {
        /// Join options.
        request: JoinRequest,
        /// Receives the new session id.
        reply: oneshot::Sender<ArenaResult<PlayerId>>,
    },
    /// Remove a player.
    Leave {
        /// Who is leaving.
        id: PlayerId,
        /// Disconnect reason.
        code: u16,
    },
    /// A decoded client message.
    Message {
        /// Sender.
        id: PlayerId,
        /// Message.
        message: ClientMessage,
    },
    /// Subscribe to the room's broadcast. The next publication is full.
    Subscribe {
        /// Receives the new subscription.
        reply: oneshot::Sender<broadcast::Receiver<ServerMessage>>,
    },
    /// Make the next publication full, for subscribers that lagged.
    Resync,
    /// Report statistics.
    Stats {
        /// Receives the statistics.
        reply: oneshot::Sender<RunnerStats>,
    },
    /// Disconnect everyone and stop.
    Shutdown,
}

/// Statistics reported by a running room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunnerStats {
    /// Room index.
    pub room: usize,
    /// Connected players.
    pub players: usize,
    /// Gameplay counters.
    pub gameplay: RoomStats,
    /// Tick timing.
    pub timing: TickStats,
}

/// Wall-clock milliseconds derived from the runtime's monotonic clock.
///
/// Anchored to the Unix epoch once, then advanced by `tokio::time::Instant`,
/// so a paused runtime drives room time deterministically.
#[derive(Clone, Copy, Debug)]
struct RoomClock {
    epoch_ms: u64,
    origin: Instant,
}

impl RoomClock {
    fn start() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64);
        Self {
            epoch_ms,
            origin: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch_ms + self.origin.elapsed().as_millis() as u64
    }
}

/// Cloneable handle to a running room.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    index: usize,
    commands: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Room index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Subscribes to everything the room broadcasts from now on.
    ///
    /// The subscription is taken inside the room task, which also forces the
    /// next publication to be a full snapshot, so the first `state` message a
    /// new subscriber sees is always `full`.
    ///
    /// # Errors
    ///
    /// [`ArenaError::RoomClosed`] if the room task has stopped.
    pub async fn subscribe(&self) -> ArenaResult<broadcast::Receiver<ServerMessage>> {
        let (reply, response) = oneshot::channel();
        self.command(RoomCommand::Subscribe { reply }).await?;
        response.await.map_err(|_| ArenaError::RoomClosed)
    }

    /// Forces the next publication to be full.
    ///
    /// For subscribers that lagged behind the broadcast buffer and can no
    /// longer apply deltas.
    ///
    /// # Errors
    ///
    /// [`ArenaError::RoomClosed`] if the room task has stopped.
    pub async fn resync(&self) -> ArenaResult<()> {
        self.command(RoomCommand::Resync).await
    }

    /// Admits a player.
    ///
    /// # Errors
    ///
    /// [`ArenaError::RoomFull`] at capacity, [`ArenaError::RoomClosed`] if
    /// the room task has stopped.
    pub async fn join(&self, request: JoinRequest) -> ArenaResult<PlayerId> {
        let (reply, response) = oneshot::channel();
        self.command(RoomCommand::Join { request, reply }).await?;
        response.await.map_err(|_| ArenaError::RoomClosed)?
    }

    /// Removes a player. Leaving twice is harmless.
    ///
    /// # Errors
    ///
    /// [`ArenaError::RoomClosed`] if the room task has stopped.
    pub async fn leave(&self, id: PlayerId, code: u16) -> ArenaResult<()> {
        self.command(RoomCommand::Leave { id, code }).await
    }

    /// Forwards a decoded client message.
    ///
    /// # Errors
    ///
    /// [`ArenaError::RoomClosed`] if the room task has stopped.
    pub async fn send(&self, id: PlayerId, message: ClientMessage) -> ArenaResult<()> {
        self.command(RoomCommand::Message { id, message }).await
    }

    /// Decodes and forwards a raw text frame.
    ///
    /// # Errors
    ///
    /// [`ArenaError::Protocol`] for frames that do not decode; the frame is
    /// dropped and the session stays open.
    pub async fn send_frame(&self, id: PlayerId, frame: &str) -> ArenaResult<()> {
        let message = ClientMessage::decode(frame).map_err(|err| {
            debug!(player = %id, error = %err, "frame dropped");
            err
        })?;
        self.send(id, message).await
    }

    /// Requests the room's statistics.
    ///
    /// # Errors
    ///
    /// [`ArenaError::RoomClosed`] if the room task has stopped.
    pub async fn stats(&self) -> ArenaResult<RunnerStats> {
        let (reply, response) = oneshot::channel();
        self.command(RoomCommand::Stats { reply }).await?;
        response.await.map_err(|_| ArenaError::RoomClosed)
    }

    /// Disconnects everyone and stops the room.
    ///
    /// # Errors
    ///
    /// [`ArenaError::RoomClosed`] if the room task has already stopped.
    pub async fn shutdown(&self) -> ArenaResult<()> {
        self.command(RoomCommand::Shutdown).await
    }

    async fn command(&self, command: RoomCommand) -> ArenaResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ArenaError::RoomClosed)
    }
}

/// Spawns a room task on the current runtime.
///
/// The task ends on [`RoomHandle::shutdown`] or when every handle is dropped,
/// and yields the room's final statistics.
///
/// # Errors
///
/// [`ArenaError::InvalidConfig`] if `config` does not validate.
pub fn spawn_room(
    config: RoomConfig,
    index: usize,
) -> ArenaResult<(RoomHandle, JoinHandle<RoomStats>)> {
    config.validate()?;

    let (commands, inbox) = mpsc::channel(config.command_queue);
    let (events, _) = broadcast::channel(config.broadcast_capacity);
    let clock = RoomClock::start();
    let room = ArenaRoom::new(config, clock.now_ms());

    let task = tokio::spawn(run_room(room, inbox, events, clock, index));
    let handle = RoomHandle { index, commands };
    Ok((handle, task))
}

async fn run_room(
    mut room: ArenaRoom,
    mut inbox: mpsc::Receiver<RoomCommand>,
    events: broadcast::Sender<ServerMessage>,
    clock: RoomClock,
    index: usize,
) -> RoomStats {
    let mut timer = TickTimer::arena();
    let mut ticker = interval(timer.tick_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(room = index, max_clients = room.config().max_clients, "room started");

    loop {
        tokio::select! {
            command = inbox.recv() => {
                let Some(command) = command else {
                    debug!(room = index, "all handles dropped");
                    break;
                };
                if !apply(&mut room, &timer, &events, command, clock.now_ms(), index) {
                    break;
                }
                flush(&mut room, &events);
            }
            _ = ticker.tick() => {
                let started = Instant::now();
                let dt = timer.begin_tick(started);
                room.update(dt, clock.now_ms());
                room.publish();
                flush(&mut room, &events);
                timer.end_tick(started, Instant::now());

                let stats = timer.stats();
                if stats.late_ticks > 0 && timer.tick_count() % 200 == 0 {
                    warn!(
                        room = index,
                        late = stats.late_ticks,
                        max_us = stats.max_tick_us,
                        "room ticks running over budget"
                    );
                }
            }
        }
    }

    let remaining: Vec<PlayerId> = room.state().players().map(|p| p.id).collect();
    for id in remaining {
        room.leave(id, leave_code::ROOM_SHUTDOWN);
    }
    flush(&mut room, &events);

    let stats = *room.stats();
    info!(
        room = index,
        ticks = stats.ticks,
        hits = stats.hits,
        avg_tick_us = timer.stats().avg_tick_us,
        "room stopped"
    );
    stats
}

/// Applies one command. Returns false when the room should stop.
fn apply(
    room: &mut ArenaRoom,
    timer: &TickTimer,
    events: &broadcast::Sender<ServerMessage>,
    command: RoomCommand,
    now_ms: u64,
    index: usize,
) -> bool {
    match command {
        RoomCommand::Join { request, reply } => {
            let result = room.join(&request, now_ms);
            if let Err(err) = &result {
                info!(room = index, error = %err, "join refused");
            }
            if let Err(Ok(id)) = reply.send(result) {
                // the caller went away before learning its id
                room.leave(id, leave_code::NORMAL);
            }
        }
        RoomCommand::Leave { id, code } => {
            room.leave(id, code);
        }
        RoomCommand::Message { id, message } => room.handle(id, message, now_ms),
        RoomCommand::Subscribe { reply } => {
            room.request_full();
            let _ = reply.send(events.subscribe());
        }
        RoomCommand::Resync => room.request_full(),
        RoomCommand::Stats { reply } => {
            let _ = reply.send(RunnerStats {
                room: index,
                players: room.player_count(),
                gameplay: *room.stats(),
                timing: *timer.stats(),
            });
        }
        RoomCommand::Shutdown => return false,
    }
    true
}

/// Broadcasts every queued message. Having no subscribers is not an error.
fn flush(room: &mut ArenaRoom, events: &broadcast::Sender<ServerMessage>) {
    for message in room.drain_outbox() {
        let _ = events.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathbound_shared::protocol::{Archetype, WorldPatch};

    fn config() -> RoomConfig {
        RoomConfig {
            rng_seed: Some(3),
            ..RoomConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_publishes_full_snapshot() {
        let (room, _task) = spawn_room(config(), 0).unwrap();
        let mut events = room.subscribe().await.unwrap();

        let id = room
            .join(JoinRequest::new("Rin", Archetype::Mage))
            .await
            .unwrap();

        loop {
            match events.recv().await.unwrap() {
                ServerMessage::State(WorldPatch::Full { snapshot, .. })
                    if snapshot.players.iter().any(|p| p.id == id) =>
                {
                    break;
                }
                ServerMessage::State(WorldPatch::Delta { players, .. }) => {
                    assert!(
                        !players.iter().any(|p| p.id == id),
                        "a joiner must first appear in a full snapshot"
                    );
                }
                _ => {}
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_full_over_channel() {
        let config = RoomConfig {
            max_clients: 1,
            ..config()
        };
        let (room, _task) = spawn_room(config, 0).unwrap();

        room.join(JoinRequest::default()).await.unwrap();
        let err = room.join(JoinRequest::default()).await.unwrap_err();
        assert!(matches!(err, ArenaError::RoomFull { capacity: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_disconnects_everyone() {
        let (room, task) = spawn_room(config(), 2).unwrap();
        let mut events = room.subscribe().await.unwrap();
        let id = room.join(JoinRequest::default()).await.unwrap();

        room.shutdown().await.unwrap();
        let stats = task.await.unwrap();
        assert_eq!(stats.joins, 1);
        assert_eq!(stats.leaves, 1);

        let mut left = None;
        while let Ok(message) = events.try_recv() {
            if let ServerMessage::PlayerLeft { player_id, code } = message {
                left = Some((player_id, code));
            }
        }
        assert_eq!(left, Some((id, leave_code::ROOM_SHUTDOWN)));
        assert!(matches!(room.stats().await, Err(ArenaError::RoomClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_is_dropped() {
        let (room, _task) = spawn_room(config(), 0).unwrap();
        let id = room.join(JoinRequest::default()).await.unwrap();

        assert!(matches!(
            room.send_frame(id, "{not json").await,
            Err(ArenaError::Protocol(_))
        ));
        room.send_frame(id, r#"{"type":"move","payload":{"moveZ":1}}"#)
            .await
            .unwrap();

        let stats = room.stats().await.unwrap();
        assert_eq!(stats.players, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_rejected() {
        let config = RoomConfig {
            max_clients: 0,
            ..config()
        };
        assert!(matches!(
            spawn_room(config, 0),
            Err(ArenaError::InvalidConfig(_))
        ));
    }
}
