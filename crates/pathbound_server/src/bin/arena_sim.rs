//! # Arena Bot Simulation
//!
//! Runs one or more rooms in-process and drives them with bots that walk
//! towards the nearest dummy and attack it with their class weapon.
//!
//! Each room is observed the way a client would: through the broadcast
//! channel, with a [`WorldMirror`] rebuilt from full and delta publications.

use std::process;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

use pathbound_server::{spawn_room, ArenaResult, RoomHandle, RunnerStats, ServerConfig, WorldMirror};
use pathbound_shared::attacks::AttackType;
use pathbound_shared::protocol::{
    leave_code, Archetype, AttackRequest, ClientMessage, DummyView, JoinRequest, MoveIntent,
    PlayerId, PlayerView, ServerMessage,
};

const ARCHETYPES: [Archetype; 4] = [
    Archetype::Swordsman,
    Archetype::Archer,
    Archetype::Mage,
    Archetype::Assassin,
];

/// Bot decision interval.
const THINK_INTERVAL: Duration = Duration::from_millis(100);

struct Options {
    rooms: Option<usize>,
    bots: usize,
    seconds: u64,
    config: Option<String>,
    seed: Option<u64>,
}

/// What one room's observer saw.
#[derive(Default)]
struct Observation {
    publications: u64,
    feedback: u64,
    left: u64,
    mirror_errors: u64,
    lagged: u64,
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         PATHBOUND ARENA - BOT SIMULATION                         ║");
    println!("║         AUTHORITATIVE ROOMS UNDER LOAD                           ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let Some(options) = parse_args() else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(options)) {
        eprintln!("simulation failed: {err}");
        process::exit(1);
    }
}

fn parse_args() -> Option<Options> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        rooms: None,
        bots: 8,
        seconds: 30,
        config: None,
        seed: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rooms" | "-r" => {
                if i + 1 < args.len() {
                    options.rooms = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--bots" | "-b" => {
                if i + 1 < args.len() {
                    options.bots = args[i + 1].parse().unwrap_or(8);
                    i += 1;
                }
            }
            "--seconds" | "-s" => {
                if i + 1 < args.len() {
                    options.seconds = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    options.config = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    options.seed = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: arena_sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -r, --rooms <NUM>          Rooms to run (default: from config, 1)");
                println!("  -b, --bots <NUM>           Bots per room (default: 8)");
                println!("  -s, --seconds <SECS>       Simulated duration (default: 30)");
                println!("  -c, --config <PATH>        TOML server configuration");
                println!("      --seed <SEED>          Deterministic room seed");
                println!("  -h, --help                 Show this help");
                return None;
            }
            _ => {}
        }
        i += 1;
    }
    Some(options)
}

async fn run(options: Options) -> ArenaResult<()> {
    let mut config = match &options.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(rooms) = options.rooms {
        config.rooms = rooms;
    }
    config.validate()?;

    let bots = options.bots.min(config.room.max_clients);

    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Rooms:              {}", config.rooms);
    println!("│ Bots per Room:      {}", bots);
    println!("│ Max Clients:        {}", config.room.max_clients);
    println!("│ Duration:           {} seconds", options.seconds);
    println!("│ Full Snapshot:      every {} publications", config.room.full_snapshot_interval);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let mut drivers = Vec::with_capacity(config.rooms);
    let mut tasks = Vec::with_capacity(config.rooms);
    for index in 0..config.rooms {
        let mut room_config = config.room.clone();
        if let Some(seed) = options.seed {
            room_config.rng_seed = Some(seed.wrapping_add(index as u64));
        }
        let bot_seed = room_config.rng_seed.unwrap_or(index as u64);
        let (handle, task) = spawn_room(room_config, index)?;
        tasks.push(task);
        drivers.push(tokio::spawn(drive_room(
            handle,
            bots,
            Duration::from_secs(options.seconds),
            bot_seed,
        )));
    }

    let mut reports = Vec::with_capacity(drivers.len());
    for driver in drivers {
        match driver.await {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(err)) => warn!(error = %err, "room driver failed"),
            Err(err) => warn!(error = %err, "room driver panicked"),
        }
    }
    for task in tasks {
        if let Err(err) = task.await {
            warn!(error = %err, "room task panicked");
        }
    }

    print_report(&reports);
    Ok(())
}

async fn drive_room(
    room: RoomHandle,
    bots: usize,
    duration: Duration,
    seed: u64,
) -> ArenaResult<(RunnerStats, Observation)> {
    let mut events = room.subscribe().await?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut roster = Vec::with_capacity(bots);
    for n in 0..bots {
        let archetype = ARCHETYPES[n % ARCHETYPES.len()];
        let id = room
            .join(JoinRequest::new(format!("bot-{n}"), archetype))
            .await?;
        roster.push((id, archetype));
    }
    info!(room = room.index(), bots = roster.len(), "bots joined");

    let mut mirror = WorldMirror::new();
    let mut seen = Observation::default();
    let mut think = interval(THINK_INTERVAL);
    think.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline = Instant::now() + duration;

    while Instant::now() < deadline {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ServerMessage::State(patch)) => {
                    seen.publications += 1;
                    if mirror.apply(&patch).is_err() {
                        // resynchronizes on the next full publication
                        seen.mirror_errors += 1;
                    }
                }
                Ok(ServerMessage::CombatFeedback(_)) => seen.feedback += 1,
                Ok(ServerMessage::PlayerLeft { .. }) => seen.left += 1,
                Err(RecvError::Lagged(missed)) => {
                    warn!(room = room.index(), missed, "observer lagging behind the room");
                    seen.lagged += missed;
                    room.resync().await?;
                }
                Err(RecvError::Closed) => break,
            },
            _ = think.tick() => {
                for &(id, archetype) in &roster {
                    for message in decide(id, archetype, &mirror, &mut rng) {
                        room.send(id, message).await?;
                    }
                }
            }
        }
    }

    for &(id, _) in &roster {
        room.leave(id, leave_code::CONSENTED).await?;
    }
    let stats = room.stats().await?;
    room.shutdown().await?;
    Ok((stats, seen))
}

/// Walk towards the nearest living dummy and attack once in range.
fn decide(
    id: PlayerId,
    archetype: Archetype,
    mirror: &WorldMirror,
    rng: &mut ChaCha8Rng,
) -> Vec<ClientMessage> {
    let world = mirror.snapshot();
    let Some(me) = world.players.iter().find(|p| p.id == id) else {
        return Vec::new();
    };
    let Some(target) = nearest_dummy(me, &world.dummies) else {
        return vec![ClientMessage::Move(MoveIntent {
            yaw: me.yaw,
            ..MoveIntent::IDLE
        })];
    };

    let kind = weapon(archetype);
    let range = kind.definition().range;
    let (dx, dz) = (target.x - me.x, target.z - me.z);
    let distance = dx.hypot(dz);
    let yaw = dx.atan2(dz);

    let mut messages = vec![ClientMessage::Move(MoveIntent {
        move_x: 0.0,
        move_z: if distance > range * 0.8 { 1.0 } else { 0.0 },
        yaw,
        sprint: distance > 10.0,
        jump: rng.gen::<f32>() < 0.02,
    })];
    if distance <= range {
        messages.push(ClientMessage::Attack(AttackRequest::new(kind, yaw)));
    }
    messages
}

fn nearest_dummy<'a>(me: &PlayerView, dummies: &'a [DummyView]) -> Option<&'a DummyView> {
    dummies
        .iter()
        .filter(|d| d.hp > 0)
        .min_by(|a, b| {
            let da = (a.x - me.x).hypot(a.z - me.z);
            let db = (b.x - me.x).hypot(b.z - me.z);
            da.total_cmp(&db)
        })
}

const fn weapon(archetype: Archetype) -> AttackType {
    match archetype {
        Archetype::Archer => AttackType::Archer,
        Archetype::Mage => AttackType::Mage,
        Archetype::Swordsman | Archetype::Assassin => AttackType::Sword,
    }
}

fn print_report(reports: &[(RunnerStats, Observation)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                    SIMULATION RESULTS                            ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    for (stats, seen) in reports {
        let game = &stats.gameplay;
        let timing = &stats.timing;
        println!("┌─ ROOM {} ────────────────────────────────────────────────────────┐", stats.room);
        println!("│ Ticks:              {}", game.ticks);
        println!("│ Avg Tick Time:      {} μs", timing.avg_tick_us);
        println!("│ Max Tick Time:      {} μs", timing.max_tick_us);
        println!("│ Late Ticks:         {} ({:.2}%)", timing.late_ticks, timing.late_ratio() * 100.0);
        println!("│ Attacks Accepted:   {}", game.attacks_accepted);
        println!("│ Attacks Rejected:   {}", game.attacks_rejected);
        println!("│ Hits:               {}", game.hits);
        println!("│ Damage Dealt:       {}", game.damage_dealt);
        println!("│ Dummies Revived:    {}", game.dummies_revived);
        println!("│ Movement Faults:    {}", game.movement_faults);
        println!("│ Publications Seen:  {}", seen.publications);
        println!("│ Feedback Seen:      {}", seen.feedback);
        println!("│ Departures Seen:    {}", seen.left);
        println!("│ Mirror Errors:      {}", seen.mirror_errors);
        println!("│ Lagged Messages:    {}", seen.lagged);
        if timing.late_ratio() < 0.01 && game.movement_faults == 0 {
            println!("│ Status:             ✓ WITHIN BUDGET");
        } else {
            println!("│ Status:             ✗ DEGRADED");
        }
        println!("└──────────────────────────────────────────────────────────────────┘");
        println!();
    }
}
