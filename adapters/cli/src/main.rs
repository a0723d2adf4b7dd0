#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Prophecy arena session.

mod settings;

use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use glam::Vec2;
use prophecy_core::Event;
use prophecy_simulation::{Level, Simulation, SimulationConfig};
use prophecy_world::query::{self, Outcome};
use tracing_subscriber::EnvFilter;

use settings::Settings;

const FRAME: Duration = Duration::from_nanos(16_666_667);

/// Runs the arena without a renderer and reports how the level went.
#[derive(Debug, Parser)]
#[command(name = "prophecy", version)]
struct Cli {
    /// Text layout of the arena; the built-in arena is used when omitted.
    #[arg(long, value_name = "FILE")]
    map: Option<PathBuf>,
    /// TOML file overriding gameplay tuning.
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
    /// Simulated seconds to run.
    #[arg(long, default_value_t = 30.0)]
    seconds: f32,
    /// Seed for every random stream in the session.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Scripted stick input fed to the player's steering.
    #[arg(long, value_enum, default_value_t = InputScript::Orbit)]
    input: InputScript,
    /// Edge length of one map cell in world units.
    #[arg(long, default_value_t = 1.0)]
    cell_size: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputScript {
    /// The player never touches the stick.
    Still,
    /// The stick sweeps slowly around the circle.
    Orbit,
}

impl InputScript {
    fn sample(self, seconds: f32) -> Vec2 {
        match self {
            Self::Still => Vec2::ZERO,
            Self::Orbit => Vec2::from_angle(seconds * 0.8),
        }
    }
}

#[derive(Debug, Default)]
struct EventTally {
    spawned: u32,
    rejected: u32,
    fired: u32,
    hits: u32,
    drops: u32,
}

impl EventTally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::AgentSpawned { .. } => self.spawned += 1,
                Event::SpawnRejected { .. } => self.rejected += 1,
                Event::ProjectileFired { .. } => self.fired += 1,
                Event::ProjectileHit { .. } => self.hits += 1,
                Event::LootDropped { .. } => self.drops += 1,
                _ => {}
            }
        }
    }
}

/// Entry point for the Prophecy command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(&Cli::parse())
}

fn run(cli: &Cli) -> Result<()> {
    if !cli.seconds.is_finite() || cli.seconds <= 0.0 {
        bail!("--seconds must be a positive number, got {}", cli.seconds);
    }

    let level = load_level(cli.map.as_deref(), cli.cell_size)?;
    let mut config = SimulationConfig::seeded(cli.seed);
    if let Some(path) = &cli.settings {
        Settings::load(path)?.apply(&mut config);
    }

    let mut simulation =
        Simulation::new(level, config).context("failed to start the arena simulation")?;
    tracing::info!(
        seed = cli.seed,
        input = ?cli.input,
        "{}",
        query::welcome_banner(simulation.world())
    );

    let frames = (cli.seconds / FRAME.as_secs_f32()).ceil() as u64;
    let mut events = Vec::new();
    let mut tally = EventTally::default();
    for frame in 0..frames {
        let now = frame as f32 * FRAME.as_secs_f32();
        simulation.set_input(cli.input.sample(now));

        events.clear();
        simulation.frame(FRAME, &mut events);
        tally.record(&events);

        if simulation.outcome() == Outcome::Defeated {
            break;
        }
    }

    let world = simulation.world();
    let stats = query::stats(world);
    let player = query::player(world);
    let elapsed = query::elapsed(world).as_secs_f32();
    tracing::info!(
        spawned = tally.spawned,
        rejected = tally.rejected,
        fired = tally.fired,
        hits = tally.hits,
        drops = tally.drops,
        "session finished"
    );
    let experience = query::experience(world);
    println!(
        "outcome={:?} elapsed={elapsed:.2}s kills={} coins={} xp={} level={} items={} health={} shield={}",
        simulation.outcome(),
        stats.kills(),
        stats.coins(),
        experience.total(),
        experience.level(),
        query::inventory(world).len(),
        player.vitals.health(),
        player.vitals.shield(),
    );
    Ok(())
}

fn load_level(map: Option<&Path>, cell_size: f32) -> Result<Level> {
    let Some(path) = map else {
        return Level::arena().context("built-in arena layout is invalid");
    };

    let layout = fs::read_to_string(path)
        .with_context(|| format!("failed to read map at {}", path.display()))?;
    Level::parse(&layout, cell_size)
        .with_context(|| format!("failed to parse map at {}", path.display()))
}
