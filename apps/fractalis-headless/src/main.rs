//! Fractalis Headless Driver
//!
//! Runs the simulation without a renderer, feeding it a scripted walk that
//! turns slowly, interacts with whatever is ahead at a fixed interval and
//! climbs back out every few descents. Events are logged as they are drained
//! and a summary is printed at the end.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p fractalis-headless -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--seed <N>`: World seed (default: random below 10000)
//! - `--frames <N>`: Frames to simulate (default: 600)
//! - `--dt <SECONDS>`: Fixed frame time (default: 0.016)
//! - `--interact-every <N>`: Frames between interactions, 0 to disable (default: 45)
//! - `--budget <N>`: Streaming operations per pass (default: 100)
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use fractalis_sim::{FrameInput, Interaction, MoveIntent, SimEvent, SimulationConfig, SimulationState, ViewBasis};
use fractalis_world::WorldEvent;
use glam::DVec3;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Radians turned per simulated second.
const TURN_RATE: f64 = 0.4;
/// Ascend after this many descents in a row.
const ASCEND_AFTER: u32 = 3;

#[derive(Debug, Clone)]
struct RunParams {
    seed: Option<u64>,
    frames: u64,
    dt: f64,
    interact_every: u64,
    budget: Option<usize>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            seed: None,
            frames: 600,
            dt: 0.016,
            interact_every: 45,
            budget: None,
        }
    }
}

impl RunParams {
    fn from_args(args: &[String]) -> anyhow::Result<Self> {
        let mut params = Self::default();
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            let mut value = || {
                iter.next()
                    .with_context(|| format!("missing value for {arg}"))
            };
            match arg.as_str() {
                "--seed" => params.seed = Some(value()?.parse().context("invalid --seed")?),
                "--frames" => params.frames = value()?.parse().context("invalid --frames")?,
                "--dt" => params.dt = value()?.parse().context("invalid --dt")?,
                "--interact-every" => {
                    params.interact_every = value()?.parse().context("invalid --interact-every")?;
                }
                "--budget" => params.budget = Some(value()?.parse().context("invalid --budget")?),
                other => bail!("unknown argument: {other}"),
            }
        }
        if !params.dt.is_finite() || params.dt <= 0.0 {
            bail!("--dt must be positive");
        }
        Ok(params)
    }

    fn config(&self) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(budget) = self.budget {
            config = config.with_step_budget(budget);
        }
        config
    }
}

#[derive(Debug, Default)]
struct Summary {
    created: usize,
    destroyed: usize,
    rewritten: usize,
    depth_changes: usize,
    collected: usize,
    deepest: u32,
}

impl Summary {
    fn record(&mut self, event: &SimEvent) {
        match event {
            SimEvent::Grid(WorldEvent::GridCreated { .. }) => self.created += 1,
            SimEvent::Grid(WorldEvent::GridDestroyed { .. }) => self.destroyed += 1,
            SimEvent::Grid(WorldEvent::BlockChanged { .. }) => self.rewritten += 1,
            SimEvent::DepthChanged { depth, active } => {
                info!(depth, %active, "Depth changed");
                self.depth_changes += 1;
                self.deepest = self.deepest.max(*depth);
            }
            SimEvent::CollectiblePicked { total, .. } => {
                debug!(total, "Collectible picked");
                self.collected += 1;
            }
            SimEvent::WaypointAdded { name, depth } => info!(%name, depth, "Waypoint added"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let params = RunParams::from_args(&args)?;
    let mut state = SimulationState::new(params.config())?;
    info!(seed = state.seed(), frames = params.frames, "Starting headless run");

    let mut summary = Summary::default();
    let start = Instant::now();
    let mut descents = 0;

    for frame in 0..params.frames {
        let now = start + Duration::from_secs_f64(frame as f64 * params.dt);
        let yaw = frame as f64 * params.dt * TURN_RATE;
        let forward = DVec3::new(yaw.sin(), 0.0, -yaw.cos());
        let view = ViewBasis::looking(forward);

        state.tick(&FrameInput::idle(params.dt).with_intent(MoveIntent::forward()).with_view(view), now);

        if params.interact_every > 0 && frame % params.interact_every == 0 {
            if descents >= ASCEND_AFTER {
                if state.request_ascend(now).is_some() {
                    descents -= 1;
                }
            } else {
                match state.request_interact(state.camera(), forward, now) {
                    Interaction::Descended(_) => descents += 1,
                    Interaction::Collected(item) => debug!(grid = %item.grid, "Picked up"),
                    Interaction::Missed => {}
                }
            }
        }

        for event in state.drain_events() {
            summary.record(&event);
        }
    }

    let end = start + Duration::from_secs_f64(params.frames as f64 * params.dt + 1.0);
    if state.depth() > 0 && state.teleport_to_waypoint(0, end)?.is_some() {
        info!("Returned to spawn");
    }
    for event in state.drain_events() {
        summary.record(&event);
    }

    println!("seed:           {}", state.seed());
    println!("frames:         {}", state.frame());
    println!("final depth:    {}", state.depth());
    println!("deepest:        {}", summary.deepest);
    println!("grids alive:    {}", state.tree().len());
    println!("grids created:  {}", summary.created);
    println!("grids released: {}", summary.destroyed);
    println!("blocks changed: {}", summary.rewritten);
    println!("depth changes:  {}", summary.depth_changes);
    println!("collected:      {}", summary.collected);
    Ok(())
}

fn print_help() {
    eprintln!(
        "Fractalis Headless Driver

USAGE:
    cargo run -p fractalis-headless -- [OPTIONS]

OPTIONS:
    --seed <N>              World seed (default: random below 10000)
    --frames <N>            Frames to simulate (default: 600)
    --dt <SECONDS>          Fixed frame time (default: 0.016)
    --interact-every <N>    Frames between interactions, 0 to disable (default: 45)
    --budget <N>            Streaming operations per pass (default: 100)
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
