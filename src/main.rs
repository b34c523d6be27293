use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use kart_physics::config::{KartConfig, KartProfile};
use kart_physics::input::{InputSource, ScriptedDriver};
use kart_physics::kart_model::KartDynamics;
use kart_physics::physics::PhysicsWorld;
use kart_physics::state::{Frame, SimState};
use kart_physics::telemetry::ForceRecord;

#[derive(Parser, Debug)]
#[command(name = "kart-physics", version, about = "Headless kart dynamics demo on a rapier host")]
struct Args {
    /// Full kart configuration (JSON, any subset of fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Kart profile overrides applied on top of the configuration
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Simulated seconds (default: length of the scripted lap)
    #[arg(long)]
    seconds: Option<f32>,

    /// Log a telemetry line every N ticks
    #[arg(long, default_value_t = 50)]
    telemetry_every: u64,

    /// Write recorded frames to this JSON file
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Seed for the bump layout
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Wall-clock speedup of the fixed-step loop
    #[arg(long, default_value_t = 1.0)]
    speedup: f32,

    /// Input sampling rate in Hz (independent of the physics tick)
    #[arg(long, default_value_t = 60.0)]
    input_hz: f32,
}

/// `interval` panics on a zero period; huge speedups would round down to it.
const MIN_TICK_PERIOD: Duration = Duration::from_micros(1);

fn tick_period(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs)
        .unwrap_or(MIN_TICK_PERIOD)
        .max(MIN_TICK_PERIOD)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => KartConfig::from_file(path)?,
        None => KartConfig::default(),
    };
    if let Some(path) = &args.profile {
        config.apply_profile(&KartProfile::from_file(path)?)?;
        info!(profile = %path.display(), "kart profile applied");
    }

    let mut model = KartDynamics::new(config.clone())?;
    let mut world = PhysicsWorld::new(&config, args.seed);
    let dt = model.dt().secs();

    let script = ScriptedDriver::demo_lap();
    let seconds = args.seconds.unwrap_or_else(|| script.total_duration());
    let total_ticks = (seconds / dt).ceil() as u64;
    let speedup = args.speedup.max(0.01);

    info!(seconds, dt, total_ticks, speedup, "starting kart simulation");

    let state = Arc::new(Mutex::new(SimState::new()));

    // Input sampler: its own cadence, latches the latest controls.
    let sampler = {
        let state = Arc::clone(&state);
        let mut source = script;
        let period = tick_period(1.0 / (args.input_hz.max(1.0) * speedup));
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                let mut sim = state.lock().await;
                if sim.finished {
                    break;
                }
                let time = sim.tick as f32 * dt;
                sim.latch_input(source.sample(time));
            }
        })
    };

    // Fixed timestep at the model's dt.
    let mut ticker = interval(tick_period(dt / speedup));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let mut forces = Vec::new();

    loop {
        ticker.tick().await;
        let mut sim = state.lock().await;

        let Some(kinematics) = world.kinematic_state(&config) else {
            warn!("kart body missing, stopping");
            sim.finished = true;
            break;
        };

        forces.clear();
        let input = sim.input;
        let telemetry = model.step(&input, &kinematics, &world.probe(), &mut forces);

        sim.tick += 1;
        let time = sim.tick as f32 * dt;

        if args.telemetry_every > 0 && sim.tick % args.telemetry_every == 0 {
            info!(
                t = time,
                kmh = telemetry.speed_kmh,
                rpm = telemetry.engine_rpm,
                torque = telemetry.engine_torque,
                grounded = telemetry.grounded_wheels(),
                governed = telemetry.governed,
                ride_height = ?telemetry.aero.ride_height,
                "telemetry"
            );
            if args.dump.is_some() {
                let p = kinematics.chassis.center;
                sim.recording.frames.push(Frame {
                    time,
                    position: [p.x, p.y, p.z],
                    telemetry: telemetry.clone(),
                    forces: forces.iter().map(ForceRecord::from).collect(),
                });
            }
        }

        world.apply_forces(&forces);
        world.step();

        if sim.tick >= total_ticks {
            sim.finished = true;
            break;
        }
    }

    sampler.await?;

    let sim = state.lock().await;
    if let Some(pos) = world.kart_position() {
        info!(
            ticks = sim.tick,
            input_samples = sim.input_samples,
            x = pos.x,
            y = pos.y,
            z = pos.z,
            "simulation finished"
        );
    }

    if let Some(path) = &args.dump {
        tokio::fs::write(path, sim.to_json()?).await?;
        info!(path = %path.display(), frames = sim.recording.frames.len(), "telemetry dumped");
    }

    Ok(())
}
