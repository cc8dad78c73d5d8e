use std::f32::consts::TAU;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec2;
use gridscape_audio::{BAR_COUNT, IdlePattern, LevelMeter, LevelSnapshot, LevelTap, WINDOW_SIZE};
use gridscape_common::{GridSettings, SensorSensitivity};
use gridscape_input::{SensorHub, SyntheticGyro};
use gridscape_kernel::{AviationRig, FlightPhase, FrameTimer, GridEngine, TaskScheduler};
use gridscape_render::{DebugTextRenderer, GridCamera, Renderer, project_frame};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridscape-cli", about = "CLI tool for gridscape operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and default settings
    Info,
    /// Validate a settings file and print it normalized
    Check {
        /// YAML or JSON settings file
        path: PathBuf,
    },
    /// Run the grid engine headless and report its state
    Simulate {
        /// YAML or JSON settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to simulate
        #[arg(short, long, default_value = "120")]
        ticks: u64,
        /// Simulated frame rate
        #[arg(long, default_value = "60")]
        fps: f32,
        /// Override drift velocity, e.g. `--velocity 20,-10`
        #[arg(long, value_delimiter = ',', num_args = 2, allow_negative_numbers = true)]
        velocity: Option<Vec<f32>>,
        /// Override line spacing
        #[arg(long)]
        spacing: Option<f32>,
        /// Drive rotation from a synthetic gyro (runs in real time)
        #[arg(long)]
        sensor: bool,
        /// Seconds of simulated time between reports
        #[arg(long, default_value = "0.5")]
        report_every: f32,
        /// Emit JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run the aviation camera rig through a flight phase
    Flight {
        #[arg(short, long, value_enum, default_value = "taxiing")]
        phase: PhaseArg,
        /// Base line spacing
        #[arg(long, default_value = "16")]
        spacing: f32,
        /// Seconds to simulate
        #[arg(long, default_value = "1.2")]
        seconds: f32,
    },
    /// Feed the level meter and print its bars
    Meter {
        /// Use the idle tape pattern instead of a synthetic tone
        #[arg(long)]
        idle: bool,
        /// Seconds to run
        #[arg(long, default_value = "3")]
        seconds: f32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PhaseArg {
    Takeoff,
    Landing,
    Taxiing,
}

impl From<PhaseArg> for FlightPhase {
    fn from(p: PhaseArg) -> Self {
        match p {
            PhaseArg::Takeoff => FlightPhase::Takeoff,
            PhaseArg::Landing => FlightPhase::Landing,
            PhaseArg::Taxiing => FlightPhase::Taxiing,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("gridscape-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("defaults:");
            print!("{}", GridSettings::default().to_yaml_string()?);
        }
        Commands::Check { path } => {
            let settings = GridSettings::load(&path)
                .with_context(|| format!("invalid settings in {}", path.display()))?;
            println!("{}: OK", path.display());
            print!("{}", settings.to_yaml_string()?);
        }
        Commands::Simulate {
            config,
            ticks,
            fps,
            velocity,
            spacing,
            sensor,
            report_every,
            json,
        } => {
            let mut settings = match &config {
                Some(path) => GridSettings::load(path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => GridSettings::default(),
            };
            if let Some(&[x, y]) = velocity.as_deref() {
                settings.motion.velocity = Vec2::new(x, y);
            }
            if let Some(s) = spacing {
                settings.grid.spacing = s;
            }
            if sensor && settings.motion.sensor.is_none() {
                settings.motion.sensor = Some(SensorSensitivity::default());
            }
            simulate(&settings, ticks, fps, sensor, report_every, json)?;
        }
        Commands::Flight {
            phase,
            spacing,
            seconds,
        } => flight(phase.into(), spacing, seconds)?,
        Commands::Meter { idle, seconds } => meter(idle, seconds)?,
    }

    Ok(())
}

fn simulate(
    settings: &GridSettings,
    ticks: u64,
    fps: f32,
    realtime: bool,
    report_every: f32,
    json: bool,
) -> anyhow::Result<()> {
    let hub = settings
        .motion
        .sensor
        .map(|_| SensorHub::new(SyntheticGyro::default()));
    let mut engine = GridEngine::from_settings(settings, hub).context("building grid engine")?;
    let camera = GridCamera::new(settings.engine.viewport);
    let renderer = DebugTextRenderer::new();

    let dt = 1.0 / fps.max(1.0);
    let step = Duration::from_secs_f32(dt);
    let interval = Duration::try_from_secs_f32(report_every.max(dt))
        .with_context(|| format!("invalid report interval {report_every}"))?;
    let mut scheduler = TaskScheduler::new();
    let report = scheduler.schedule_repeating(interval);
    let mut timer = FrameTimer::new(report_window(interval, step));

    tracing::info!(ticks, fps, "simulating");
    for tick in 1..=ticks {
        let started = Instant::now();
        engine.advance(dt);
        timer.record(started.elapsed());
        let due = scheduler
            .advance(step)
            .iter()
            .any(|f| f.id == report.id());
        if due || tick == ticks {
            if json {
                let frame = project_frame(&engine, &camera);
                let line = serde_json::json!({
                    "tick": tick,
                    "motion": engine.motion(),
                    "stats": engine.stats(),
                    "generation": engine.generation(),
                    "segments": frame.segment_count(),
                    "tick_avg_us": timer.average().as_secs_f64() * 1e6,
                    "tick_max_us": timer.max().as_secs_f64() * 1e6,
                });
                println!("{line}");
            } else {
                println!("--- tick {tick} ---");
                print!("{}", renderer.render(&engine, &camera));
                println!(
                    "tick cost: avg {:?} max {:?} over {} ticks",
                    timer.average(),
                    timer.max(),
                    timer.count()
                );
            }
        }
        if realtime {
            std::thread::sleep(step);
        }
    }
    report.cancel();
    engine.on_hide();
    Ok(())
}

/// Ticks between reports, the window the tick-cost figures cover.
fn report_window(interval: Duration, step: Duration) -> usize {
    if step.is_zero() {
        return 1;
    }
    (interval.as_secs_f64() / step.as_secs_f64()).ceil().clamp(1.0, 100_000.0) as usize
}

fn flight(phase: FlightPhase, spacing: f32, seconds: f32) -> anyhow::Result<()> {
    let settings = GridSettings {
        grid: gridscape_common::GridConfig {
            spacing,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut engine = GridEngine::from_settings(&settings, None)?;
    let mut rig = AviationRig::new(spacing);
    rig.attach(&mut engine)?;
    rig.set_phase(&mut engine, phase);

    let dt = 1.0 / 60.0;
    let frames = (seconds.max(0.0) / dt).ceil() as u32;
    println!("phase {phase:?} -> mode {:?}", rig.mode());
    for frame in 0..=frames {
        if frame % 6 == 0 || frame == frames {
            let m = engine.motion();
            println!(
                "t={:.2}s pitch={:6.1} spacing={:6.2} offset=({:6.2}, {:6.2})",
                frame as f32 * dt,
                m.camera_rotation.x.to_degrees(),
                engine.effective_spacing(),
                m.position_offset.x,
                m.position_offset.y
            );
        }
        rig.tick(&mut engine, dt)?;
    }
    Ok(())
}

fn meter(idle: bool, seconds: f32) -> anyhow::Result<()> {
    let tap = LevelTap::new();
    let frames = (seconds.max(0.0) * 60.0).ceil() as u32;

    let writer = tap.clone();
    let capture = std::thread::Builder::new()
        .name("meter-capture".into())
        .spawn(move || {
            if idle {
                let mut pattern = IdlePattern::new();
                for _ in 0..frames {
                    pattern.step(1.0 / 60.0);
                    writer.publish(pattern.snapshot());
                    std::thread::sleep(Duration::from_millis(16));
                }
            } else {
                let mut meter = LevelMeter::default();
                let mut buffer = vec![0.0_f32; WINDOW_SIZE];
                for frame in 0..frames {
                    // A tone that swells and fades once per second.
                    let envelope = (TAU * frame as f32 / 60.0).sin().abs();
                    for (i, s) in buffer.iter_mut().enumerate() {
                        *s = envelope * (TAU * 12.0 * i as f32 / WINDOW_SIZE as f32).sin();
                    }
                    meter.process(&buffer);
                    writer.publish(meter.snapshot());
                    std::thread::sleep(Duration::from_millis(16));
                }
            }
        })
        .context("spawning capture thread")?;

    let mut last = LevelSnapshot::silent(BAR_COUNT);
    for frame in 0..frames {
        std::thread::sleep(Duration::from_millis(16));
        if let Some(snapshot) = tap.latest() {
            last = snapshot;
        }
        if frame % 10 == 0 {
            println!("{:4.2} |{}|", last.level, bar_line(&last.bars));
        }
    }

    if capture.join().is_err() {
        anyhow::bail!("capture thread panicked");
    }
    Ok(())
}

fn bar_line(bars: &[f32]) -> String {
    const RAMP: [char; 5] = [' ', '.', ':', '|', '#'];
    bars.iter()
        .map(|b| RAMP[((b.clamp(0.0, 1.0) * 4.0).round() as usize).min(4)])
        .collect()
}
