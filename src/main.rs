//! vrmotion - Procedural VRM avatar animation
//!
//! Main entry point for the CLI application.

use clap::Parser;
use glam::Vec3;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vrmotion::{
    animation::pose::{MANAGED_BONES, MANAGED_EXPRESSIONS},
    config::Config,
    driver::{parse_script, ScheduledCommand},
    rig::{spawn_load, ExpressionControl, RigLoad},
    AnimationMode, AvatarDriver, DriverOptions, HumanBone,
};

/// vrmotion - Drive a VRM avatar with procedural gestures
#[derive(Parser, Debug)]
#[command(name = "vrmotion", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// VRM model path (overrides config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Run without loading a model
    #[arg(long)]
    no_model: bool,

    /// Timed mode switches, e.g. "waving@1.0,talking@2.5,stop@4"
    #[arg(short, long)]
    script: Option<String>,

    /// Frames per second (overrides config)
    #[arg(long)]
    fps: Option<u32>,

    /// Playback length in seconds (overrides config)
    #[arg(short, long)]
    duration: Option<f32>,

    /// Print one JSON line per frame
    #[arg(long)]
    json: bool,

    /// Pace frames against the wall clock and send script triggers from a
    /// separate thread
    #[arg(long)]
    realtime: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// One line of `--json` output.
#[derive(Debug, Serialize)]
struct FrameSnapshot {
    frame: u64,
    time: f32,
    mode: AnimationMode,
    elapsed: f32,
    rig_loaded: bool,
    joints: BTreeMap<HumanBone, [f32; 3]>,
    expressions: BTreeMap<&'static str, f32>,
}

#[derive(Debug, Default)]
struct PlaybackStats {
    frames: u64,
    posed_frames: u64,
    joint_writes: usize,
    skipped_bones: usize,
    expression_writes: usize,
    skipped_expressions: usize,
    modes: Vec<AnimationMode>,
}

impl PlaybackStats {
    fn record_mode(&mut self, mode: AnimationMode) {
        if self.modes.last() != Some(&mode) {
            self.modes.push(mode);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // Logs go to stderr so --json output stays machine-readable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", vrmotion::NAME, vrmotion::VERSION);

    // Load configuration
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.avatar.model_path = model.display().to_string();
    }
    if let Some(fps) = args.fps {
        config.playback.fps = fps;
    }
    if let Some(duration) = args.duration {
        config.playback.duration_secs = duration;
    }

    config.validate()?;

    let script = match args.script.as_deref() {
        Some(script) => parse_script(script)?,
        None => Vec::new(),
    };

    info!("Initial mode: {}", config.animation.initial_mode);
    info!("Clock policy: {:?}", config.animation.clock_policy);
    info!(
        "Playback: {} fps for {:.2}s",
        config.playback.fps, config.playback.duration_secs
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let stats = runtime.block_on(run(&args, &config, script))?;

    if !args.json {
        print_summary(&stats);
    }

    info!("vrmotion stopped");
    Ok(())
}

async fn run(
    args: &Args,
    config: &Config,
    script: Vec<ScheduledCommand>,
) -> anyhow::Result<PlaybackStats> {
    let mut driver: AvatarDriver = AvatarDriver::new(DriverOptions::from(&config.animation));

    let load = if args.no_model {
        info!("Model loading disabled");
        None
    } else {
        let position = Vec3::from_array(config.avatar.position);
        Some(spawn_load(
            &config.avatar.model_path,
            position,
            config.avatar.scale,
        ))
    };

    let fps = config.playback.fps;
    let frame_dt = 1.0 / fps as f32;
    let total_frames = (config.playback.duration_secs * fps as f32).round() as u64;

    if args.realtime {
        run_realtime(args, &mut driver, load, script, frame_dt, total_frames).await
    } else {
        if let Some(load) = load {
            let result = load.wait().await;
            driver.finish_load(result);
        }
        run_stepped(args, &mut driver, script, frame_dt, total_frames)
    }
}

/// Run frames back to back, firing script commands when simulated time
/// reaches them.
fn run_stepped(
    args: &Args,
    driver: &mut AvatarDriver,
    script: Vec<ScheduledCommand>,
    frame_dt: f32,
    total_frames: u64,
) -> anyhow::Result<PlaybackStats> {
    let trigger = driver.trigger();
    let mut pending = script.into_iter().peekable();
    let mut stats = PlaybackStats::default();

    for frame in 0..total_frames {
        let time = frame as f32 * frame_dt;
        while let Some(next) = pending.next_if(|c| c.at <= time) {
            trigger.send(next.command);
        }

        step(args, driver, frame, time, frame_dt, &mut stats)?;
    }

    Ok(stats)
}

/// Run frames at the configured rate. Script commands arrive from a separate
/// thread and the model is attached whenever its load finishes.
async fn run_realtime(
    args: &Args,
    driver: &mut AvatarDriver,
    mut load: Option<RigLoad>,
    script: Vec<ScheduledCommand>,
    frame_dt: f32,
    total_frames: u64,
) -> anyhow::Result<PlaybackStats> {
    let trigger = driver.trigger();
    let start = Instant::now();

    if !script.is_empty() {
        std::thread::spawn(move || {
            for command in script {
                let Ok(at) = Duration::try_from_secs_f32(command.at) else {
                    warn!("Dropping script command at invalid time {}", command.at);
                    continue;
                };
                if let Some(wait) = at.checked_sub(start.elapsed()) {
                    std::thread::sleep(wait);
                }
                if !trigger.send(command.command) {
                    break;
                }
            }
        });
    }

    let period = Duration::from_secs_f32(frame_dt).max(Duration::from_nanos(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut stats = PlaybackStats::default();
    let mut last = start;

    for frame in 0..total_frames {
        interval.tick().await;

        if let Some(pending) = load.as_ref() {
            if driver.poll_load(pending) {
                load = None;
            }
        }

        let now = Instant::now();
        let delta = now.duration_since(last).as_secs_f32();
        last = now;

        let time = now.duration_since(start).as_secs_f32();
        step(args, driver, frame, time, delta, &mut stats)?;
    }

    if let Some(pending) = load {
        warn!("Model still loading after playback: {}", pending.path().display());
    }

    Ok(stats)
}

fn step(
    args: &Args,
    driver: &mut AvatarDriver,
    frame: u64,
    time: f32,
    delta: f32,
    stats: &mut PlaybackStats,
) -> anyhow::Result<()> {
    let report = driver.frame(delta);

    stats.frames += 1;
    stats.record_mode(driver.animator().mode());
    if let Some(report) = report {
        stats.posed_frames += 1;
        stats.joint_writes += report.joint_writes;
        stats.skipped_bones += report.skipped_bones;
        stats.expression_writes += report.expression_writes;
        stats.skipped_expressions += report.skipped_expressions;
    }

    if args.json {
        let snapshot = snapshot(driver, frame, time);
        println!("{}", serde_json::to_string(&snapshot)?);
    }

    Ok(())
}

fn snapshot(driver: &AvatarDriver, frame: u64, time: f32) -> FrameSnapshot {
    let mut joints = BTreeMap::new();
    let mut expressions = BTreeMap::new();

    if let Some(rig) = driver.rig() {
        for &bone in MANAGED_BONES {
            if let Some(joint) = rig.joint(bone) {
                joints.insert(bone, joint.rotation.to_array());
            }
        }
        for &name in MANAGED_EXPRESSIONS {
            if let Some(value) = rig.expression_manager().value(name) {
                expressions.insert(name, value);
            }
        }
    }

    FrameSnapshot {
        frame,
        time,
        mode: driver.animator().mode(),
        elapsed: driver.animator().elapsed(),
        rig_loaded: driver.has_rig(),
        joints,
        expressions,
    }
}

fn print_summary(stats: &PlaybackStats) {
    let modes: Vec<&str> = stats.modes.iter().map(|m| m.as_str()).collect();

    println!("Frames:              {}", stats.frames);
    println!("Frames with a rig:   {}", stats.posed_frames);
    println!("Modes:               {}", modes.join(" -> "));
    println!(
        "Joint writes:        {} ({} bones skipped)",
        stats.joint_writes, stats.skipped_bones
    );
    println!(
        "Expression writes:   {} ({} skipped)",
        stats.expression_writes, stats.skipped_expressions
    );
}
