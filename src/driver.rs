//! Per-frame avatar driver.
//!
//! [`AvatarDriver`] owns the [`Animator`] and, once loaded, the rig. The host
//! render loop calls [`AvatarDriver::frame`] once per rendered frame. Mode
//! switches coming from other threads go through a [`ModeTrigger`] and are
//! applied at the start of the next frame, so a frame never evaluates a
//! half-updated mode/time pair.

use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::Vec3;
use std::str::FromStr;
use std::time::Duration;

use crate::animation::pose::{MANAGED_BONES, MANAGED_EXPRESSIONS};
use crate::animation::{AnimationMode, Animator, ApplyReport, ClockPolicy, ModeChange, Pose};
use crate::config::AnimationConfig;
use crate::error::ConfigError;
use crate::rig::{HumanoidRig, RigLoad, VrmRig};

/// A request to change the animation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCommand {
    Set(AnimationMode),
    /// Stop the current gesture and return to idle
    Stop,
}

impl FromStr for ModeCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            other => other.parse().map(Self::Set),
        }
    }
}

/// Cloneable, thread-safe handle for switching modes.
#[derive(Debug, Clone)]
pub struct ModeTrigger {
    tx: Sender<ModeCommand>,
}

impl ModeTrigger {
    /// Queue a command. Returns `false` if the driver is gone.
    pub fn send(&self, command: ModeCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn set_mode(&self, mode: AnimationMode) -> bool {
        self.send(ModeCommand::Set(mode))
    }

    pub fn start_idle(&self) -> bool {
        self.set_mode(AnimationMode::Idle)
    }

    pub fn start_waving(&self) -> bool {
        self.set_mode(AnimationMode::Waving)
    }

    pub fn start_nodding(&self) -> bool {
        self.set_mode(AnimationMode::Nodding)
    }

    pub fn start_talking(&self) -> bool {
        self.set_mode(AnimationMode::Talking)
    }

    pub fn stop(&self) -> bool {
        self.send(ModeCommand::Stop)
    }
}

/// Driver behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverOptions {
    pub initial_mode: AnimationMode,
    pub clock_policy: ClockPolicy,
    /// Zero every managed bone and expression on each mode switch
    pub reset_pose_on_switch: bool,
    /// Multiplier applied to host frame deltas
    pub time_scale: f32,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            initial_mode: AnimationMode::Idle,
            clock_policy: ClockPolicy::Always,
            reset_pose_on_switch: false,
            time_scale: 1.0,
        }
    }
}

impl From<&AnimationConfig> for DriverOptions {
    fn from(config: &AnimationConfig) -> Self {
        Self {
            initial_mode: config.initial_mode,
            clock_policy: config.clock_policy,
            reset_pose_on_switch: config.reset_pose_on_switch,
            time_scale: config.time_scale,
        }
    }
}

/// Drives a rig with procedural animation, one frame at a time.
pub struct AvatarDriver<R: HumanoidRig = VrmRig> {
    animator: Animator,
    rig: Option<R>,
    tx: Sender<ModeCommand>,
    rx: Receiver<ModeCommand>,
    options: DriverOptions,
}

impl<R: HumanoidRig> AvatarDriver<R> {
    pub fn new(options: DriverOptions) -> Self {
        let (tx, rx) = unbounded();
        Self {
            animator: Animator::new(options.initial_mode, options.clock_policy),
            rig: None,
            tx,
            rx,
            options,
        }
    }

    /// A handle for switching modes from any thread.
    pub fn trigger(&self) -> ModeTrigger {
        ModeTrigger {
            tx: self.tx.clone(),
        }
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub fn has_rig(&self) -> bool {
        self.rig.is_some()
    }

    pub fn rig(&self) -> Option<&R> {
        self.rig.as_ref()
    }

    pub fn rig_mut(&mut self) -> Option<&mut R> {
        self.rig.as_mut()
    }

    /// Attach a loaded rig, returning the previous one.
    pub fn attach_rig(&mut self, rig: R) -> Option<R> {
        self.rig.replace(rig)
    }

    pub fn detach_rig(&mut self) -> Option<R> {
        self.rig.take()
    }

    /// Switch mode immediately (same-thread callers).
    pub fn set_mode(&mut self, mode: AnimationMode) -> ModeChange {
        self.apply_command(ModeCommand::Set(mode))
    }

    /// Return to idle immediately (same-thread callers).
    pub fn stop(&mut self) -> ModeChange {
        self.apply_command(ModeCommand::Stop)
    }

    /// The pose for the current mode and time.
    pub fn pose(&self) -> Pose {
        self.animator.pose()
    }

    /// Run one frame: apply queued mode commands, update the rig, advance
    /// the clock and write the pose.
    ///
    /// Returns `None` when no rig is loaded; nothing is written and the clock
    /// does not advance.
    pub fn frame(&mut self, delta: f32) -> Option<ApplyReport> {
        self.drain_commands();

        let rig = self.rig.as_mut()?;
        let delta = delta * self.options.time_scale;

        rig.update(delta);
        self.animator.advance(delta);
        Some(self.animator.pose().apply(rig))
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.rx.try_recv() {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: ModeCommand) -> ModeChange {
        let change = match command {
            ModeCommand::Set(mode) => self.animator.set_mode(mode),
            ModeCommand::Stop => self.animator.stop(),
        };

        tracing::debug!(
            "Animation mode {} -> {} (clock reset: {})",
            change.from,
            change.to,
            change.clock_reset
        );

        if self.options.reset_pose_on_switch {
            self.reset_managed_pose();
        }

        change
    }

    fn reset_managed_pose(&mut self) {
        let Some(rig) = self.rig.as_mut() else {
            return;
        };

        for &bone in MANAGED_BONES {
            if let Some(joint) = rig.joint_mut(bone) {
                joint.rotation = Vec3::ZERO;
            }
        }
        if let Some(control) = rig.expressions() {
            for name in MANAGED_EXPRESSIONS {
                control.set_value(name, 0.0);
            }
        }
    }
}

impl AvatarDriver<VrmRig> {
    /// Check an in-flight load and attach the rig once it arrives.
    ///
    /// Returns `true` when the load has finished, successfully or not. A
    /// failed load is logged and the driver stays rig-less.
    pub fn poll_load(&mut self, load: &RigLoad) -> bool {
        match load.poll() {
            None => false,
            Some(result) => {
                self.finish_load(result);
                true
            }
        }
    }

    /// Attach the outcome of a finished load.
    pub fn finish_load(&mut self, result: Result<VrmRig, crate::error::RigError>) {
        match result {
            Ok(rig) => {
                tracing::info!(
                    "VRM model loaded: {} humanoid bones, {} expressions",
                    rig.bone_count(),
                    rig.expression_manager().names().count()
                );
                self.attach_rig(rig);
            }
            Err(e) => tracing::error!("Error loading VRM model: {}", e),
        }
    }
}

/// A mode command scheduled at a point in animation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledCommand {
    /// Seconds since playback start
    pub at: f32,
    pub command: ModeCommand,
}

/// Parse a mode script such as `"waving@1.0,talking@2.5,stop@4"`.
///
/// Entries are sorted by time; entries with equal times keep their order.
pub fn parse_script(script: &str) -> Result<Vec<ScheduledCommand>, ConfigError> {
    let mut commands = Vec::new();

    for entry in script.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = |message: String| ConfigError::InvalidScript {
            entry: entry.to_string(),
            message,
        };

        let (name, at) = entry
            .split_once('@')
            .ok_or_else(|| invalid("expected <mode>@<seconds>".to_string()))?;
        let command: ModeCommand = name.parse().map_err(invalid)?;
        let at: f32 = at
            .trim()
            .parse()
            .map_err(|e| invalid(format!("bad time: {}", e)))?;
        if !at.is_finite() || at < 0.0 {
            return Err(invalid("time must be a non-negative number".to_string()));
        }
        if Duration::try_from_secs_f32(at).is_err() {
            return Err(invalid("time is out of range".to_string()));
        }

        commands.push(ScheduledCommand { at, command });
    }

    commands.sort_by(|a, b| a.at.total_cmp(&b.at));
    Ok(commands)
}
