//! Animation state holder

use serde::{Deserialize, Serialize};

use super::mode::AnimationMode;
use super::pose::{self, Pose};

/// When switching modes resets the animation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockPolicy {
    /// Every mode switch resets the clock, including re-selecting the
    /// active mode.
    #[default]
    Always,
    /// Only switching into a gesture resets the clock; returning to idle
    /// keeps it running.
    GesturesOnly,
}

impl ClockPolicy {
    fn resets_on(&self, mode: AnimationMode) -> bool {
        match self {
            Self::Always => true,
            Self::GesturesOnly => mode.is_gesture(),
        }
    }
}

/// Record of a mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub from: AnimationMode,
    pub to: AnimationMode,
    /// Whether the elapsed-time clock went back to zero
    pub clock_reset: bool,
}

impl ModeChange {
    /// Whether the active mode actually changed.
    pub fn is_transition(&self) -> bool {
        self.from != self.to
    }
}

/// Holds the active animation mode and the time spent in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Animator {
    mode: AnimationMode,
    elapsed: f32,
    policy: ClockPolicy,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(AnimationMode::Idle, ClockPolicy::default())
    }
}

impl Animator {
    pub fn new(initial: AnimationMode, policy: ClockPolicy) -> Self {
        Self {
            mode: initial,
            elapsed: 0.0,
            policy,
        }
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    /// Seconds spent in the current mode (since the last clock reset).
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn policy(&self) -> ClockPolicy {
        self.policy
    }

    /// Switch to `mode`. The switch is unconditional; whether the clock
    /// resets depends on the [`ClockPolicy`].
    pub fn set_mode(&mut self, mode: AnimationMode) -> ModeChange {
        let from = self.mode;
        self.mode = mode;

        let clock_reset = self.policy.resets_on(mode);
        if clock_reset {
            self.elapsed = 0.0;
        }

        ModeChange {
            from,
            to: mode,
            clock_reset,
        }
    }

    pub fn start_idle(&mut self) -> ModeChange {
        self.set_mode(AnimationMode::Idle)
    }

    pub fn start_waving(&mut self) -> ModeChange {
        self.set_mode(AnimationMode::Waving)
    }

    pub fn start_nodding(&mut self) -> ModeChange {
        self.set_mode(AnimationMode::Nodding)
    }

    pub fn start_talking(&mut self) -> ModeChange {
        self.set_mode(AnimationMode::Talking)
    }

    /// Stop any gesture and return to idle.
    pub fn stop(&mut self) -> ModeChange {
        self.start_idle()
    }

    /// Advance the clock by `delta` seconds. Negative and non-finite deltas
    /// count as zero.
    pub fn advance(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.elapsed += delta;
        }
    }

    /// The pose for the current mode and elapsed time.
    pub fn pose(&self) -> Pose {
        pose::evaluate(self.mode, self.elapsed)
    }
}
