//! Procedural gesture animation
//!
//! The [`Animator`] tracks which mode is active and for how long; the
//! [`pose`] module turns that into joint rotations and expression weights.

pub mod mode;
pub mod pose;
pub mod state;

pub use mode::AnimationMode;
pub use pose::{evaluate, ApplyReport, AxisRotation, BoneWrite, ExpressionWrite, Pose};
pub use state::{Animator, ClockPolicy, ModeChange};
