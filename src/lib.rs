//! vrmotion - Procedural gesture animation for VRM avatars
//!
//! A small runtime that drives a humanoid VRM model with time-based
//! procedural motion:
//! - An animation state holder with idle, waving, nodding and talking modes
//! - A pose evaluator that writes joint rotations and mouth expression weights
//! - A VRM 0.x / 1.0 rig loader built on glTF
//! - A frame driver that accepts mode switches from any thread

pub mod animation;
pub mod config;
pub mod driver;
pub mod error;
pub mod rig;

pub use animation::{AnimationMode, Animator, ClockPolicy, Pose};
pub use config::Config;
pub use driver::{AvatarDriver, DriverOptions, ModeCommand, ModeTrigger};
pub use error::{Result, VrmotionError};
pub use rig::{HumanBone, HumanoidRig, VrmRig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
