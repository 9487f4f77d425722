//! Animation modes

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The procedural motion currently driving the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationMode {
    /// Breathing, head sway and relaxed arms
    #[default]
    Idle,
    /// Right arm raised and waving
    Waving,
    /// Head nodding
    Nodding,
    /// Head bobbing with the mouth opening and closing
    Talking,
}

impl AnimationMode {
    pub const ALL: [AnimationMode; 4] = [Self::Idle, Self::Waving, Self::Nodding, Self::Talking];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waving => "waving",
            Self::Nodding => "nodding",
            Self::Talking => "talking",
        }
    }

    /// Whether this mode is a gesture (anything but idle).
    pub fn is_gesture(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for AnimationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "waving" | "wave" => Ok(Self::Waving),
            "nodding" | "nod" => Ok(Self::Nodding),
            "talking" | "talk" => Ok(Self::Talking),
            other => Err(format!("unknown animation mode '{}'", other)),
        }
    }
}
