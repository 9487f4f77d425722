//! Error types for vrmotion
//!
//! The animation core itself never fails: a missing rig, a missing bone or a
//! rig without expression support are expected variation, not errors. These
//! types cover the layers around it (configuration and rig loading).

use thiserror::Error;

/// Main error type for vrmotion
#[derive(Error, Debug)]
pub enum VrmotionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rig error: {0}")]
    Rig(#[from] RigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid mode script entry '{entry}': {message}")]
    InvalidScript { entry: String, message: String },
}

/// Rig loading errors
#[derive(Error, Debug)]
pub enum RigError {
    #[error("Failed to read model file: {0}")]
    ReadFile(String),

    #[error("Failed to parse glTF container: {0}")]
    Gltf(String),

    #[error("Failed to parse glTF JSON: {0}")]
    Json(String),

    #[error("Model has no VRM humanoid definition")]
    NotHumanoid,

    #[error("Rig loader task ended without a result: {0}")]
    LoaderGone(String),
}

/// Result type alias for vrmotion operations
pub type Result<T> = std::result::Result<T, VrmotionError>;
