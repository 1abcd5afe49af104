//! Error types for the fairseed engine
//!
//! `EngineError` covers everything the outcome engine can reject. None of these
//! are fatal: the caller decides what to show the player and retries with
//! corrected input. `FairseedError` is the root error used by the binaries and
//! the configuration loader.

use thiserror::Error;

/// Conditions raised by the seed manager, the draw function and the game mappers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A seed is empty or malformed; regenerate it before drawing
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// A nonce was requested before any session exists
    #[error("Session not initialized: {0}")]
    SessionNotInitialized(String),

    /// The operation is not allowed in the current state (e.g. rotating mid-round)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A game parameter is out of range; rejected before any nonce is consumed
    #[error("Invalid parameter {field}: {reason}")]
    InvalidParameter { field: String, reason: String },
}

impl EngineError {
    pub fn invalid_parameter(field: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

/// Root error type for fairseed binaries
#[derive(Debug, Error)]
pub enum FairseedError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

pub type FairseedResult<T> = Result<T, FairseedError>;
