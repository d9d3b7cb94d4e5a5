//! Core error types for speller-core.
//!
//! This module defines the error hierarchy using thiserror. Invalid
//! configuration is caught when a session is built; collaborator failures
//! (surface, event channel) propagate out of the operation that hit them.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for speller-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Rendering collaborator failed
    #[error("Stimulus surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// Event channel failed
    #[error("Event channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Cooperative scheduler failed
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Validation errors for runtime inputs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A character that is not part of the alphabet
    #[error("Symbol '{symbol}' is not part of the alphabet")]
    UnknownSymbol { symbol: char },
}

/// Errors raised by the rendering collaborator.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// No element exists for the symbol index
    #[error("No grid element for symbol {index}")]
    MissingElement { index: usize },

    /// Rendering backend failure
    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the event channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Outbound transport could not deliver an event
    #[error("Failed to emit '{label}': {message}")]
    EmitFailed { label: &'static str, message: String },

    /// Inbound message could not be decoded
    #[error("Malformed model message: {0}")]
    Malformed(String),
}

/// Errors raised by the cooperative scheduler.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    /// The worker is gone; no more tasks will run
    #[error("Scheduler queue is closed")]
    Closed,
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
