// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    /// A job could not be handed to the master (no master running, the
    /// master went away, or the job itself is unusable).
    #[error("Submission error: {0}")]
    Submission(String),

    /// The master loop ended with an error or panicked. Nothing it held is
    /// recoverable.
    #[error("Grid master failed: {0}")]
    MasterFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Dependency cycle in job batch: {0}")]
    DependencyCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GridError>;
