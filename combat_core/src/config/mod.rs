//! Configuration for the combat core

mod constants;

pub use constants::{
    ControlConstants, CritConstants, DamageConstants, FeedConstants, GameConstants,
    MitigationConstants, ProgressionConstants,
};

use std::path::PathBuf;
use thiserror::Error;

/// Error loading game constants
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading '{path:?}': {error}")]
    Io {
        error: std::io::Error,
        path: Option<PathBuf>,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}
