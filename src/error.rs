//! Error types for the fallible setup paths. Nothing inside a simulation tick returns these.

use std::path::PathBuf;

/// Errors that can occur when loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON content.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),
}

/// Errors raised while loading a terrain heightfield.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read asset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse asset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("heightfield is {rows}x{cols} but has {len} samples")]
    Shape { rows: usize, cols: usize, len: usize },

    #[error("heightfield needs at least 2x2 samples, got {rows}x{cols}")]
    TooSmall { rows: usize, cols: usize },
}

/// Errors that stop the WebSocket server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown key code `{0}`")]
    UnknownKey(String),
}
