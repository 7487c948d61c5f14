//! Server configuration: RON file on disk, command-line flags on top.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::controller::ControllerTuning;
use crate::error::ConfigError;
use crate::wheel::WheelTuning;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub server: ServerConfig,
    /// Initial wheel tuning; can be replaced live over the socket.
    pub wheel: WheelTuning,
    pub controller: ControllerTuning,
    pub terrain: TerrainConfig,
    /// Fallback filter when `RUST_LOG` is unset; empty keeps the built-in one.
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket listen address.
    pub bind: String,
    /// Simulation ticks per second.
    pub tick_hz: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// JSON heightfield loaded after startup; flat ground only when absent.
    pub heightmap: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            wheel: WheelTuning::default(),
            controller: ControllerTuning::default(),
            terrain: TerrainConfig::default(),
            log_level: String::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9001".to_string(),
            tick_hz: 60,
        }
    }
}

impl GameConfig {
    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        ron::from_str(contents).map_err(ConfigError::ParseError)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&contents)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref bind) = args.bind {
            self.server.bind = bind.clone();
        }
        if let Some(hz) = args.tick_hz {
            self.server.tick_hz = hz;
        }
        if let Some(ref path) = args.heightmap {
            self.terrain.heightmap = Some(path.clone());
        }
        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
        }
    }

    /// File named by `--config` (defaults otherwise), then the remaining flags.
    pub fn resolve(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli_overrides(args);
        Ok(config)
    }

    /// Seconds per tick; a zero rate falls back to the default.
    pub fn tick_dt(&self) -> f32 {
        let hz = if self.server.tick_hz == 0 { ServerConfig::default().tick_hz } else { self.server.tick_hz };
        1.0 / hz as f32
    }
}

/// Command-line arguments. Values override the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "drift-server", about = "Arcade driving simulation served over WebSocket")]
pub struct CliArgs {
    /// Path to a RON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:9001.
    #[arg(long)]
    pub bind: Option<String>,

    /// Simulation rate in Hz.
    #[arg(long)]
    pub tick_hz: Option<u32>,

    /// JSON heightfield to load as terrain.
    #[arg(long)]
    pub heightmap: Option<PathBuf>,

    /// Log filter (error, warn, info, debug, trace or a full directive).
    #[arg(long)]
    pub log_level: Option<String>,
}
