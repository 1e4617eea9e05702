//! Configuration for the RDA client.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rda_core::ClientOptions;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Synthetic capture settings.
    pub capture: CaptureConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Bound on each TCP connect, in milliseconds. 0 disables it.
    pub connect_timeout_ms: u64,
    /// Per-operation stall bound on established channels, in
    /// milliseconds. 0 disables the bound.
    pub io_timeout_ms: u64,
}

/// Settings for the stand-in frame source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Payload size of each synthetic frame in bytes.
    pub frame_bytes: usize,
    /// Frames per second to produce.
    pub fps: u8,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            io_timeout_ms: 0,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_bytes: 16 * 1024,
            fps: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Convert the network section into connection options.
    pub fn to_client_options(&self) -> ClientOptions {
        let to_duration = |ms: u64| match ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        ClientOptions {
            connect_timeout: to_duration(self.network.connect_timeout_ms),
            io_timeout: to_duration(self.network.io_timeout_ms),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
