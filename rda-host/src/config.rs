//! Configuration for the RDA host.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rda_core::HostOptions;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Local display settings.
    pub screen: ScreenConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface to bind the control and channel listeners on.
    pub bind_ip: String,
    /// Preferred control port, probed upward when taken.
    pub preferred_port: u16,
    /// IPv4 address to put into the rendezvous code. Empty means
    /// autodetect the machine's outbound address.
    pub advertise_ip: String,
    /// Per-operation stall bound on established channels, in
    /// milliseconds. 0 disables the bound.
    pub io_timeout_ms: u64,
}

/// Local display dimensions, used to scale replayed input
/// coordinates onto this machine's screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
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
            bind_ip: "0.0.0.0".into(),
            preferred_port: rda_core::DEFAULT_CONTROL_PORT,
            advertise_ip: String::new(),
            io_timeout_ms: 0,
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
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

impl HostConfig {
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

    /// Convert the network section into negotiation options.
    pub fn to_host_options(&self) -> Result<HostOptions, std::net::AddrParseError> {
        let bind_ip: IpAddr = self.network.bind_ip.parse()?;
        let advertise_ip = if self.network.advertise_ip.is_empty() {
            None
        } else {
            Some(self.network.advertise_ip.parse::<Ipv4Addr>()?)
        };
        let io_timeout = match self.network.io_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(HostOptions {
            bind_ip,
            start_port: self.network.preferred_port,
            advertise_ip,
            io_timeout,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = HostConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("preferred_port"));
        assert!(text.contains("width"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = HostConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: HostConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.preferred_port, 9990);
        assert_eq!(parsed.screen.width, 1920);
    }

    #[test]
    fn to_host_options_maps_fields() {
        let mut cfg = HostConfig::default();
        cfg.network.advertise_ip = "192.168.0.7".into();
        cfg.network.io_timeout_ms = 2500;

        let options = cfg.to_host_options().unwrap();
        assert_eq!(options.start_port, 9990);
        assert_eq!(
            options.advertise_ip,
            Some("192.168.0.7".parse::<Ipv4Addr>().unwrap())
        );
        assert_eq!(options.io_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn to_host_options_rejects_bad_ip() {
        let mut cfg = HostConfig::default();
        cfg.network.bind_ip = "not-an-ip".into();
        assert!(cfg.to_host_options().is_err());
    }
}
