//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (LUMEN_*)
//! - TOML configuration file (`LUMEN_CONFIG`, or the default search paths)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind both listeners to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port serving the control page.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Port accepting WebSocket sessions.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Actuator output.
    #[serde(default)]
    pub actuator: ActuatorConfig,

    /// Status display.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of simultaneous sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Actuator output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Value file of a GPIO line (e.g. `/sys/class/gpio/gpio2/value`).
    /// Without it the actuator only logs.
    #[serde(default)]
    pub gpio_value_path: Option<PathBuf>,

    /// Drive the line low to switch the output on.
    #[serde(default = "default_true")]
    pub active_low: bool,
}

/// Status display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Render the status panel to the log.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Heading shown on the panel and the control page.
    #[serde(default = "default_title")]
    pub title: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("LUMEN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn port_from_env(var: &str, fallback: u16) -> u16 {
    std::env::var(var)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(fallback)
}

fn default_http_port() -> u16 {
    port_from_env("LUMEN_HTTP_PORT", 8080)
}

fn default_ws_port() -> u16 {
    port_from_env("LUMEN_WS_PORT", 8081)
}

fn default_true() -> bool {
    true
}

fn default_max_sessions() -> usize {
    8
}

fn default_max_message_size() -> usize {
    4 * 1024 // 4 KB
}

fn default_title() -> String {
    "Lumen".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            ws_port: default_ws_port(),
            limits: LimitsConfig::default(),
            actuator: ActuatorConfig::default(),
            display: DisplayConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            gpio_value_path: None,
            active_low: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_title(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// `LUMEN_CONFIG` names an explicit file; otherwise the first existing
    /// default path wins.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("LUMEN_CONFIG") {
            return Self::from_file(shellexpand::tilde(&path).as_ref());
        }

        let config_paths = [
            "lumen.toml",
            "/etc/lumen/lumen.toml",
            "~/.config/lumen/lumen.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Address of the control page listener.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not a valid IP address.
    pub fn http_addr(&self) -> Result<SocketAddr> {
        self.addr(self.http_port)
    }

    /// Address of the WebSocket listener.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not a valid IP address.
    pub fn ws_addr(&self) -> Result<SocketAddr> {
        self.addr(self.ws_port)
    }

    fn addr(&self, port: u16) -> Result<SocketAddr> {
        format!("{}:{}", self.host, port)
            .parse()
            .with_context(|| format!("Invalid host: {}", self.host))
    }
}
