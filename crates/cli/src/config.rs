//! Configuration management for the ibtopo CLI
//!
//! Handles loading and saving configuration from ~/.ibtopo/config.toml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the ibtopo CLI
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub sharp: SharpConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// Remote user; ssh falls back to the local user name
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub private_key: Option<PathBuf>,

    /// Pattern matched against `ibstatus` device names
    #[serde(default = "default_ibdevice_pattern")]
    pub ibdevice_pattern: String,

    /// Hosts queried at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_ssh_bin")]
    pub ssh_bin: String,
}

fn default_ibdevice_pattern() -> String {
    "mlx5_ib".to_string()
}

fn default_concurrency() -> usize {
    16
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_ssh_bin() -> String {
    "ssh".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            username: None,
            private_key: None,
            ibdevice_pattern: default_ibdevice_pattern(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            ssh_bin: default_ssh_bin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharpConfig {
    #[serde(default)]
    pub cmd_path: Option<PathBuf>,

    #[serde(default = "default_ucx_interface")]
    pub ucx_interface: String,
}

fn default_ucx_interface() -> String {
    "mlx5_ib0:1".to_string()
}

impl Default for SharpConfig {
    fn default() -> Self {
        Self {
            cmd_path: None,
            ucx_interface: default_ucx_interface(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("ibtopo-out")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Graphviz `dot` binary; when set, topology.png is produced next to topology.dot
    #[serde(default)]
    pub graphviz_bin: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            graphviz_bin: None,
        }
    }
}

impl Config {
    /// Get the path to the default config file
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ibtopo")
            .join("config.toml")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get a configuration value by key path (e.g., "sharp.ucx_interface")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["discovery", "username"] => self.discovery.username.clone(),
            ["discovery", "private_key"] => self
                .discovery
                .private_key
                .as_ref()
                .map(|p| p.display().to_string()),
            ["discovery", "ibdevice_pattern"] => Some(self.discovery.ibdevice_pattern.clone()),
            ["discovery", "concurrency"] => Some(self.discovery.concurrency.to_string()),
            ["discovery", "timeout_secs"] => Some(self.discovery.timeout_secs.to_string()),
            ["discovery", "ssh_bin"] => Some(self.discovery.ssh_bin.clone()),
            ["sharp", "cmd_path"] => self.sharp.cmd_path.as_ref().map(|p| p.display().to_string()),
            ["sharp", "ucx_interface"] => Some(self.sharp.ucx_interface.clone()),
            ["output", "dir"] => Some(self.output.dir.display().to_string()),
            ["render", "enabled"] => Some(self.render.enabled.to_string()),
            ["render", "graphviz_bin"] => self
                .render
                .graphviz_bin
                .as_ref()
                .map(|p| p.display().to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key path
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["discovery", "username"] => self.discovery.username = Some(value.to_string()),
            ["discovery", "private_key"] => {
                self.discovery.private_key = Some(PathBuf::from(value))
            }
            ["discovery", "ibdevice_pattern"] => {
                self.discovery.ibdevice_pattern = value.to_string()
            }
            ["discovery", "concurrency"] => {
                self.discovery.concurrency = value
                    .parse()
                    .with_context(|| format!("invalid concurrency: {value}"))?
            }
            ["discovery", "timeout_secs"] => {
                self.discovery.timeout_secs = value
                    .parse()
                    .with_context(|| format!("invalid timeout: {value}"))?
            }
            ["discovery", "ssh_bin"] => self.discovery.ssh_bin = value.to_string(),
            ["sharp", "cmd_path"] => self.sharp.cmd_path = Some(PathBuf::from(value)),
            ["sharp", "ucx_interface"] => self.sharp.ucx_interface = value.to_string(),
            ["output", "dir"] => self.output.dir = PathBuf::from(value),
            ["render", "enabled"] => {
                self.render.enabled = value
                    .parse()
                    .with_context(|| format!("invalid boolean: {value}"))?
            }
            ["render", "graphviz_bin"] => self.render.graphviz_bin = Some(PathBuf::from(value)),
            _ => anyhow::bail!("Unknown configuration key: {}", key),
        }

        Ok(())
    }
}
