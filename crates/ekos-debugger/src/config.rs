//! Configuration loading and validation

use anyhow::Result;
use ekos_debugger_core::{ServerOptions, INDI_PORT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub drivers: DriversConfig,
    #[serde(default)]
    pub profiles: ProfilesConfig,
    #[serde(default)]
    pub debugger: DebuggerConfig,
    #[serde(default)]
    pub kstars: KStarsConfig,
    #[serde(default)]
    pub indi: IndiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriversConfig {
    /// Directory holding the INDI driver descriptors
    #[serde(default = "default_drivers_path")]
    pub path: PathBuf,
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self {
            path: default_drivers_path(),
        }
    }
}

fn default_drivers_path() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/usr/local/share/indi")
    } else {
        PathBuf::from("/usr/share/indi")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Path to the profile database
    #[serde(default = "default_profiles_path")]
    pub path: PathBuf,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            path: default_profiles_path(),
        }
    }
}

fn default_profiles_path() -> PathBuf {
    PathBuf::from("./profiles.toml")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebuggerConfig {
    /// Debugger executable
    #[serde(default = "default_debugger")]
    pub program: String,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            program: default_debugger(),
        }
    }
}

fn default_debugger() -> String {
    "gdb".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KStarsConfig {
    #[serde(default = "default_kstars")]
    pub program: String,
    /// Relaunch after a crash
    #[serde(default = "default_true")]
    pub restart: bool,
    /// Directory logs are saved to
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
}

impl Default for KStarsConfig {
    fn default() -> Self {
        Self {
            program: default_kstars(),
            restart: true,
            save_path: default_save_path(),
        }
    }
}

fn default_kstars() -> String {
    "kstars".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndiConfig {
    #[serde(default = "default_indiserver")]
    pub program: String,
    /// Relaunch after a crash
    #[serde(default = "default_true")]
    pub restart: bool,
    /// Directory logs are saved to
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
    /// Times the server restarts a dead driver (`-r`)
    #[serde(default)]
    pub restart_count: u32,
    /// Pass `-v` to the server
    #[serde(default = "default_true")]
    pub verbose: bool,
}

impl Default for IndiConfig {
    fn default() -> Self {
        Self {
            program: default_indiserver(),
            restart: true,
            save_path: default_save_path(),
            restart_count: 0,
            verbose: true,
        }
    }
}

fn default_indiserver() -> String {
    "indiserver".to_string()
}

fn default_save_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Config {
    /// INDI server options for the launch command line, on the default port
    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            program: self.indi.program.clone(),
            port: INDI_PORT,
            restart_count: self.indi.restart_count,
            verbose: self.indi.verbose,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
