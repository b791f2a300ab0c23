//! Equipment profiles - named sets of devices launched together
//!
//! Profiles are stored as TOML:
//!
//! ```toml
//! [[profile]]
//! name = "Simulators"
//! host = "localhost"
//!
//! [profile.drivers]
//! mount = "Telescope Simulator"
//! ccd = "CCD Simulator"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Default INDI server port
pub const INDI_PORT: u16 = 7624;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to read profiles: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse profiles: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize profiles: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("No profile named '{0}'")]
    NotFound(String),
}

/// A named selection of devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Remote INDI host, local server when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Role (e.g. "mount", "ccd") to device label
    #[serde(default)]
    pub drivers: BTreeMap<String, String>,
}

fn default_port() -> u16 {
    INDI_PORT
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
            port: INDI_PORT,
            drivers: BTreeMap::new(),
        }
    }

    /// Assign a device label to a role
    pub fn with_driver(mut self, role: impl Into<String>, label: impl Into<String>) -> Self {
        self.drivers.insert(role.into(), label.into());
        self
    }

    /// Device labels in role order
    pub fn driver_labels(&self) -> impl Iterator<Item = &str> {
        self.drivers.values().map(|s| s.as_str())
    }

    /// Label selected by default when the profile is picked
    pub fn default_driver(&self) -> Option<&str> {
        self.driver_labels().next()
    }

    /// Whether the server for this profile runs on this machine
    pub fn is_local(&self) -> bool {
        matches!(self.host.as_deref(), None | Some("localhost") | Some("127.0.0.1"))
    }
}

/// Profile database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStore {
    #[serde(default)]
    pub profile: Vec<Profile>,
}

impl ProfileStore {
    /// Load profiles from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load profiles from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ProfileError> {
        let store: ProfileStore = toml::from_str(content)?;
        Ok(store)
    }

    /// Save profiles to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ProfileError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Look up a profile by exact name
    pub fn find(&self, name: &str) -> Result<&Profile, ProfileError> {
        self.profile
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    /// Profile names in stored order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profile.iter().map(|p| p.name.as_str())
    }

    pub fn add(&mut self, profile: Profile) {
        self.profile.push(profile);
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_empty()
    }
}
