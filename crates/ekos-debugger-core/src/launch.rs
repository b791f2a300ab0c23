//! Device server launch arguments derived from a profile and the driver catalog

use serde::Serialize;
use tracing::debug;

use crate::catalog::DriverCatalog;
use crate::profile::Profile;

/// Driver commands passed to the INDI server, primary device first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LaunchArgs(Vec<String>);

impl LaunchArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    fn push_resolved(&mut self, catalog: &DriverCatalog, label: &str) {
        match catalog.find_command(label) {
            Some(command) => self.0.push(command.to_string()),
            None => debug!(label, "No driver found for device, skipped"),
        }
    }
}

impl std::fmt::Display for LaunchArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

impl From<Vec<String>> for LaunchArgs {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

/// Resolve the selected device and the rest of the profile to driver commands.
///
/// The primary device comes first. Every other profile device follows in the
/// profile's role order; a profile entry equal to the primary label is not
/// repeated. Labels without a driver in the catalog are dropped.
pub fn build(primary: &str, profile: &Profile, catalog: &DriverCatalog) -> LaunchArgs {
    let mut args = LaunchArgs::new();
    if primary.is_empty() {
        return args;
    }

    args.push_resolved(catalog, primary);
    for label in profile.driver_labels().filter(|l| *l != primary) {
        args.push_resolved(catalog, label);
    }

    debug!(primary, profile = %profile.name, args = %args, "Built launch arguments");
    args
}
