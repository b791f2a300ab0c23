//! Application state: configuration, driver catalog, and profiles

use anyhow::{bail, Result};
use ekos_debugger_core::{
    build_launch_args, indi_invocation, kstars_invocation, CatalogDiagnostic, DriverCatalog,
    Invocation, LaunchArgs, Profile, ProfileStore,
};
use tracing::{info, warn};

use crate::config::Config;

/// Everything the commands need, loaded once at startup
pub struct AppState {
    pub config: Config,
    pub catalog: DriverCatalog,
    /// Problems found while loading the catalog
    pub diagnostics: Vec<CatalogDiagnostic>,
    pub profiles: ProfileStore,
}

/// The device selection that drives an INDI launch
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub profile: &'a Profile,
    /// Primary device label; empty when the profile has no devices
    pub driver: String,
}

impl AppState {
    /// Load the driver catalog and profile database named by the configuration.
    ///
    /// Neither source is fatal: problems are logged and leave the catalog or
    /// profile list empty.
    pub fn load(config: Config) -> Self {
        let load = DriverCatalog::load(&config.drivers.path);
        let profiles = load_profiles(&config);

        Self {
            config,
            catalog: load.catalog,
            diagnostics: load.diagnostics,
            profiles,
        }
    }

    /// Pick a profile and its primary device.
    ///
    /// Without an explicit driver the profile's first device is used, which is
    /// what the driver selector shows when a profile is chosen.
    pub fn select<'a>(&'a self, profile: &str, driver: Option<&str>) -> Result<Selection<'a>> {
        let profile = self.profiles.find(profile)?;
        let driver = match driver {
            Some(driver) => {
                if !profile.driver_labels().any(|l| l == driver) {
                    warn!(profile = %profile.name, driver, "Driver is not part of the profile");
                }
                driver.to_string()
            }
            None => profile.default_driver().unwrap_or_default().to_string(),
        };
        Ok(Selection { profile, driver })
    }

    /// Driver commands for a selection
    pub fn launch_args(&self, selection: &Selection<'_>) -> LaunchArgs {
        build_launch_args(&selection.driver, selection.profile, &self.catalog)
    }

    /// Debugger command line for the INDI server, listening on the profile's port
    pub fn indi_invocation(&self, selection: &Selection<'_>) -> Invocation {
        let drivers = self.launch_args(selection);
        let mut server = self.config.server_options();
        server.port = selection.profile.port;
        indi_invocation(&self.config.debugger.program, &server, &drivers)
    }

    /// Refuse to launch a server that belongs on another machine
    pub fn ensure_local(&self, selection: &Selection<'_>) -> Result<()> {
        let profile = selection.profile;
        if !profile.is_local() {
            bail!(
                "Profile '{}' connects to {}:{}, start the server on that host instead",
                profile.name,
                profile.host.as_deref().unwrap_or_default(),
                profile.port
            );
        }
        Ok(())
    }

    /// Debugger command line for KStars
    pub fn kstars_invocation(&self) -> Invocation {
        kstars_invocation(&self.config.debugger.program, &self.config.kstars.program)
    }
}

fn load_profiles(config: &Config) -> ProfileStore {
    let path = &config.profiles.path;
    if !path.exists() {
        info!(path = %path.display(), "Profile database not found, no profiles available");
        return ProfileStore::default();
    }
    match ProfileStore::from_file(path) {
        Ok(store) => {
            info!(path = %path.display(), profiles = store.profile.len(), "Loaded profiles");
            store
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load profiles, no profiles available");
            ProfileStore::default()
        }
    }
}
