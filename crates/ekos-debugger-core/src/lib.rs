//! Ekos Debugger Core - driver catalog, profiles, and launch argument construction
//!
//! This crate provides the pieces of the Ekos debugger that do not touch
//! processes:
//! - INDI driver descriptor parsing into a catalog of device groups
//! - Equipment profiles loaded from TOML
//! - Launch argument construction for the INDI server
//! - Debugger command lines and captured log buffers

pub mod catalog;
pub mod invocation;
pub mod launch;
pub mod logs;
pub mod profile;

pub use catalog::{
    parse_drivers_bytes, parse_drivers_xml, CatalogDiagnostic, CatalogError, CatalogLoad,
    DeviceEntry, DeviceGroup, DriverCatalog,
};
pub use invocation::{indi_invocation, kstars_invocation, Invocation, ServerOptions};
pub use launch::{build as build_launch_args, LaunchArgs};
pub use logs::{save_logs, LogBuffer, LogError, SavedLogs, Stream, TargetLogs};
pub use profile::{Profile, ProfileError, ProfileStore, INDI_PORT};
