//! Installed application inventory.
//!
//! Enumerates applications from registry uninstall keys, Start Menu shortcuts and a
//! configured UWP catalog, resolves a launchable path for each, removes duplicates and
//! returns a name-sorted list. The user's own application and website lists live in
//! [`store`].

pub mod config;
pub mod dedup;
pub mod error;
pub mod icon;
pub mod inventory;
pub mod models;
pub mod resolver;
pub mod scanner;
pub mod store;
#[cfg(windows)]
mod windows_utils;

pub use config::AppConfig;
pub use inventory::InventoryService;
pub use models::{AppEntry, ApplicationRecord, Icon};

/// Scans the machine and returns every installed application, sorted by name.
///
/// Uses the config file from the data directory when it can be read and defaults
/// otherwise. Never fails: unavailable sources simply contribute nothing.
pub fn get_installed_applications() -> Vec<ApplicationRecord> {
    let config = AppConfig::load_or_default(&config::config_path());
    InventoryService::for_current_system(&config).collect()
}
