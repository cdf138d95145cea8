use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

pub const APP_LIST_FILE: &str = "applications.json";
pub const WEBSITE_FILE: &str = "websites.json";
pub const CONFIG_FILE: &str = "config.json";
const DATA_DIR_ENV: &str = "SOFTGENIE_DATA_DIR";

/// Display names that mark OS patches rather than user-facing applications.
pub static DEFAULT_NOISE_PATTERNS: Lazy<Vec<String>> = Lazy::new(|| {
    ["security update", "update for", "service pack", "hotfix", "kb"]
        .into_iter()
        .map(String::from)
        .collect()
});

/// Packaged apps the catalog scanner knows about out of the box.
pub static DEFAULT_UWP_APPS: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "calculator".to_string(),
            "Microsoft.WindowsCalculator_8wekyb3d8bbwe!App".to_string(),
        ),
        (
            "microsoft.teams".to_string(),
            "MicrosoftTeams_8wekyb3d8bbwe!Teams".to_string(),
        ),
    ])
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Friendly name to UWP launch identifier.
    pub uwp_apps: BTreeMap<String, String>,
    /// Case-insensitive substrings that drop a display name, on top of
    /// [`DEFAULT_NOISE_PATTERNS`].
    pub extra_noise_patterns: Vec<String>,
    pub executable_extension: String,
    pub scan_registry: bool,
    pub scan_start_menu: bool,
    pub extract_icons: bool,
    pub parallel_scan: bool,
    /// `None` walks install locations to any depth.
    pub walk_depth_limit: Option<usize>,
    /// Upper bound on entries visited per install-location walk.
    pub walk_entry_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            uwp_apps: DEFAULT_UWP_APPS.clone(),
            extra_noise_patterns: Vec::new(),
            executable_extension: "exe".to_string(),
            scan_registry: true,
            scan_start_menu: true,
            extract_icons: true,
            parallel_scan: true,
            walk_depth_limit: None,
            walk_entry_limit: 50_000,
        }
    }
}

impl AppConfig {
    /// Reads the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.is_file() {
            debug!("no config at {path:?}, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`AppConfig::load`], but never fails.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            warn!("ignoring unreadable config: {err}");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Directory holding config and the user's lists.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(local_app_data) = env::var_os("LOCALAPPDATA") {
        return PathBuf::from(local_app_data).join("softgenie");
    }
    PathBuf::from("data")
}

pub fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

pub fn applications_path() -> PathBuf {
    data_dir().join(APP_LIST_FILE)
}

pub fn websites_path() -> PathBuf {
    data_dir().join(WEBSITE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(&dir.path().join(CONFIG_FILE)).expect("load");
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.uwp_apps.get("calculator").map(String::as_str),
            Some("Microsoft.WindowsCalculator_8wekyb3d8bbwe!App")
        );
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"{"scan_start_menu": false, "theme": "Dark", "uwp_apps": {"paint": "Microsoft.Paint_8wekyb3d8bbwe!App"}}"#,
        )
        .expect("write config");

        let config = AppConfig::load(&path).expect("load");
        assert!(!config.scan_start_menu);
        assert!(config.scan_registry);
        assert_eq!(config.uwp_apps.len(), 1);
        assert!(config.extra_noise_patterns.is_empty());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = AppConfig {
            walk_depth_limit: Some(4),
            extract_icons: false,
            ..AppConfig::default()
        };
        config.save(&path).expect("save");
        assert_eq!(AppConfig::load(&path).expect("load"), config);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{not json").expect("write config");
        assert!(matches!(AppConfig::load(&path), Err(StoreError::Json { .. })));
        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
    }
}
