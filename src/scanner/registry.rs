use std::{collections::HashMap, fmt, io, sync::Arc};

use crate::{
    error::ScanError,
    models::CandidateRecord,
    scanner::{accept_name, CandidateIter, NoiseFilter, SourceScanner},
};

pub const UNINSTALL_SUBKEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall";
pub const WOW64_UNINSTALL_SUBKEY: &str =
    r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall";

const DISPLAY_NAME: &str = "DisplayName";
const DISPLAY_ICON: &str = "DisplayIcon";
const INSTALL_LOCATION: &str = "InstallLocation";
const UNINSTALL_STRING: &str = "UninstallString";
const DISPLAY_VERSION: &str = "DisplayVersion";
const PUBLISHER: &str = "Publisher";
const INSTALL_DATE: &str = "InstallDate";

/// Value names read from every uninstall subkey.
pub const VALUE_NAMES: [&str; 7] = [
    DISPLAY_NAME,
    DISPLAY_ICON,
    INSTALL_LOCATION,
    UNINSTALL_STRING,
    DISPLAY_VERSION,
    PUBLISHER,
    INSTALL_DATE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryHive {
    LocalMachine,
    CurrentUser,
}

/// Which registry view to open on 64-bit Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegistryView {
    #[default]
    Default,
    Force64,
    Force32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryLocation {
    pub hive: RegistryHive,
    pub path: String,
    pub view: RegistryView,
}

impl RegistryLocation {
    pub fn new(hive: RegistryHive, path: impl Into<String>, view: RegistryView) -> Self {
        Self {
            hive,
            path: path.into(),
            view,
        }
    }
}

impl fmt::Display for RegistryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hive = match self.hive {
            RegistryHive::LocalMachine => "HKLM",
            RegistryHive::CurrentUser => "HKCU",
        };
        write!(f, "{hive}\\{}", self.path)?;
        match self.view {
            RegistryView::Default => Ok(()),
            RegistryView::Force64 => write!(f, " (64-bit view)"),
            RegistryView::Force32 => write!(f, " (32-bit view)"),
        }
    }
}

/// The uninstall keys that list installed Win32 software.
pub fn default_locations() -> Vec<RegistryLocation> {
    vec![
        RegistryLocation::new(
            RegistryHive::LocalMachine,
            UNINSTALL_SUBKEY,
            RegistryView::Force64,
        ),
        RegistryLocation::new(
            RegistryHive::LocalMachine,
            WOW64_UNINSTALL_SUBKEY,
            RegistryView::Force64,
        ),
        RegistryLocation::new(
            RegistryHive::CurrentUser,
            UNINSTALL_SUBKEY,
            RegistryView::Default,
        ),
    ]
}

/// String values of one uninstall subkey. Missing or non-string values read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallEntry {
    values: HashMap<String, String>,
}

impl UninstallEntry {
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// Read access to registry-like uninstall hierarchies.
pub trait UninstallRegistry: Send + Sync {
    fn open(&self, location: &RegistryLocation) -> io::Result<Box<dyn UninstallKey + '_>>;
}

pub trait UninstallKey {
    /// Subkey names in enumeration order; an `Err` marks a subkey that could not be enumerated.
    fn subkey_names(&self) -> Vec<io::Result<String>>;
    fn read_entry(&self, subkey: &str) -> io::Result<UninstallEntry>;
}

pub struct RegistryScanner {
    location: RegistryLocation,
    registry: Arc<dyn UninstallRegistry>,
    filter: NoiseFilter,
}

impl RegistryScanner {
    pub fn new(
        location: RegistryLocation,
        registry: Arc<dyn UninstallRegistry>,
        filter: NoiseFilter,
    ) -> Self {
        Self {
            location,
            registry,
            filter,
        }
    }

    fn to_candidate(
        &self,
        key: &dyn UninstallKey,
        subkey: io::Result<String>,
        source_name: &str,
    ) -> Option<Result<CandidateRecord, ScanError>> {
        let subkey = match subkey {
            Ok(subkey) => subkey,
            Err(err) => return Some(Err(ScanError::malformed(source_name, "<unnamed>", err))),
        };
        let entry = match key.read_entry(&subkey) {
            Ok(entry) => entry,
            Err(err) => return Some(Err(ScanError::malformed(source_name, subkey, err))),
        };

        let name = match accept_name(&self.filter, entry.value(DISPLAY_NAME), source_name, &subkey)? {
            Ok(name) => name,
            Err(err) => return Some(Err(err)),
        };

        Some(Ok(CandidateRecord {
            name,
            icon_hint: entry.value(DISPLAY_ICON).to_string(),
            install_location: entry.value(INSTALL_LOCATION).to_string(),
            uninstall_command: entry.value(UNINSTALL_STRING).to_string(),
            version: entry.value(DISPLAY_VERSION).trim().to_string(),
            vendor: entry.value(PUBLISHER).trim().to_string(),
            install_date: entry.value(INSTALL_DATE).trim().to_string(),
            ..CandidateRecord::default()
        }))
    }
}

impl SourceScanner for RegistryScanner {
    fn source_name(&self) -> String {
        format!("registry {}", self.location)
    }

    fn scan(&self) -> Result<CandidateIter<'_>, ScanError> {
        let source_name = self.source_name();
        let key = self
            .registry
            .open(&self.location)
            .map_err(|err| ScanError::unavailable(source_name.clone(), err))?;

        let subkeys = key.subkey_names();
        Ok(Box::new(subkeys.into_iter().filter_map(move |subkey| {
            self.to_candidate(key.as_ref(), subkey, &source_name)
        })))
    }
}

/// In-memory registry used to drive scanners without touching the OS.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistry {
    keys: HashMap<RegistryLocation, Vec<(String, Option<UninstallEntry>)>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        location: &RegistryLocation,
        subkey: &str,
        entry: UninstallEntry,
    ) -> Self {
        self.keys
            .entry(location.clone())
            .or_default()
            .push((subkey.to_string(), Some(entry)));
        self
    }

    /// Registers a subkey that fails to open, like one guarded by an ACL.
    pub fn with_unreadable(mut self, location: &RegistryLocation, subkey: &str) -> Self {
        self.keys
            .entry(location.clone())
            .or_default()
            .push((subkey.to_string(), None));
        self
    }
}

struct MemoryKey<'a> {
    entries: &'a [(String, Option<UninstallEntry>)],
}

impl UninstallRegistry for MemoryRegistry {
    fn open(&self, location: &RegistryLocation) -> io::Result<Box<dyn UninstallKey + '_>> {
        let entries = self.keys.get(location).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{location} does not exist"))
        })?;
        Ok(Box::new(MemoryKey { entries }))
    }
}

impl UninstallKey for MemoryKey<'_> {
    fn subkey_names(&self) -> Vec<io::Result<String>> {
        self.entries.iter().map(|(name, _)| Ok(name.clone())).collect()
    }

    fn read_entry(&self, subkey: &str) -> io::Result<UninstallEntry> {
        self.entries
            .iter()
            .find(|(name, _)| name == subkey)
            .and_then(|(_, entry)| entry.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "access denied"))
    }
}

#[cfg(windows)]
pub use self::windows_registry::WindowsRegistry;

#[cfg(windows)]
mod windows_registry {
    use std::io;

    use winreg::{enums::*, RegKey};

    use super::{
        RegistryHive, RegistryLocation, RegistryView, UninstallEntry, UninstallKey,
        UninstallRegistry, VALUE_NAMES,
    };

    /// Live registry access through `winreg`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct WindowsRegistry;

    struct WindowsKey {
        key: RegKey,
        flags: u32,
    }

    fn view_flags(view: RegistryView) -> u32 {
        match view {
            RegistryView::Default => 0,
            RegistryView::Force64 => KEY_WOW64_64KEY,
            RegistryView::Force32 => KEY_WOW64_32KEY,
        }
    }

    impl UninstallRegistry for WindowsRegistry {
        fn open(&self, location: &RegistryLocation) -> io::Result<Box<dyn UninstallKey + '_>> {
            let root = RegKey::predef(match location.hive {
                RegistryHive::LocalMachine => HKEY_LOCAL_MACHINE,
                RegistryHive::CurrentUser => HKEY_CURRENT_USER,
            });
            let flags = view_flags(location.view);
            let key = root.open_subkey_with_flags(&location.path, KEY_READ | flags)?;
            Ok(Box::new(WindowsKey { key, flags }))
        }
    }

    impl UninstallKey for WindowsKey {
        fn subkey_names(&self) -> Vec<io::Result<String>> {
            self.key.enum_keys().collect()
        }

        fn read_entry(&self, subkey: &str) -> io::Result<UninstallEntry> {
            let key = self
                .key
                .open_subkey_with_flags(subkey, KEY_READ | self.flags)?;
            let mut entry = UninstallEntry::default();
            for name in VALUE_NAMES {
                // DWORD and binary values are not names or paths; skip them.
                if let Ok(value) = key.get_value::<String, _>(name) {
                    entry.insert(name, value);
                }
            }
            Ok(entry)
        }
    }
}
