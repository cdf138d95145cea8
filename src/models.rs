use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use serde::{Deserialize, Serialize, Serializer};

/// Prefix marking an `executable_path` that is really a UWP launch identifier.
pub const UWP_PREFIX: &str = "UWP:";

/// One installed application as exposed to callers of the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub name: String,
    #[serde(rename = "exe_path", default)]
    pub executable_path: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub install_date: String,
    #[serde(default)]
    pub install_location: String,
    /// Emitted as base64 PNG; never read back.
    #[serde(
        skip_deserializing,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_icon"
    )]
    pub icon: Option<Icon>,
}

fn serialize_icon<S: Serializer>(icon: &Option<Icon>, serializer: S) -> Result<S::Ok, S::Error> {
    match icon {
        Some(icon) => serializer.serialize_str(&icon.to_base64()),
        None => serializer.serialize_none(),
    }
}

impl ApplicationRecord {
    /// Returns the UWP launch identifier when this record is a packaged app.
    pub fn uwp_id(&self) -> Option<&str> {
        self.executable_path.strip_prefix(UWP_PREFIX)
    }

    pub fn is_launchable(&self) -> bool {
        !self.executable_path.is_empty()
    }
}

/// How a candidate is expected to be launched once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CandidateLaunch {
    /// Run the path resolver over the hint fields.
    #[default]
    Resolve,
    /// Packaged app launched by identifier; no file path exists.
    Uwp(String),
}

/// Raw, unvalidated entry produced by a single scanner.
///
/// Every field a source cannot supply is left as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    pub name: String,
    pub icon_hint: String,
    pub install_location: String,
    pub uninstall_command: String,
    pub version: String,
    pub vendor: String,
    pub install_date: String,
    pub launch: CandidateLaunch,
}

impl CandidateRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builds the final record around an already resolved path.
    pub fn into_record(self, executable_path: String) -> ApplicationRecord {
        ApplicationRecord {
            name: self.name.trim().to_string(),
            executable_path: executable_path.trim().to_string(),
            version: self.version.trim().to_string(),
            vendor: self.vendor.trim().to_string(),
            install_date: self.install_date.trim().to_string(),
            install_location: self.install_location.trim().to_string(),
            icon: None,
        }
    }
}

/// Small owned bitmap, stored PNG encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl Icon {
    /// Encodes tightly packed RGBA pixels. Returns `None` when the buffer does not match the size.
    pub fn from_rgba(width: u32, height: u32, pixels: &[u8]) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }

        let mut png = Vec::new();
        PngEncoder::new(Cursor::new(&mut png))
            .write_image(pixels, width, height, ColorType::Rgba8)
            .ok()?;

        Some(Self { width, height, png })
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.png)
    }
}

/// One entry of the user's "my applications" list.
///
/// The untagged representation keeps the on-disk shapes readable:
/// a bare path string, a `{"uwp": ...}` object or a discovered record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppEntry {
    LocalExecutable(String),
    UwpApp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uwp_name: Option<String>,
        uwp: String,
    },
    Discovered(ApplicationRecord),
}

impl AppEntry {
    /// Name used to cross-reference against inventory records.
    pub fn display_name(&self) -> &str {
        match self {
            Self::LocalExecutable(path) => path,
            Self::UwpApp { uwp_name, uwp } => uwp_name.as_deref().unwrap_or(uwp),
            Self::Discovered(record) => &record.name,
        }
    }

    /// Builds the entry that should be stored when the user picks an inventory record.
    pub fn from_record(record: &ApplicationRecord) -> Self {
        match record.uwp_id() {
            Some(id) => Self::UwpApp {
                uwp_name: Some(record.name.clone()),
                uwp: id.to_string(),
            },
            None => {
                let mut stored = record.clone();
                stored.icon = None;
                Self::Discovered(stored)
            }
        }
    }
}
