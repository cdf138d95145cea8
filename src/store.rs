//! The user's "my applications" and "my websites" lists, each a JSON array on disk.

use std::{
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{StoreError, StoreResult},
    models::{AppEntry, ApplicationRecord},
};

#[derive(Debug, Clone)]
pub struct ListStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> ListStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the list; a missing file is an empty list.
    pub fn load(&self) -> StoreResult<Vec<T>> {
        if !self.path.exists() {
            debug!("{:?} not found, starting empty", self.path);
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, items: &[T]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string(items).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

pub type ApplicationStore = ListStore<AppEntry>;
pub type WebsiteStore = ListStore<String>;

pub fn is_added(entries: &[AppEntry], name: &str) -> bool {
    entries.iter().any(|entry| entry.display_name() == name)
}

/// Adds an inventory record unless an entry with the same name exists.
pub fn add_record(entries: &mut Vec<AppEntry>, record: &ApplicationRecord) -> bool {
    if is_added(entries, &record.name) {
        return false;
    }
    entries.push(AppEntry::from_record(record));
    true
}

/// Removes the first entry with this display name.
pub fn remove_by_name(entries: &mut Vec<AppEntry>, name: &str) -> bool {
    match entries.iter().position(|entry| entry.display_name() == name) {
        Some(index) => {
            entries.remove(index);
            true
        }
        None => false,
    }
}

/// Pairs every inventory record with whether the user already added it.
pub fn mark_added<'a>(
    inventory: &'a [ApplicationRecord],
    entries: &[AppEntry],
) -> Vec<(&'a ApplicationRecord, bool)> {
    inventory
        .iter()
        .map(|record| (record, is_added(entries, &record.name)))
        .collect()
}

pub fn add_website(websites: &mut Vec<String>, url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() || websites.iter().any(|existing| existing == url) {
        return false;
    }
    websites.push(url.to_string());
    true
}

pub fn remove_website(websites: &mut Vec<String>, url: &str) -> bool {
    let url = url.trim();
    let before = websites.len();
    websites.retain(|existing| existing != url);
    websites.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> ApplicationRecord {
        ApplicationRecord {
            name: "Widget".into(),
            version: "1.0".into(),
            executable_path: r"C:\Widget\w.exe".into(),
            ..ApplicationRecord::default()
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ApplicationStore::new(dir.path().join("applications.json"));
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn entries_survive_a_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ApplicationStore::new(dir.path().join("data").join("applications.json"));
        let entries = vec![
            AppEntry::LocalExecutable(r"C:\Tools\editor.exe".into()),
            AppEntry::UwpApp {
                uwp_name: Some("calculator".into()),
                uwp: "Microsoft.WindowsCalculator_8wekyb3d8bbwe!App".into(),
            },
            AppEntry::from_record(&widget()),
        ];
        store.save(&entries).expect("save");

        let raw = fs::read_to_string(store.path()).expect("read back");
        assert!(raw.contains(r#""exe_path":"C:\\Widget\\w.exe""#));
        assert_eq!(store.load().expect("load"), entries);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("websites.json");
        fs::write(&path, "[\"https://example.com\"").expect("write");
        assert!(matches!(
            WebsiteStore::new(path).load(),
            Err(StoreError::Json { .. })
        ));
    }

    #[test]
    fn records_are_added_once_and_removed_by_name() {
        let mut entries = Vec::new();
        assert!(add_record(&mut entries, &widget()));
        assert!(!add_record(&mut entries, &widget()));
        assert!(is_added(&entries, "Widget"));

        let gadget = ApplicationRecord {
            name: "Gadget".into(),
            ..ApplicationRecord::default()
        };
        let inventory = vec![widget(), gadget];
        let marks: Vec<_> = mark_added(&inventory, &entries)
            .into_iter()
            .map(|(record, added)| (record.name.as_str(), added))
            .collect();
        assert_eq!(marks, [("Widget", true), ("Gadget", false)]);

        assert!(remove_by_name(&mut entries, "Widget"));
        assert!(!remove_by_name(&mut entries, "Widget"));
        assert!(entries.is_empty());
    }

    #[test]
    fn websites_are_trimmed_and_unique() {
        let mut websites = Vec::new();
        assert!(add_website(&mut websites, " https://example.com "));
        assert!(!add_website(&mut websites, "https://example.com"));
        assert!(!add_website(&mut websites, "   "));
        assert_eq!(websites, ["https://example.com"]);
        assert!(remove_website(&mut websites, "https://example.com"));
        assert!(!remove_website(&mut websites, "https://example.com"));
    }
}
