use std::collections::HashMap;

use crate::models::ApplicationRecord;

/// Case-insensitive `(name, version)` pair identifying one application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    name: String,
    version: String,
}

impl IdentityKey {
    pub fn of(record: &ApplicationRecord) -> Self {
        Self {
            name: record.name.to_lowercase(),
            version: record.version.to_lowercase(),
        }
    }
}

/// Collapses records sharing an identity key.
///
/// The first record seen for a key stays unless it has no executable path and a later
/// one does. Output keeps first-seen order.
pub fn deduplicate<I>(records: I) -> Vec<ApplicationRecord>
where
    I: IntoIterator<Item = ApplicationRecord>,
{
    let mut unique: Vec<ApplicationRecord> = Vec::new();
    let mut index: HashMap<IdentityKey, usize> = HashMap::new();

    for record in records {
        let key = IdentityKey::of(&record);
        match index.get(&key) {
            Some(&slot) => {
                if unique[slot].executable_path.is_empty() && !record.executable_path.is_empty() {
                    unique[slot] = record;
                }
            }
            None => {
                index.insert(key, unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, version: &str, path: &str) -> ApplicationRecord {
        ApplicationRecord {
            name: name.into(),
            version: version.into(),
            executable_path: path.into(),
            ..ApplicationRecord::default()
        }
    }

    #[test]
    fn later_record_with_path_replaces_pathless_one() {
        let merged = deduplicate([
            record("Widget", "1.0", ""),
            record("Widget", "1.0", r"C:\Widget\w.exe"),
        ]);
        assert_eq!(merged, vec![record("Widget", "1.0", r"C:\Widget\w.exe")]);
    }

    #[test]
    fn existing_record_with_path_is_kept() {
        let merged = deduplicate([
            record("Widget", "1.0", r"C:\x64\w.exe"),
            record("WIDGET", "1.0", r"C:\x86\w.exe"),
            record("widget", "1.0", ""),
        ]);
        assert_eq!(merged, vec![record("Widget", "1.0", r"C:\x64\w.exe")]);
    }

    #[test]
    fn other_completeness_does_not_matter() {
        let first = record("Widget", "1.0", "");
        let richer = ApplicationRecord {
            vendor: "Acme".into(),
            install_date: "20240101".into(),
            ..record("Widget", "1.0", "")
        };
        assert_eq!(deduplicate([first.clone(), richer]), vec![first]);
    }

    #[test]
    fn versions_distinguish_records_and_order_is_first_seen() {
        let merged = deduplicate([
            record("Widget", "2.0", ""),
            record("Gadget", "", ""),
            record("Widget", "1.0", ""),
            record("gadget", "", r"C:\g.exe"),
        ]);
        let keys: Vec<_> = merged
            .iter()
            .map(|r| (r.name.as_str(), r.version.as_str(), r.executable_path.as_str()))
            .collect();
        assert_eq!(
            keys,
            [
                ("Widget", "2.0", ""),
                ("gadget", "", r"C:\g.exe"),
                ("Widget", "1.0", ""),
            ]
        );
    }

    #[test]
    fn version_comparison_ignores_case() {
        assert_eq!(
            deduplicate([record("App", "1.0-BETA", ""), record("app", "1.0-beta", "")]).len(),
            1
        );
    }
}
