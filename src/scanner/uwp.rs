use std::collections::BTreeMap;

use crate::{
    error::ScanError,
    models::{CandidateLaunch, CandidateRecord},
    scanner::{accept_name, CandidateIter, NoiseFilter, SourceScanner},
};

/// Emits the configured packaged apps; UWP apps have no file path to discover.
pub struct UwpCatalogScanner {
    catalog: BTreeMap<String, String>,
    filter: NoiseFilter,
}

impl UwpCatalogScanner {
    pub fn new(catalog: BTreeMap<String, String>, filter: NoiseFilter) -> Self {
        Self { catalog, filter }
    }
}

impl SourceScanner for UwpCatalogScanner {
    fn source_name(&self) -> String {
        "uwp catalog".to_string()
    }

    fn scan(&self) -> Result<CandidateIter<'_>, ScanError> {
        let source_name = self.source_name();
        Ok(Box::new(self.catalog.iter().filter_map(
            move |(name, launch_id)| {
                let name = match accept_name(&self.filter, name, &source_name, name)? {
                    Ok(name) => name,
                    Err(err) => return Some(Err(err)),
                };
                let launch_id = launch_id.trim();
                if launch_id.is_empty() {
                    return Some(Err(ScanError::malformed(
                        source_name.as_str(),
                        name,
                        "empty launch identifier",
                    )));
                }

                Some(Ok(CandidateRecord {
                    launch: CandidateLaunch::Uwp(launch_id.to_string()),
                    ..CandidateRecord::named(name)
                }))
            },
        )))
    }
}
