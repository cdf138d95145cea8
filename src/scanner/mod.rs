//! Enumeration sources that feed the inventory.
//!
//! Every scanner yields raw [`CandidateRecord`]s lazily. Failures are reported
//! as [`ScanError`] values and absorbed by [`SourceScanner::collect_candidates`],
//! so one broken source never hides the others.

pub mod registry;
pub mod start_menu;
pub mod uwp;

use log::{debug, trace, warn};

use crate::{config::DEFAULT_NOISE_PATTERNS, error::ScanError, models::CandidateRecord};

pub use registry::{
    default_locations, MemoryRegistry, RegistryHive, RegistryLocation, RegistryScanner,
    RegistryView, UninstallEntry, UninstallKey, UninstallRegistry,
};
pub use start_menu::{ShortcutInfo, ShortcutResolver, StartMenuScanner};
pub use uwp::UwpCatalogScanner;

pub type CandidateIter<'a> = Box<dyn Iterator<Item = Result<CandidateRecord, ScanError>> + 'a>;

pub trait SourceScanner: Send + Sync {
    /// Human-readable description used in logs and errors.
    fn source_name(&self) -> String;

    /// Opens the source. An `Err` means the whole source is unavailable.
    fn scan(&self) -> Result<CandidateIter<'_>, ScanError>;

    /// Drains the source, keeping good candidates and recording skipped entries.
    fn collect_candidates(&self) -> ScanReport {
        let mut report = ScanReport::default();
        let entries = match self.scan() {
            Ok(entries) => entries,
            Err(err) => {
                debug!("{err}");
                return report;
            }
        };

        for entry in entries {
            match entry {
                Ok(candidate) => report.candidates.push(candidate),
                Err(err) => {
                    trace!("{err}");
                    report.skipped.push(err);
                }
            }
        }

        if !report.skipped.is_empty() {
            warn!(
                "{}: skipped {} unreadable entries",
                self.source_name(),
                report.skipped.len()
            );
        }
        debug!(
            "{}: {} candidates",
            self.source_name(),
            report.candidates.len()
        );
        report
    }
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub candidates: Vec<CandidateRecord>,
    pub skipped: Vec<ScanError>,
}

/// Drops update and patch entries that pollute uninstall listings.
///
/// The built-in denylist always applies; callers can only add to it.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    patterns: Vec<String>,
}

impl NoiseFilter {
    pub fn new<I, S>(extra_patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<String> = DEFAULT_NOISE_PATTERNS.clone();
        for pattern in extra_patterns {
            let pattern = pattern.as_ref().trim().to_lowercase();
            if !pattern.is_empty() && !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }
        Self { patterns }
    }

    pub fn is_noise(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.patterns.iter().any(|pattern| lower.contains(pattern))
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

/// Shared naming policy: returns the trimmed name, or `None` when the entry must be dropped.
///
/// A missing name is a malformed entry; a noisy name is skipped without an error.
pub(crate) fn accept_name(
    filter: &NoiseFilter,
    raw_name: &str,
    source_name: &str,
    entry: &str,
) -> Option<Result<String, ScanError>> {
    let name = raw_name.trim();
    if name.is_empty() {
        return Some(Err(ScanError::malformed(
            source_name,
            entry,
            "missing display name",
        )));
    }
    if filter.is_noise(name) {
        trace!("{source_name}: ignoring update entry {name}");
        return None;
    }
    Some(Ok(name.to_string()))
}
