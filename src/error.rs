use std::path::PathBuf;

use thiserror::Error;

/// Failures a scanner can hit. None of them escape the inventory call.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("source {source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },
    #[error("skipped entry {entry} in {source_name}: {reason}")]
    EntryMalformed {
        source_name: String,
        entry: String,
        reason: String,
    },
}

impl ScanError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(
        source_name: impl Into<String>,
        entry: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::EntryMalformed {
            source_name: source_name.into(),
            entry: entry.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors from reading or writing the JSON files under the data directory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;
