use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use walkdir::{DirEntry, WalkDir};

use crate::{
    error::ScanError,
    models::CandidateRecord,
    scanner::{accept_name, CandidateIter, NoiseFilter, SourceScanner},
};

const PROGRAMS_DIR: &str = "Microsoft\\Windows\\Start Menu\\Programs";
const STARTUP_DIR: &str = "Microsoft\\Windows\\Start Menu\\Programs\\Startup";

/// Fields read from a `.lnk` file. Empty strings mean the link did not carry the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutInfo {
    pub target_path: String,
    pub working_directory: String,
    pub icon_path: String,
}

pub trait ShortcutResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> Option<ShortcutInfo>;
}

/// Resolves shortcuts through the shell's `IShellLinkW`.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLinkResolver;

#[cfg(windows)]
impl ShortcutResolver for ShellLinkResolver {
    fn resolve(&self, path: &Path) -> Option<ShortcutInfo> {
        crate::windows_utils::resolve_shell_link(path)
    }
}

/// Turns Start Menu shortcuts into candidates.
pub struct StartMenuScanner {
    roots: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    resolver: Arc<dyn ShortcutResolver>,
    filter: NoiseFilter,
}

impl StartMenuScanner {
    pub fn new(
        roots: Vec<PathBuf>,
        excluded: Vec<PathBuf>,
        resolver: Arc<dyn ShortcutResolver>,
        filter: NoiseFilter,
    ) -> Self {
        Self {
            roots,
            excluded,
            resolver,
            filter,
        }
    }

    /// Scans the per-user and all-users Programs folders, leaving out Startup.
    pub fn for_current_user(resolver: Arc<dyn ShortcutResolver>, filter: NoiseFilter) -> Self {
        let bases: Vec<PathBuf> = ["APPDATA", "PROGRAMDATA"]
            .into_iter()
            .filter_map(env::var_os)
            .map(PathBuf::from)
            .collect();
        let roots = bases.iter().map(|base| base.join(PROGRAMS_DIR)).collect();
        let excluded = bases.iter().map(|base| base.join(STARTUP_DIR)).collect();
        Self::new(roots, excluded, resolver, filter)
    }

    /// Every `.lnk` under the roots, in name order, skipping excluded subtrees.
    fn shortcut_files(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .filter(|root| root.is_dir())
            .flat_map(|root| {
                WalkDir::new(root)
                    .min_depth(1)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|entry| !self.is_excluded(entry.path()))
                    .filter_map(Result::ok)
                    .filter(|entry| entry.file_type().is_file() && is_shortcut(entry.path()))
                    .map(DirEntry::into_path)
            })
            .collect()
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|skip| path.starts_with(skip))
    }

    fn to_candidate(
        &self,
        path: &Path,
        source_name: &str,
    ) -> Option<Result<CandidateRecord, ScanError>> {
        let entry = path.to_string_lossy();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match accept_name(&self.filter, &stem, source_name, &entry)? {
            Ok(name) => name,
            Err(err) => return Some(Err(err)),
        };

        let Some(shortcut) = self.resolver.resolve(path) else {
            return Some(Err(ScanError::malformed(
                source_name,
                entry,
                "shortcut could not be resolved",
            )));
        };

        if looks_like_uninstaller(&name) || looks_like_uninstaller(&shortcut.target_path) {
            return None;
        }

        // Advertised (MSI) shortcuts carry no target, only an icon location.
        let icon_hint = if shortcut.target_path.trim().is_empty() {
            shortcut.icon_path.trim()
        } else {
            shortcut.target_path.trim()
        };

        Some(Ok(CandidateRecord {
            name,
            icon_hint: icon_hint.to_string(),
            install_location: shortcut.working_directory.trim().to_string(),
            ..CandidateRecord::default()
        }))
    }
}

impl SourceScanner for StartMenuScanner {
    fn source_name(&self) -> String {
        "start menu".to_string()
    }

    fn scan(&self) -> Result<CandidateIter<'_>, ScanError> {
        if !self.roots.iter().any(|root| root.is_dir()) {
            return Err(ScanError::unavailable(
                self.source_name(),
                "no Start Menu folder found",
            ));
        }

        let source_name = self.source_name();
        let shortcuts = self.shortcut_files();
        Ok(Box::new(
            shortcuts
                .into_iter()
                .filter_map(move |path| self.to_candidate(&path, &source_name)),
        ))
    }
}

fn is_shortcut(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("lnk"))
        .unwrap_or(false)
}

fn looks_like_uninstaller(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.contains("unins") || lower.contains("uninstall")
}
