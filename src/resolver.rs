use std::{cmp::Ordering, path::Path};

use log::trace;
use walkdir::{DirEntry, WalkDir};

use crate::{
    config::AppConfig,
    models::{CandidateLaunch, CandidateRecord, UWP_PREFIX},
};

/// Picks the launchable target of a candidate.
///
/// Strategies run in a fixed order and the first hit wins:
/// the icon hint, then a walk of the install location, then the uninstall command.
/// When none applies the path is empty, which is a valid outcome.
#[derive(Debug, Clone)]
pub struct PathResolver {
    extension: String,
    depth_limit: Option<usize>,
    entry_limit: usize,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PathResolver {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            extension: config
                .executable_extension
                .trim()
                .trim_start_matches('.')
                .to_string(),
            depth_limit: config.walk_depth_limit,
            entry_limit: config.walk_entry_limit.max(1),
        }
    }

    pub fn resolve(&self, candidate: &CandidateRecord) -> String {
        if let CandidateLaunch::Uwp(launch_id) = &candidate.launch {
            return format!("{UWP_PREFIX}{launch_id}");
        }

        let resolved = self
            .from_icon_hint(&candidate.icon_hint)
            .or_else(|| self.from_install_location(&candidate.install_location))
            .or_else(|| self.from_uninstall_command(&candidate.uninstall_command));
        if resolved.is_none() {
            trace!("no executable found for {}", candidate.name);
        }
        resolved.unwrap_or_default()
    }

    fn from_icon_hint(&self, raw: &str) -> Option<String> {
        let path = strip_icon_index(raw).trim().trim_matches('"').trim();
        self.accept_executable(path)
    }

    fn from_install_location(&self, raw: &str) -> Option<String> {
        let folder = raw.trim().trim_matches('"').trim();
        if folder.is_empty() {
            return None;
        }
        let expanded = expand_env_vars(folder);
        let normalized = expanded.trim_end_matches(['/', '\\']);
        if normalized.is_empty() {
            return None;
        }
        let root = Path::new(normalized);
        if !root.is_dir() {
            return None;
        }

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by(files_before_directories);
        if let Some(depth) = self.depth_limit {
            walker = walker.max_depth(depth);
        }

        // Unreadable directories surface as `Err` items and are skipped.
        walker
            .into_iter()
            .filter_map(Result::ok)
            .take(self.entry_limit)
            .find(|entry| entry.file_type().is_file() && self.has_extension(entry.path()))
            .map(|entry| entry.path().to_string_lossy().into_owned())
    }

    fn from_uninstall_command(&self, raw: &str) -> Option<String> {
        let token = raw.split_whitespace().next()?;
        self.accept_executable(token.trim_matches('"'))
    }

    fn accept_executable(&self, raw: &str) -> Option<String> {
        if raw.is_empty() {
            return None;
        }
        let expanded = expand_env_vars(raw);
        let path = Path::new(&expanded);
        if self.has_extension(path) && path.is_file() {
            Some(expanded)
        } else {
            None
        }
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }
}

/// Drops a trailing `,<index>` icon selector such as `app.exe,0` or `"app.exe",-101`.
///
/// A bare trailing comma counts as an empty selector.
fn strip_icon_index(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.rsplit_once(',') {
        Some((path, index)) if index.trim().is_empty() || index.trim().parse::<i32>().is_ok() => {
            path
        }
        _ => trimmed,
    }
}

fn files_before_directories(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Expands `%NAME%` references, leaving unknown variables untouched.
pub(crate) fn expand_env_vars(value: &str) -> String {
    #[cfg(windows)]
    {
        crate::windows_utils::expand_env_vars(value).unwrap_or_else(|| value.to_string())
    }

    #[cfg(not(windows))]
    {
        expand_percent_vars(value, |name| std::env::var(name).ok())
    }
}

#[cfg_attr(windows, allow(dead_code))]
fn expand_percent_vars(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut output = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('%') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('%') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let name = &after[..end];
        match lookup(name).filter(|_| !name.is_empty()) {
            Some(expanded) => {
                output.push_str(&expanded);
                rest = &after[end + 1..];
            }
            None => {
                // Keep the opening `%` literal and retry from the closing one.
                output.push('%');
                output.push_str(name);
                rest = &after[end..];
            }
        }
    }

    output.push_str(rest);
    output
}
