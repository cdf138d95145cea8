use std::{path::Path, sync::Arc};

use crate::models::{Icon, UWP_PREFIX};

/// Best-effort icon lookup. Every failure is `None`; callers render a placeholder.
pub trait IconExtractor: Send + Sync {
    fn extract(&self, executable_path: &str) -> Option<Icon>;
}

/// Extractor used when icons are disabled or the platform has no shell icons.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIconExtractor;

impl IconExtractor for NoIconExtractor {
    fn extract(&self, _executable_path: &str) -> Option<Icon> {
        None
    }
}

/// Pulls the small shell icon embedded in an executable.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellIconExtractor;

#[cfg(windows)]
impl IconExtractor for ShellIconExtractor {
    fn extract(&self, executable_path: &str) -> Option<Icon> {
        let (width, height, rgba) = crate::windows_utils::extract_small_icon_rgba(executable_path)?;
        Icon::from_rgba(width, height, &rgba)
    }
}

/// Whether a resolved path is worth handing to an extractor.
pub fn wants_icon(executable_path: &str) -> bool {
    !executable_path.is_empty()
        && !executable_path.starts_with(UWP_PREFIX)
        && Path::new(executable_path).is_file()
}

/// The extractor matching the current platform.
pub fn platform_extractor(enabled: bool) -> Arc<dyn IconExtractor> {
    #[cfg(windows)]
    {
        if enabled {
            return Arc::new(ShellIconExtractor);
        }
    }

    #[cfg(not(windows))]
    let _ = enabled;

    Arc::new(NoIconExtractor)
}
