use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
};

use log::{debug, error, info};

use crate::{
    config::AppConfig,
    dedup::deduplicate,
    icon::{self, IconExtractor, NoIconExtractor},
    models::ApplicationRecord,
    resolver::PathResolver,
    scanner::{NoiseFilter, SourceScanner, UwpCatalogScanner},
};

/// Runs every registered scanner and turns their candidates into the final inventory.
///
/// Holds no state between calls, so every [`InventoryService::collect`] rescans.
pub struct InventoryService {
    scanners: Vec<Box<dyn SourceScanner>>,
    resolver: PathResolver,
    icons: Arc<dyn IconExtractor>,
    parallel: bool,
}

impl Default for InventoryService {
    fn default() -> Self {
        Self::new(PathResolver::default(), Arc::new(NoIconExtractor))
    }
}

impl InventoryService {
    pub fn new(resolver: PathResolver, icons: Arc<dyn IconExtractor>) -> Self {
        Self {
            scanners: Vec::new(),
            resolver,
            icons,
            parallel: true,
        }
    }

    pub fn with_scanner(mut self, scanner: impl SourceScanner + 'static) -> Self {
        self.scanners.push(Box::new(scanner));
        self
    }

    /// Runs scanners on scoped threads when `true`, on the caller's thread otherwise.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Wires the sources available on this machine according to `config`.
    pub fn for_current_system(config: &AppConfig) -> Self {
        let filter = NoiseFilter::new(&config.extra_noise_patterns);
        #[cfg_attr(not(windows), allow(unused_mut))]
        let mut service = Self::new(
            PathResolver::from_config(config),
            icon::platform_extractor(config.extract_icons),
        )
        .parallel(config.parallel_scan);

        #[cfg(windows)]
        {
            use crate::scanner::{
                default_locations, registry::WindowsRegistry, start_menu::ShellLinkResolver,
                RegistryScanner, StartMenuScanner,
            };

            if config.scan_registry {
                let registry: Arc<dyn crate::scanner::UninstallRegistry> =
                    Arc::new(WindowsRegistry);
                for location in default_locations() {
                    service = service.with_scanner(RegistryScanner::new(
                        location,
                        Arc::clone(&registry),
                        filter.clone(),
                    ));
                }
            }
            if config.scan_start_menu {
                service = service.with_scanner(StartMenuScanner::for_current_user(
                    Arc::new(ShellLinkResolver),
                    filter.clone(),
                ));
            }
        }

        #[cfg(not(windows))]
        debug!("registry and Start Menu sources are only available on Windows");

        service.with_scanner(UwpCatalogScanner::new(config.uwp_apps.clone(), filter))
    }

    pub fn scanner_count(&self) -> usize {
        self.scanners.len()
    }

    /// Scans, resolves, deduplicates and sorts. Never fails; a broken source contributes nothing.
    pub fn collect(&self) -> Vec<ApplicationRecord> {
        let batches: Vec<Vec<ApplicationRecord>> = if self.parallel && self.scanners.len() > 1 {
            thread::scope(|scope| {
                let handles: Vec<_> = self
                    .scanners
                    .iter()
                    .map(|scanner| scope.spawn(move || self.run_scanner(scanner.as_ref())))
                    .collect();

                // Joined in registration order so first-seen order does not depend on timing.
                handles
                    .into_iter()
                    .zip(&self.scanners)
                    .map(|(handle, scanner)| {
                        handle.join().unwrap_or_else(|_| {
                            error!("{} scanner panicked", scanner.source_name());
                            Vec::new()
                        })
                    })
                    .collect()
            })
        } else {
            self.scanners
                .iter()
                .map(|scanner| {
                    panic::catch_unwind(AssertUnwindSafe(|| self.run_scanner(scanner.as_ref())))
                        .unwrap_or_else(|_| {
                            error!("{} scanner panicked", scanner.source_name());
                            Vec::new()
                        })
                })
                .collect()
        };

        let discovered: usize = batches.iter().map(Vec::len).sum();
        let mut inventory = deduplicate(batches.into_iter().flatten());
        sort_inventory(&mut inventory);
        info!(
            "inventory: {} applications ({} before dedup)",
            inventory.len(),
            discovered
        );
        inventory
    }

    fn run_scanner(&self, scanner: &dyn SourceScanner) -> Vec<ApplicationRecord> {
        let report = scanner.collect_candidates();
        let records: Vec<ApplicationRecord> = report
            .candidates
            .into_iter()
            .map(|candidate| {
                let executable_path = self.resolver.resolve(&candidate);
                let mut record = candidate.into_record(executable_path);
                if icon::wants_icon(&record.executable_path) {
                    record.icon = self.icons.extract(&record.executable_path);
                }
                record
            })
            .collect();

        debug!(
            "{}: {} resolved, {} with executables",
            scanner.source_name(),
            records.len(),
            records.iter().filter(|r| r.is_launchable()).count()
        );
        records
    }
}

/// Stable, case-insensitive ordering by name.
pub fn sort_inventory(records: &mut [ApplicationRecord]) {
    records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}
