use std::{collections::HashSet, fs, path::Path, sync::Arc};

use softgenie_lib::{
    icon::NoIconExtractor,
    models::ApplicationRecord,
    resolver::PathResolver,
    scanner::{
        MemoryRegistry, NoiseFilter, RegistryHive, RegistryLocation, RegistryScanner,
        RegistryView, UninstallEntry, UwpCatalogScanner,
    },
    AppConfig, InventoryService,
};

fn hklm64() -> RegistryLocation {
    RegistryLocation::new(
        RegistryHive::LocalMachine,
        r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
        RegistryView::Force64,
    )
}

fn hklm32() -> RegistryLocation {
    RegistryLocation::new(
        RegistryHive::LocalMachine,
        r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
        RegistryView::Force64,
    )
}

fn hkcu() -> RegistryLocation {
    RegistryLocation::new(
        RegistryHive::CurrentUser,
        r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
        RegistryView::Default,
    )
}

fn app(name: &str) -> UninstallEntry {
    UninstallEntry::default().with("DisplayName", name)
}

fn touch(path: &Path) -> String {
    fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    fs::write(path, b"MZ").expect("write exe");
    path.to_string_lossy().into_owned()
}

fn service(registry: MemoryRegistry, locations: &[RegistryLocation]) -> InventoryService {
    let registry = Arc::new(registry);
    let mut service = InventoryService::new(PathResolver::default(), Arc::new(NoIconExtractor));
    for location in locations {
        service = service.with_scanner(RegistryScanner::new(
            location.clone(),
            registry.clone(),
            NoiseFilter::default(),
        ));
    }
    service
}

fn triples(records: &[ApplicationRecord]) -> HashSet<(String, String, String)> {
    records
        .iter()
        .map(|r| (r.name.clone(), r.version.clone(), r.executable_path.clone()))
        .collect()
}

#[test]
fn same_app_in_both_views_keeps_the_resolvable_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exe = touch(&dir.path().join("Widget").join("w.exe"));

    let registry = MemoryRegistry::new()
        .with_entry(&hklm64(), "widget", app("Widget").with("DisplayVersion", "1.0"))
        .with_entry(
            &hklm32(),
            "widget",
            app("Widget")
                .with("DisplayVersion", "1.0")
                .with("DisplayIcon", format!("{exe},0")),
        );

    let inventory = service(registry, &[hklm64(), hklm32()]).collect();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].name, "Widget");
    assert_eq!(inventory[0].version, "1.0");
    assert_eq!(inventory[0].executable_path, exe);
}

#[test]
fn update_entries_never_reach_the_inventory() {
    let registry = MemoryRegistry::new()
        .with_entry(&hklm64(), "kb", app("KB5001234 Update"))
        .with_entry(&hklm64(), "sec", app("Security Update for Windows"))
        .with_entry(&hklm64(), "sp", app("Office Service Pack 2"))
        .with_entry(&hklm64(), "upd", app("Update for Microsoft Visual C++"))
        .with_entry(&hklm64(), "hf", app("Hotfix 3"))
        .with_entry(&hklm64(), "real", app("Paint.NET"));

    let inventory = service(registry, &[hklm64()]).collect();
    let names: Vec<_> = inventory.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Paint.NET"]);
}

#[test]
fn inventory_is_sorted_without_regard_to_case() {
    let registry = MemoryRegistry::new()
        .with_entry(&hkcu(), "z", app("Zeta"))
        .with_entry(&hkcu(), "a", app("alpha"))
        .with_entry(&hkcu(), "b", app("Beta"));

    let inventory = service(registry, &[hkcu()]).collect();
    let names: Vec<_> = inventory.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["alpha", "Beta", "Zeta"]);
    assert!(inventory
        .windows(2)
        .all(|pair| pair[0].name.to_lowercase() <= pair[1].name.to_lowercase()));
}

#[test]
fn icon_hint_beats_install_location() {
    let dir = tempfile::tempdir().expect("tempdir");
    let hinted = touch(&dir.path().join("hint").join("tool.exe"));
    touch(&dir.path().join("install").join("another.exe"));

    let registry = MemoryRegistry::new().with_entry(
        &hklm64(),
        "tool",
        app("Tool")
            .with("DisplayIcon", format!("\"{hinted}\""))
            .with(
                "InstallLocation",
                dir.path().join("install").to_string_lossy(),
            ),
    );

    let inventory = service(registry, &[hklm64()]).collect();
    assert_eq!(inventory[0].executable_path, hinted);
}

#[test]
fn unresolvable_apps_are_kept_with_empty_path() {
    let registry = MemoryRegistry::new().with_entry(
        &hklm64(),
        "bare",
        app("Bare Metal").with("Publisher", "Acme"),
    );

    let inventory = service(registry, &[hklm64()]).collect();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].executable_path, "");
    assert_eq!(inventory[0].vendor, "Acme");
}

#[test]
fn missing_sources_and_broken_entries_do_not_abort() {
    let registry = MemoryRegistry::new()
        .with_unreadable(&hklm64(), "locked")
        .with_entry(&hklm64(), "nameless", UninstallEntry::default())
        .with_entry(&hklm64(), "ok", app("Survivor"));

    // hkcu has no fixture and behaves like a missing key.
    let inventory = service(registry, &[hkcu(), hklm64()]).collect();
    let names: Vec<_> = inventory.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Survivor"]);
}

#[test]
fn repeated_calls_yield_the_same_set() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exe = touch(&dir.path().join("Editor").join("editor.exe"));
    let registry = MemoryRegistry::new()
        .with_entry(
            &hklm64(),
            "editor",
            app("Editor")
                .with("DisplayVersion", "3.2")
                .with("InstallLocation", dir.path().join("Editor").to_string_lossy()),
        )
        .with_entry(&hklm32(), "viewer", app("Viewer"))
        .with_entry(&hkcu(), "editor", app("editor").with("DisplayVersion", "3.2"));

    let service = service(registry, &[hklm64(), hklm32(), hkcu()]);
    let first = service.collect();
    let second = service.collect();
    assert_eq!(triples(&first), triples(&second));
    assert!(triples(&first).contains(&("Editor".to_string(), "3.2".to_string(), exe)));
    assert_eq!(first.len(), 2);
}

#[test]
fn uwp_catalog_is_injected_and_merged() {
    let catalog = [(
        "paint".to_string(),
        "Microsoft.Paint_8wekyb3d8bbwe!App".to_string(),
    )]
    .into_iter()
    .collect();
    let registry = MemoryRegistry::new().with_entry(&hklm64(), "notepad", app("Notepad++"));

    let inventory = service(registry, &[hklm64()])
        .with_scanner(UwpCatalogScanner::new(catalog, NoiseFilter::default()))
        .collect();
    let names: Vec<_> = inventory.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Notepad++", "paint"]);
    assert_eq!(inventory[1].executable_path, "UWP:Microsoft.Paint_8wekyb3d8bbwe!App");
}

#[test]
fn configured_noise_patterns_extend_the_defaults() {
    let config = AppConfig {
        extra_noise_patterns: vec!["runtime".into()],
        ..AppConfig::default()
    };
    let registry = MemoryRegistry::new()
        .with_entry(&hklm64(), "rt", app("Java Runtime"))
        .with_entry(&hklm64(), "kb", app("KB Helper"))
        .with_entry(&hklm64(), "gimp", app("GIMP"));

    let inventory = InventoryService::new(PathResolver::from_config(&config), Arc::new(NoIconExtractor))
        .with_scanner(RegistryScanner::new(
            hklm64(),
            Arc::new(registry),
            NoiseFilter::new(&config.extra_noise_patterns),
        ))
        .collect();
    let names: Vec<_> = inventory.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["GIMP"]);
}

#[test]
fn empty_config_patterns_keep_update_entries_out() {
    let config: AppConfig =
        serde_json::from_str(r#"{"extra_noise_patterns": []}"#).expect("parse config");
    let registry = MemoryRegistry::new()
        .with_entry(&hklm64(), "kb", app("KB5001234 Update"))
        .with_entry(&hklm64(), "sec", app("Security Update for Windows"));

    let inventory = InventoryService::new(PathResolver::from_config(&config), Arc::new(NoIconExtractor))
        .with_scanner(RegistryScanner::new(
            hklm64(),
            Arc::new(registry),
            NoiseFilter::new(&config.extra_noise_patterns),
        ))
        .collect();
    assert!(inventory.is_empty());
}
