use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
use log::{info, LevelFilter};

use softgenie_lib::{
    config::{self, AppConfig},
    store::{self, ApplicationStore, WebsiteStore},
    AppEntry, ApplicationRecord, InventoryService,
};

#[derive(Parser)]
#[command(name = "softgenie", about = "Installed applications and personal launch lists")]
struct Cli {
    /// Directory holding config.json, applications.json and websites.json.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List installed applications, marking the ones already in "my applications".
    Apps {
        #[arg(long)]
        json: bool,
    },
    /// Add installed applications to "my applications" by name.
    Add {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Add an executable that is not in the inventory.
    AddPath { path: PathBuf },
    /// Add a UWP app from the configured catalog.
    AddUwp { name: String },
    /// Remove an entry from "my applications".
    Remove { name: String },
    /// Show "my applications".
    Mine,
    /// Manage "my websites".
    Websites {
        #[command(subcommand)]
        action: Option<WebsiteAction>,
    },
}

#[derive(Subcommand)]
enum WebsiteAction {
    Add { url: String },
    Remove { url: String },
}

struct Paths {
    config: PathBuf,
    applications: PathBuf,
    websites: PathBuf,
}

impl Paths {
    fn new(data_dir: Option<PathBuf>) -> Self {
        let dir = data_dir.unwrap_or_else(config::data_dir);
        Self {
            config: dir.join(config::CONFIG_FILE),
            applications: dir.join(config::APP_LIST_FILE),
            websites: dir.join(config::WEBSITE_FILE),
        }
    }
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let paths = Paths::new(cli.data_dir);
    let config = load_config(&paths)?;
    let apps = ApplicationStore::new(&paths.applications);
    let websites = WebsiteStore::new(&paths.websites);

    match cli.command {
        Command::Apps { json } => list_inventory(&config, &apps, json),
        Command::Add { names } => add_from_inventory(&config, &apps, &names),
        Command::AddPath { path } => {
            let path = path
                .canonicalize()
                .with_context(|| format!("{} does not exist", path.display()))?;
            let mut entries = apps.load()?;
            let entry = AppEntry::LocalExecutable(path.to_string_lossy().into_owned());
            if store::is_added(&entries, entry.display_name()) {
                println!("{} is already in my applications", entry.display_name());
                return Ok(());
            }
            println!("added {}", entry.display_name());
            entries.push(entry);
            apps.save(&entries)?;
            Ok(())
        }
        Command::AddUwp { name } => {
            let Some(launch_id) = config.uwp_apps.get(name.trim()) else {
                bail!("UWP app {name:?} is not in the catalog");
            };
            let mut entries = apps.load()?;
            if store::is_added(&entries, name.trim()) {
                println!("{name} is already in my applications");
                return Ok(());
            }
            entries.push(AppEntry::UwpApp {
                uwp_name: Some(name.trim().to_string()),
                uwp: launch_id.clone(),
            });
            apps.save(&entries)?;
            println!("added {name}");
            Ok(())
        }
        Command::Remove { name } => {
            let mut entries = apps.load()?;
            if !store::remove_by_name(&mut entries, &name) {
                bail!("{name:?} is not in my applications");
            }
            apps.save(&entries)?;
            println!("removed {name}");
            Ok(())
        }
        Command::Mine => {
            for entry in apps.load()? {
                match &entry {
                    AppEntry::LocalExecutable(path) => println!("{path}"),
                    AppEntry::UwpApp { uwp, .. } => {
                        println!("{} (UWP {uwp})", entry.display_name())
                    }
                    AppEntry::Discovered(record) => {
                        println!("{} -> {}", record.name, launch_label(record))
                    }
                }
            }
            Ok(())
        }
        Command::Websites { action } => manage_websites(&websites, action),
    }
}

/// Reads the config, writing defaults on first launch.
fn load_config(paths: &Paths) -> Result<AppConfig> {
    if !paths.config.exists() {
        let defaults = AppConfig::default();
        defaults
            .save(&paths.config)
            .context("failed to write default config")?;
        info!("created {}", paths.config.display());
        return Ok(defaults);
    }
    Ok(AppConfig::load(&paths.config)?)
}

fn list_inventory(config: &AppConfig, apps: &ApplicationStore, json: bool) -> Result<()> {
    let inventory = InventoryService::for_current_system(config).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
        return Ok(());
    }
    if inventory.is_empty() {
        println!("no applications found");
        return Ok(());
    }

    let entries = apps.load()?;
    for (record, added) in store::mark_added(&inventory, &entries) {
        let mark = if added { "[x]" } else { "[ ]" };
        let version = if record.version.is_empty() {
            String::new()
        } else {
            format!(" {}", record.version)
        };
        println!("{mark} {}{version}  {}", record.name, launch_label(record));
    }
    Ok(())
}

fn add_from_inventory(config: &AppConfig, apps: &ApplicationStore, names: &[String]) -> Result<()> {
    let inventory = InventoryService::for_current_system(config).collect();
    let matcher = SkimMatcherV2::default();
    let mut entries = apps.load()?;
    let mut added = 0usize;

    for query in names {
        let Some(record) = find_record(&matcher, &inventory, query) else {
            println!("no installed application matches {query:?}");
            continue;
        };
        if store::add_record(&mut entries, record) {
            println!("added {}", record.name);
            added += 1;
        } else {
            println!("{} is already in my applications", record.name);
        }
    }

    if added > 0 {
        apps.save(&entries)?;
    }
    Ok(())
}

fn manage_websites(list: &WebsiteStore, action: Option<WebsiteAction>) -> Result<()> {
    let mut websites = list.load()?;
    match action {
        None => {
            for url in &websites {
                println!("{url}");
            }
        }
        Some(WebsiteAction::Add { url }) => {
            if !store::add_website(&mut websites, &url) {
                bail!("{url:?} is empty or already listed");
            }
            list.save(&websites)?;
        }
        Some(WebsiteAction::Remove { url }) => {
            if !store::remove_website(&mut websites, &url) {
                bail!("{url:?} is not listed");
            }
            list.save(&websites)?;
        }
    }
    Ok(())
}

/// Exact case-insensitive name first, then the best fuzzy match.
fn find_record<'a>(
    matcher: &SkimMatcherV2,
    inventory: &'a [ApplicationRecord],
    query: &str,
) -> Option<&'a ApplicationRecord> {
    let query = query.trim();
    if let Some(exact) = inventory
        .iter()
        .find(|record| record.name.eq_ignore_ascii_case(query))
    {
        return Some(exact);
    }

    inventory
        .iter()
        .filter_map(|record| {
            matcher
                .fuzzy_match(&record.name, query)
                .map(|score| (score, record))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, record)| record)
}

fn launch_label(record: &ApplicationRecord) -> String {
    match record.uwp_id() {
        Some(id) => format!("UWP {id}"),
        None if record.is_launchable() => record.executable_path.clone(),
        None => "(no executable)".to_string(),
    }
}
