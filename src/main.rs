// src/main.rs
// =============================================================================
// This is the entry point of link-shelf.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging, load settings, open the store
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 1 = invalid links / nothing found,
//    2 = error)
//
// Everything below main() returns anyhow::Result so any error, whatever
// its type, ends up as "Error: ..." and exit code 2.
// =============================================================================

mod api;
mod checker;
mod cli;
mod config;
mod error;
mod models;
mod scheduler;
mod store;
mod transfer;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use checker::{
    FaviconResolver, HttpFetcher, LinkValidator, ProbePolicy, ProbeResult, ReqwestFetcher,
    SweepGuard, SweepOutcome,
};
use cli::{Cli, Commands};
use config::Settings;
use models::LinkHealth;
use store::{SqliteStore, StoreHandles};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

// The pieces every subcommand may need, built once from the settings.
struct Services {
    settings: Settings,
    stores: StoreHandles,
    fetcher: Arc<dyn HttpFetcher>,
    policy: ProbePolicy,
    // One per process: the scheduler and the API both go through it
    sweep_guard: SweepGuard,
}

impl Services {
    fn resolver(&self) -> FaviconResolver {
        FaviconResolver::new(self.fetcher.clone(), self.policy.clone())
    }

    fn validator(&self) -> LinkValidator {
        LinkValidator::new(
            self.stores.links.clone(),
            self.fetcher.clone(),
            self.policy.clone(),
            &self.settings.sweep,
            self.sweep_guard.clone(),
        )
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = Settings::load_or_default(&cli.config);
    if let Some(database) = cli.database {
        settings.storage.database = database;
    }
    settings.validate()?;

    let stores = if cli.memory {
        log::info!("Using in-memory store; nothing will be saved");
        StoreHandles::memory()
    } else {
        let path = &settings.storage.database;
        let store = SqliteStore::open(path)
            .with_context(|| format!("could not open database {}", path.display()))?;
        log::debug!("Opened database {}", path.display());
        StoreHandles::from_backend(Arc::new(store))
    };

    let services = Services {
        fetcher: Arc::new(ReqwestFetcher::new(&settings.http)?),
        policy: ProbePolicy::from_settings(&settings.http),
        sweep_guard: SweepGuard::new(),
        stores,
        settings,
    };

    match cli.command {
        Commands::Serve { bind, no_schedule } => {
            handle_serve(services, bind, no_schedule).await
        }
        Commands::Check { json } => handle_check(&services, json).await,
        Commands::Favicon { url } => handle_favicon(&services, &url).await,
        Commands::Export { output } => handle_export(&services, output).await,
        Commands::Import { file } => handle_import(&services, file).await,
    }
}

// Handles the 'serve' subcommand
// Normally runs until the process is killed.
async fn handle_serve(services: Services, bind: Option<String>, no_schedule: bool) -> Result<i32> {
    let validator = Arc::new(services.validator());
    let bind = bind.unwrap_or_else(|| services.settings.server.bind.clone());

    if services.settings.sweep.schedule_enabled && !no_schedule {
        scheduler::spawn_daily(validator.clone(), services.settings.sweep.daily_hour);
    } else {
        log::info!("Daily link sweep is disabled");
    }

    let state = api::AppState {
        resolver: Arc::new(services.resolver()),
        validator,
        default_icon: Arc::from(services.settings.server.default_icon.as_str()),
        stores: services.stores,
    };
    api::serve(state, &bind).await?;
    Ok(0)
}

// Handles the 'check' subcommand
async fn handle_check(services: &Services, json: bool) -> Result<i32> {
    let report = match services.validator().validate_all().await? {
        SweepOutcome::Completed(report) => report,
        // Nothing else in this process sweeps, so this can't happen here
        SweepOutcome::Skipped => return Ok(0),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report.results);
        println!();
        println!("📊 Summary:");
        println!("   ✅ Valid: {}", report.valid());
        println!("   ❌ Invalid: {}", report.invalid());
        println!("   📋 Total: {}", report.checked());
    }

    Ok(if report.invalid() > 0 { 1 } else { 0 })
}

// Handles the 'favicon' subcommand
async fn handle_favicon(services: &Services, url: &str) -> Result<i32> {
    match services.resolver().resolve(url).await {
        Some(icon) => {
            println!("{}", icon);
            Ok(0)
        }
        None => {
            eprintln!("No favicon found for {}", url);
            Ok(1)
        }
    }
}

// Handles the 'export' subcommand
// Writes the stored records as-is, the same shape GET /api/export returns.
async fn handle_export(services: &Services, output: Option<std::path::PathBuf>) -> Result<i32> {
    let links = services.stores.links.find_all().await?;
    let json = serde_json::to_string_pretty(&links)?;

    match output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("could not write {}", path.display()))?;
            log::info!("Exported {} link(s) to {}", links.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(0)
}

// Handles the 'import' subcommand
// Favicons are looked up one by one after the insert; a missing one is fine.
async fn handle_import(services: &Services, file: std::path::PathBuf) -> Result<i32> {
    let content = fs::read_to_string(&file)
        .with_context(|| format!("could not read {}", file.display()))?;
    let parsed: transfer::ImportFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a link export", file.display()))?;

    let summary = transfer::import_links(services.stores.links.as_ref(), parsed.into_entries()).await?;

    let resolver = services.resolver();
    for link in &summary.links {
        if let Some(icon) = resolver.resolve(&link.url).await {
            services
                .stores
                .links
                .update_fields(link.id, models::LinkUpdate::favicon(Some(icon)))
                .await?;
        }
    }

    println!(
        "📥 Imported {} link(s), skipped {} invalid entr{}",
        summary.imported,
        summary.skipped,
        if summary.skipped == 1 { "y" } else { "ies" }
    );
    Ok(0)
}

// Prints sweep results as a human-readable table in the terminal
fn print_table(results: &[ProbeResult]) {
    println!("{:<6} {:<60} {:<12} {:<30}", "ID", "URL", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(110));

    for result in results {
        let message = result.message.as_deref().unwrap_or("");

        // Truncate URL if too long for display
        let url_display = if result.url.chars().count() > 57 {
            format!("{}...", result.url.chars().take(57).collect::<String>())
        } else {
            result.url.clone()
        };

        println!(
            "{:<6} {:<60} {:<12} {:<30}",
            result.id,
            url_display,
            format_health(result.health),
            message
        );
    }
}

fn format_health(health: LinkHealth) -> &'static str {
    match health {
        LinkHealth::Valid => "✅ VALID",
        LinkHealth::Invalid => "❌ INVALID",
        LinkHealth::Unchecked => "… UNCHECKED",
    }
}
