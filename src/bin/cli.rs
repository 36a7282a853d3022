//! Mentari Notifier CLI
//!
//! Local execution entry point: runs one evaluation per invocation against
//! a directory-backed state store. Scheduling (page-load hook, timer, cron)
//! stays outside.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use notifier::{
    config::Preferences,
    error::Result,
    models::Config,
    pipeline::Notifier,
    storage::{self, COURSE_DATA_KEY, LAST_SENT_HASH_KEY, LocalStateStore, StateStore},
    utils,
};

/// Mentari incomplete-coursework notifier
#[derive(Parser, Debug)]
#[command(
    name = "notifier",
    version,
    about = "Detects incomplete Mentari coursework and notifies via webhook"
)]
struct Cli {
    /// Path to the state directory containing config and cached data
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate the cached snapshot immediately (data-change trigger)
    Run,

    /// Evaluate after the configured bootstrap delay (startup trigger)
    Bootstrap,

    /// Validate the configuration file
    Validate,

    /// Show current notifier state
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Arc::new(Config::load_or_default(&config_path));
    let store = Arc::new(LocalStateStore::new(&cli.storage_dir));

    match cli.command {
        Command::Run => {
            let notifier = Notifier::new(Arc::clone(&config), store)?;
            let outcome = notifier.on_course_data_updated().await;
            log::info!("Evaluation finished: {:?}", outcome);
        }

        Command::Bootstrap => {
            log::info!(
                "Bootstrap evaluation in {} ms...",
                config.bootstrap.delay_ms
            );
            let notifier = Notifier::new(Arc::clone(&config), store)?;
            match notifier.bootstrap().await {
                Ok(outcome) => log::info!("Bootstrap evaluation finished: {:?}", outcome),
                Err(e) => log::error!("Bootstrap task failed: {}", e),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK (portal: {})", config.portal.base_url);
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());

            let prefs = Preferences::load(store.as_ref()).await;
            log::info!(
                "Notifier: {} (recipient: {})",
                if prefs.enabled { "enabled" } else { "disabled" },
                if prefs.phone.is_empty() {
                    "none"
                } else {
                    prefs.phone.as_str()
                }
            );
            log::info!(
                "Webhook: {}",
                if prefs.webhook_url.is_empty() {
                    "not configured"
                } else {
                    prefs.webhook_url.as_str()
                }
            );
            if !prefs.webhook_url.is_empty() && !utils::is_http_url(&prefs.webhook_url) {
                log::warn!("Webhook URL does not look like an http(s) URL");
            }

            match storage::read_json::<serde_json::Value>(store.as_ref(), COURSE_DATA_KEY).await {
                Some(snapshot) => {
                    let courses = snapshot.as_array().map_or(0, Vec::len);
                    log::info!("Cached snapshot: {} course(s)", courses);
                }
                None => log::info!("No cached snapshot found."),
            }

            match store.get(LAST_SENT_HASH_KEY).await? {
                Some(hash) => log::info!("Last sent fingerprint: {}", hash),
                None => log::info!("No notification delivered yet."),
            }
        }
    }

    Ok(())
}
