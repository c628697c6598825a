use dropshelf::cli::{AppConfig, Args, Dispatch};
use dropshelf::config::{FileSettings, SettingsProvider, SettingsStore};
use dropshelf::domain::FileDescriptor;
use dropshelf::manager::StackManager;
use dropshelf::notify::{Notification, ShelfObserver};

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints toasts and clipboard text to stdout.
struct ConsoleObserver;

impl ShelfObserver for ConsoleObserver {
    fn on_files_updated(&self, snapshot: &[FileDescriptor]) {
        debug!(staged = snapshot.len(), "Stack updated");
    }

    fn on_notification(&self, notification: &Notification) {
        println!("[{}] {}", notification.title, notification.body);
    }

    fn on_clipboard_text(&self, text: &str) {
        println!("{}", text);
    }
}

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let config: AppConfig = args.into();
    init_logging(config.verbose);

    if let Err(e) = run(&config).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_settings(config: &AppConfig) -> SettingsStore {
    let loaded = match &config.settings {
        Some(path) => SettingsStore::load_from(path),
        None => SettingsStore::load(),
    };

    let store = loaded.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load settings, using defaults");
        SettingsStore::in_memory(FileSettings::default())
    });
    store.complete_first_run();
    store
}

async fn run(config: &AppConfig) -> Result<()> {
    let settings = Arc::new(load_settings(config));

    if config.forget_recent {
        settings
            .clear_recent_destinations()
            .context("Failed to forget recent destinations")?;
    }

    if config.show_recent {
        let recent = settings.file_settings().recent_destinations;
        if recent.is_empty() {
            println!("No recent destinations");
        }
        for destination in recent {
            println!("{}", destination.display());
        }
    }

    let manager = StackManager::new(settings.clone());
    manager.subscribe(Arc::new(ConsoleObserver));

    manager.add_files(config.files.clone()).await;

    if !config.select.is_empty() {
        let staged = manager.snapshot().await;
        for &position in &config.select {
            let Some(file) = staged.get(position) else {
                bail!(
                    "No staged file at position {} ({} staged)",
                    position + 1,
                    staged.len()
                );
            };
            manager.select(&file.id).await;
        }
    }

    if config.list {
        print_stack(&manager).await;
    }

    match config.dispatch {
        Dispatch::Move => {
            let summary = match &config.destination {
                Some(destination) => manager.move_files_to_destination(destination).await,
                None => manager.move_files_to_default_destination().await,
            };
            if summary.successes == 0 && summary.failures > 0 {
                bail!("No files were moved");
            }
        }
        Dispatch::PrintPaths => {
            manager.copy_file_paths(None).await;
        }
        Dispatch::None => {}
    }

    Ok(())
}

async fn print_stack(manager: &StackManager) {
    let staged = manager.snapshot().await;
    if staged.is_empty() {
        println!("Stack is empty");
        return;
    }

    let selected = manager.selected_ids().await;
    for (category, files) in manager.files_by_category().await {
        println!("{} ({})", category, files.len());
        for file in files {
            let position = staged.iter().position(|f| f.id == file.id).unwrap_or(0) + 1;
            let marker = if selected.contains(&file.id) { '*' } else { ' ' };
            println!(
                " {}{:>3}. {}  {} bytes  {}",
                marker,
                position,
                file.name,
                file.size,
                file.path.display()
            );
        }
    }
}
