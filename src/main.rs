use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netcfg_backup::config::{self, Config};
use netcfg_backup::managers::artifacts::ArtifactStore;
use netcfg_backup::managers::backup::BackupManager;
use netcfg_backup::managers::logging::{self, LoggingConfig};
use netcfg_backup::managers::notification::NotificationManager;
use netcfg_backup::managers::task::BackupTask;
use netcfg_backup::utils::locker::RunLock;
use netcfg_backup::{DeviceDescriptor, DriverRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "netcfg-backup")]
#[command(about = "Concurrent configuration backups for network devices", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "netcfg-backup.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up all devices in the inventory, or a single device
    Run {
        /// Specific device to back up (defaults to the whole inventory)
        #[arg(short, long)]
        device: Option<String>,

        /// Override global.max_workers for this run
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Validate configuration file
    Validate,

    /// List all configured devices
    List,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load and validate configuration
    let config = config::load_config(&cli.config)
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;
    let devices = config::resolve_devices(&config)?;

    let command = cli.command.unwrap_or(Commands::Run {
        device: None,
        workers: None,
    });

    match command {
        Commands::Run { device, workers } => run(&config, devices, device, workers).await,

        Commands::Validate => {
            logging::init_console_logging();
            println!("Configuration is valid!");
            println!("Devices: {}", devices.len());
            println!("Platforms: {}", config.platforms.len());
            println!("Max workers: {}", config.global.max_workers);
            Ok(ExitCode::SUCCESS)
        }

        Commands::List => {
            logging::init_console_logging();
            println!("Configured devices:");
            for device in &devices {
                println!("  {}", device.hostname);
                println!("    Platform: {}", device.platform);
                println!("    Username: {}", device.username);
                if !device.options.is_empty() {
                    let keys: Vec<&str> = device.options.keys().map(String::as_str).collect();
                    println!("    Options: {}", keys.join(", "));
                }
                println!();
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(
    config: &Config,
    mut devices: Vec<DeviceDescriptor>,
    only: Option<String>,
    workers: Option<usize>,
) -> Result<ExitCode> {
    // Setup logging with file rotation (must keep guard alive)
    let logging_config = LoggingConfig::from_config(
        &config.global.log_directory,
        &config.global.log_level,
        config.global.log_max_files,
    );
    let _log_guard = match logging::init_logging(&logging_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_console_logging();
            warn!("File logging unavailable, using console only: {:#}", e);
            None
        }
    };

    if let Some(ref hostname) = only {
        devices.retain(|d| &d.hostname == hostname);
        if devices.is_empty() {
            anyhow::bail!("Device '{}' not found in configuration", hostname);
        }
    }

    let backup_root = config.global.backup_root();
    let mut run_lock = RunLock::open(&backup_root)?;
    let _lock_guard = run_lock.try_acquire()?;

    let store = Arc::new(ArtifactStore::new(&backup_root));
    let task = BackupTask::new(store.clone(), config.global.operation_timeout())
        .with_retention(config.global.keep_last);
    let registry = DriverRegistry::from_platforms(&config.platforms);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, finishing in-flight backups");
            let _ = shutdown_tx.send(true);
        }
    });

    let manager = BackupManager::new(registry, task).with_shutdown(shutdown_rx);
    let max_workers = workers.unwrap_or(config.global.max_workers);

    println!(
        "Backing up {} device(s) into {:?}...",
        devices.len(),
        backup_root
    );
    let summary = manager.run_backup(devices, max_workers).await?;

    println!("{}", summary.render().trim_end());

    if config.global.write_report {
        match store.write_report(&summary) {
            Ok(path) => info!("Wrote run report to {:?}", path),
            Err(e) => error!("Failed to write run report: {}", e),
        }
    }

    match NotificationManager::new(config.notifications.clone()) {
        Ok(notifier) => {
            if let Err(e) = notifier.notify_run(&summary).await {
                warn!("Failed to send notification: {:#}", e);
            }
        }
        Err(e) => warn!("Notifications unavailable: {:#}", e),
    }

    if summary.is_success() {
        println!("✓ All backups completed successfully");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("✗ {} of {} backup(s) failed", summary.failed, summary.total);
        Ok(ExitCode::FAILURE)
    }
}
