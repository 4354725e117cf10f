//! DriveCache Daemon - drive configuration and listing cache service
//!
//! Restores configured drives on startup and keeps their listing caches
//! (and auto-refresh schedules) alive until shut down.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use drivecache::model::{DriveConfig, DriveConfigDto, DriveId, StorageStrategyConfig, StorageType};
use drivecache::{BackendRegistry, DaemonConfig, DriveConfigService, DriveError, MemoryStore};

/// CLI command
#[derive(Debug)]
enum Command {
    /// Run the daemon (default)
    Serve,
    /// List configured drives
    List,
    /// Add a drive backed by a local directory
    AddLocal { name: String, path: PathBuf },
    /// Delete a drive
    Remove { id: DriveId },
    /// Show help
    Help,
}

fn print_help() {
    eprintln!(
        r#"DriveCache Daemon - Drive configuration and listing cache

USAGE:
    drivecache-daemon                       # Run the daemon (default)
    drivecache-daemon serve
    drivecache-daemon list
    drivecache-daemon add-local <name> <path>
    drivecache-daemon remove <id>
    drivecache-daemon help

COMMANDS:
    serve      Restore configured drives and serve until Ctrl+C
    list       List configured drives
    add-local  Add a drive serving a local directory
    remove     Delete a drive and its storage parameters
    help       Show this help message

ENVIRONMENT:
    DRIVECACHE_STORE                  Drive store file (default: <config dir>/drivecache/drives.json)
    DRIVECACHE_CACHE_TTL_SECS         Listing cache TTL in seconds (default: 1800)
    DRIVECACHE_CACHE_CAPACITY         Max cached listings per drive (default: 10000)
    DRIVECACHE_REFRESH_INTERVAL_SECS  Auto-refresh period in seconds (default: 60)
    RUST_LOG                          Log level (trace, debug, info, warn, error)
"#
    );
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        return Ok(Command::Serve);
    }

    match args[1].as_str() {
        "serve" => Ok(Command::Serve),
        "list" => Ok(Command::List),
        "add-local" => {
            if args.len() < 4 {
                return Err(anyhow!("Usage: drivecache-daemon add-local <name> <path>"));
            }
            Ok(Command::AddLocal {
                name: args[2].clone(),
                path: PathBuf::from(&args[3]),
            })
        }
        "remove" => {
            let id = args
                .get(2)
                .ok_or_else(|| anyhow!("Usage: drivecache-daemon remove <id>"))?;
            let id = id
                .parse()
                .with_context(|| format!("Invalid drive id: {}", id))?;
            Ok(Command::Remove { id })
        }
        "help" | "--help" | "-h" => Ok(Command::Help),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            Ok(Command::Help)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let log_level = env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command
    let command = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    if let Command::Help = command {
        print_help();
        return Ok(());
    }

    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    let store = MemoryStore::open(&config.store_path).with_context(|| {
        format!("Failed to open drive store at {}", config.store_path.display())
    })?;
    let service = DriveConfigService::new(
        Arc::new(store),
        BackendRegistry::with_defaults(),
        config.cache.clone(),
    );

    match command {
        Command::Serve => {
            info!(store = %config.store_path.display(), "Starting DriveCache daemon");

            let report = service.restore().await?;
            for drive_id in &report.failed {
                warn!(drive_id = drive_id, "Drive is configured but not serving");
            }

            info!("Daemon ready. Press Ctrl+C to stop.");

            // Wait for Ctrl+C
            tokio::signal::ctrl_c().await?;

            info!("Received shutdown signal, stopping drives...");
            service.shutdown().await;

            info!("Shutdown complete.");
        }
        Command::List => {
            let drives = service.list().await?;
            if drives.is_empty() {
                println!("No drives configured.");
            } else {
                println!("Configured drives:");
                for drive in drives {
                    println!(
                        "  [{}] {} ({}) cache={} auto-refresh={}",
                        drive.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                        drive.name,
                        drive.storage_type,
                        drive.enable_cache,
                        drive.auto_refresh_cache
                    );
                }
            }
        }
        Command::AddLocal { name, path } => {
            let mut drive = DriveConfig::new(name, StorageType::Local);
            drive.enable_cache = true;
            let dto = DriveConfigDto::compose(
                drive,
                StorageStrategyConfig {
                    file_path: Some(path.display().to_string()),
                    ..Default::default()
                },
            );

            match service.save(dto).await {
                Ok(id) => println!("Added drive {} -> {}", id, path.display()),
                Err(DriveError::Initialization { drive_id }) => {
                    warn!(drive_id = drive_id, path = %path.display(), "Drive saved but its directory is not usable");
                    println!("Added drive {} (not initialized: {} is not a directory)", drive_id, path.display());
                }
                Err(e) => {
                    error!(error = %e, "Failed to add drive");
                    return Err(e.into());
                }
            }
            service.shutdown().await;
        }
        Command::Remove { id } => {
            if let Err(e) = service.delete_by_id(id).await {
                error!(drive_id = id, error = %e, "Failed to remove drive");
                return Err(e.into());
            }
            println!("Removed drive {}", id);
        }
        Command::Help => print_help(),
    }

    Ok(())
}
