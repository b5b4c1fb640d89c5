use anyhow::{Context, Result};
use backup_relay::config::{self, Config, DestinationConfig};
use backup_relay::managers::logging::{self, LoggingConfig};
use backup_relay::utils::credentials::EnvResolver;
use backup_relay::utils::executor::RealExecutor;
use backup_relay::utils::http::ReqwestClient;
use backup_relay::BackupManager;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "backup-relay")]
#[command(
    about = "Collect database dumps, files and HTTP snapshots and ship them to object storage",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Path to configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backup (default)
    Run,

    /// Validate configuration file and resolve credentials
    Validate,

    /// List configured sources and destinations
    List,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_console_logging();
            return Err(e).with_context(|| format!("Failed to load {:?}", cli.config));
        }
    };

    // Setup logging with file rotation; the guard flushes the file writer when main returns
    let _log_guard = logging::init_logging(&LoggingConfig::from_settings(&config.logging))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let manager = BackupManager::from_config(&config)?;
            println!("Running backup for '{}'...", config.app);

            match manager.run() {
                Ok(report) => {
                    for artifact in &report.artifacts {
                        println!(
                            "  {} -> {} [{}]",
                            artifact.source, artifact.file_name, artifact.status
                        );
                    }
                    println!("  Combined: {}", report.combined_archive);
                    for upload in &report.uploads {
                        println!(
                            "  Uploaded {} file(s) to {}",
                            upload.files.len(),
                            upload.destination
                        );
                    }
                    println!("✓ Backup completed successfully");
                }
                Err(e) => {
                    eprintln!("✗ Backup failed during {}: {}", e.phase(), e);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        Commands::Validate => {
            let resolver = EnvResolver::new();
            config::build_sources(
                &config,
                &resolver,
                Arc::new(RealExecutor::new()),
                Arc::new(ReqwestClient::new()?),
            )?;
            config::build_destinations(&config, &resolver)?;

            println!("Configuration is valid!");
            println!("Sources: {}", config.sources.len());
            println!("Destinations: {}", config.destinations.len());
            println!("Archive type: {}", config.archive_type);
        }

        Commands::List => print_list(&config),
    }

    Ok(ExitCode::SUCCESS)
}

fn print_list(config: &Config) {
    println!("Configured sources:");
    for source in &config.sources {
        println!("  {} ({})", source.name(), source.kind());
        println!("    Backup filename: {}", source.backup_filename());
    }

    println!();
    println!("Configured destinations:");
    for destination in &config.destinations {
        match destination {
            DestinationConfig::S3(s3) => {
                println!("  {} ({})", s3.name, destination.kind());
                println!("    Bucket: {}", s3.bucket);
                println!("    Region: {}", s3.region);
                if let Some(prefix) = &s3.prefix {
                    println!("    Prefix: {}", prefix);
                }
                println!("    Grouped: {}", s3.group);
            }
        }
    }
}
