//! Gestioneau CLI - water and sanitation back-office server

use std::sync::Arc;

use clap::{Parser, Subcommand};
use gestioneau_core::config::Config;
use gestioneau_core::domain::CATALOG;
use gestioneau_core::search::{SearchIndex, SqliteSearchIndex};
use gestioneau_core::service::ServiceRegistry;
use gestioneau_core::storage::Database;
use gestioneau_server::{AppState, build_router};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "gestioneau")]
#[command(author, version, about = "Water and sanitation back-office", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Rebuild the search mirror from the relational store
    Reindex {
        /// Resource or entity to rebuild (all when omitted), e.g. `provinces` or `Province`
        resource: Option<String>,
    },

    /// List the entity catalog
    Entities,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gestioneau=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(host, port).await,
        Commands::Reindex { resource } => cmd_reindex(resource.as_deref(), cli.quiet).await,
        Commands::Entities => cmd_entities(cli.format),
        Commands::Config { action } => cmd_config(action, cli.quiet),
        Commands::Doctor => cmd_doctor(cli.quiet).await,
    }
}

/// Open both stores named by the configuration
async fn open_stores(config: &Config) -> anyhow::Result<(Database, SqliteSearchIndex)> {
    let db = Database::new(config.database.database_config()).await?;
    let index = SqliteSearchIndex::open(config.search.database_config()).await?;
    Ok((db, index))
}

async fn cmd_serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let (db, index) = open_stores(&config).await?;
    let state = AppState::new(db.clone(), Arc::new(index), &config)?;
    let app = build_router(state);

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let listener = TcpListener::bind((host.as_str(), port)).await?;
    let address = listener.local_addr()?;

    info!(
        address = %address,
        database = %db.path().display(),
        entities = CATALOG.len(),
        "Gestioneau listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Gestioneau stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn cmd_reindex(resource: Option<&str>, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let (db, index) = open_stores(&config).await?;
    let registry = ServiceRegistry::new(db.pool().clone(), Arc::new(index));

    let counts = match resource {
        Some(resource) => {
            let service = registry.lookup(resource)?;
            vec![(service.descriptor().resource, service.reindex().await?)]
        }
        None => registry.reindex_all().await?,
    };

    if !quiet {
        for (resource, indexed) in &counts {
            println!("{:<32} {:>8} documents", resource, indexed);
        }
    }
    let total: u64 = counts.iter().map(|(_, n)| n).sum();
    info!(entities = counts.len(), documents = total, "Search mirror rebuilt");

    db.close().await;
    Ok(())
}

fn cmd_entities(format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(CATALOG)?);
        }
        OutputFormat::Text => {
            println!("{:<28} {:<32} {:>6} {:>9}", "ENTITY", "RESOURCE", "FIELDS", "RELATIONS");
            for descriptor in CATALOG {
                println!(
                    "{:<28} {:<32} {:>6} {:>9}",
                    descriptor.name,
                    descriptor.resource,
                    descriptor.fields.len(),
                    descriptor.relations.len()
                );
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            // Environment overrides are not persisted
            let path = Config::config_path()?;
            let mut config = Config::load_from(&path)?;
            config.set(&key, &value)?;
            config.save_to(&path)?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Gestioneau Health Check");
        println!("=======================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            config
        }
        Err(e) => {
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
                println!();
                println!("Some checks failed. See above for details.");
            }
            return Ok(());
        }
    };

    if !quiet {
        match Config::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => {
                println!("[!!] Config file: Error - {}", e);
            }
        }
    }

    match Database::new(config.database.database_config()).await {
        Ok(db) => match db.health_check().await {
            Ok(()) => {
                if !quiet {
                    println!("[OK] Database: Connected");
                    println!("     Path: {}", db.path().display());
                    match db.migration_status().await {
                        Ok(status) if status.needs_migration => println!(
                            "[!!] Database: Migrations pending (v{} -> v{})",
                            status.current_version, status.target_version
                        ),
                        Ok(status) => {
                            println!("[OK] Database: Schema v{}", status.current_version)
                        }
                        Err(e) => println!("[!!] Database: Migration check failed - {}", e),
                    }
                }
                db.close().await;
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Database: Health check failed - {}", e);
                }
            }
        },
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: Failed to initialize - {}", e);
            }
        }
    }

    match SqliteSearchIndex::open(config.search.database_config()).await {
        Ok(index) => match index.health_check().await {
            Ok(()) => {
                if !quiet {
                    println!("[OK] Search mirror: Connected");
                    println!("     Path: {}", config.search.path.display());
                }
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Search mirror: Health check failed - {}", e);
                    println!("     Run `gestioneau reindex` once the mirror is reachable");
                }
            }
        },
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Search mirror: Failed to initialize - {}", e);
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
