mod cli;

use vidstream::config;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use vs_core::VideoId;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    storage_root: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(root) = storage_root {
        config.storage.root = root;
    }

    tracing::info!("Starting vidstream server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    vs_server::start(config)
        .await
        .context("Server terminated with an error")
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(path)?;

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("Configuration is valid");
    } else {
        println!("Configuration is valid with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    println!("  storage root:    {}", config.storage.root.display());
    println!("  max chunk bytes: {}", config.streaming.max_chunk_bytes);
    println!("  naming policy:   {:?}", config.ingest.naming_policy);
    Ok(())
}

fn generate_id() -> Result<()> {
    let id = VideoId::generate().context("Failed to generate video id")?;
    println!("{}", id);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidstream=debug,vs_server=debug,vs_storage=debug,tower_http=debug".to_string()
        } else {
            "vidstream=info,vs_server=info,vs_storage=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            storage_root,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, storage_root, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::GenerateId => generate_id(),
        Commands::Version => {
            println!("vidstream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
