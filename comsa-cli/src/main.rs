mod config;
use clap::{Parser, Subcommand};
use comsa_core::{
    CatapultClient, ComsaError, MetadataKey, ResponseArchive, RestoreAssetOperation,
    RestoreAssetOperationRequest,
};
use crate::config::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "comsa")]
#[command(about = "Restore files stored as chunked messages on a Symbol chain")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "comsa.yaml")]
    config: String,

    /// Node REST endpoint, overrides the configuration file
    #[arg(long, global = true)]
    node_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore the file attached to a mosaic
    Restore {
        /// Mosaic id (hex)
        #[arg(short, long)]
        mosaic_id: String,

        /// Where to write the restored file
        #[arg(short, long)]
        output: PathBuf,

        /// Keep raw node responses under this directory
        #[arg(long)]
        archive_dir: Option<PathBuf>,
    },
    /// Show the descriptor and transaction references of a mosaic
    Inspect {
        /// Mosaic id (hex)
        #[arg(short, long)]
        mosaic_id: String,
    },
    /// Print the metadata keys derived from labels
    Key {
        #[arg(required = true)]
        labels: Vec<String>,
    },
    /// Print the node's network properties
    Network,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comsa_cli=info,comsa_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        tracing::error!("{}", error);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> comsa_core::Result<()> {
    let Cli {
        config,
        node_url,
        command,
    } = cli;

    match command {
        Commands::Key { labels } => {
            for label in labels {
                let key = MetadataKey::derive(&label);
                println!("{}\t{}\t{}", label, key.0, key.to_hex());
            }
        }
        Commands::Restore {
            mosaic_id,
            output,
            archive_dir,
        } => {
            let (cfg, client) = connect(&config, node_url)?;

            let mut operation = RestoreAssetOperation::new(Arc::new(client));
            if let Some(dir) = archive_dir.or_else(|| cfg.archive_dir.clone()) {
                operation = operation.with_archive(Arc::new(ResponseArchive::new(dir)?));
            }

            let result = operation
                .run(RestoreAssetOperationRequest {
                    mosaic_id,
                    fetch_delay: cfg.fetch_delay(),
                    max_concurrent_fetches: cfg.max_concurrent_fetches,
                })
                .await?;

            write_output(&output, &result.file.bytes).await?;
            tracing::info!(
                "Wrote {} bytes to {:?} (sha256={}, transactions={}, messages={})",
                result.file.bytes.len(),
                output,
                result.file.file_hash,
                result.references.len(),
                result.message_count
            );
            println!("{}", serde_json::to_string_pretty(&result.descriptor)?);
        }
        Commands::Inspect { mosaic_id } => {
            let (_, client) = connect(&config, node_url)?;
            let operation = RestoreAssetOperation::new(Arc::new(client));
            let catalog = operation.resolve_catalog(&mosaic_id).await?;

            let report = serde_json::json!({
                "descriptor": catalog.descriptor,
                "declared_count": catalog.expected_count,
                "pages": catalog.page_count,
                "references": catalog.references,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Network => {
            let (_, client) = connect(&config, node_url)?;
            let properties = client.network_properties().await?;
            println!("epochAdjustment\t{}", properties.epoch_adjustment);
            println!("currencyMosaicId\t{:016X}", properties.currency_mosaic_id);
        }
    }

    Ok(())
}

fn connect(
    config_path: &str,
    node_url: Option<String>,
) -> comsa_core::Result<(Config, CatapultClient)> {
    let mut cfg = Config::from_file(config_path)?;
    if node_url.is_some() {
        cfg.node_url = node_url;
    }

    let client = CatapultClient::new(cfg.client_config()?)?;
    tracing::info!("Using node {}", client.node_url());
    Ok((cfg, client))
}

async fn write_output(path: &Path, data: &[u8]) -> comsa_core::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| ComsaError::InvalidRequest(format!("invalid output path: {:?}", path)))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".partial");
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, data).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}
