use anyhow::{anyhow, Result};
use clap::Parser;
use eeharvest::catalog::{EarthEngine, EnvToken, DEFAULT_TOKEN_VAR};
use eeharvest::collection;
use eeharvest::config::CollectionConfig;
use eeharvest::fetch::HttpFetcher;
use std::path::PathBuf;
use tracing::{info, warn};

/// Download the least cloudy Earth Engine scenes around a point and unzip
/// them into timestamped directories.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// TOML file with the collection parameters; built-in defaults otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Google Cloud project billed for Earth Engine requests
    #[arg(short, long)]
    project: Option<String>,

    /// Environment variable holding an OAuth access token
    #[arg(long, default_value = DEFAULT_TOKEN_VAR)]
    token_env: String,

    /// Overrides `output_folder`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overrides `num_images`
    #[arg(short, long)]
    num_images: Option<usize>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    write_template: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let mut config = match &cli.config {
        Some(path) => CollectionConfig::read(path)?,
        None => CollectionConfig::default(),
    };
    if let Some(output) = cli.output {
        config.output_folder = output;
    }
    if let Some(num_images) = cli.num_images {
        config.num_images = num_images;
    }
    config.validate()?;

    if let Some(path) = cli.write_template {
        config.write(&path)?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let project = cli
        .project
        .ok_or(anyhow!("--project is required to query Earth Engine"))?;
    let catalog = EarthEngine::new(&project, EnvToken::new(&cli.token_env));
    let fetcher = HttpFetcher::default();

    let report = collection::collect(&config, &catalog, &fetcher).await?;
    if !report.is_complete() {
        warn!(
            "Only {} of {} scene(s) were extracted",
            report.extracted(),
            report.scenes.len()
        );
    }

    Ok(())
}
