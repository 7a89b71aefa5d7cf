use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use fitwise::recommend::parser::parse_recommendation;
use fitwise::{AnalysisSession, EngineConfig, ProductData, SizeEngine, UserProfile};

#[derive(Parser, Debug)]
#[command(
    name = "fitwise",
    about = "Normalize size charts and turn AI fit analyses into size recommendations"
)]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output, including the generated prompt
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a pipe-delimited size chart
    Chart {
        file: PathBuf,
        /// Print JSON instead of the table form
        #[arg(long)]
        json: bool,
    },
    /// Parse a fabric composition and estimate its stretch factor
    Stretch { text: String },
    /// Parse a saved model response into a recommendation record
    Parse { file: PathBuf },
    /// Run the full analysis with the configured provider
    Analyze {
        /// Scraped product data (JSON)
        #[arg(long)]
        product: PathBuf,
        /// User profile (JSON)
        #[arg(long)]
        profile: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::load().context("failed to load config")?,
    };
    Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid JSON in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    run(cli).await
}

/// Dispatch a subcommand. The config file is only read by subcommands that use
/// the vocabulary or a provider.
async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Chart { file, json } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let engine = SizeEngine::new(&load_config(config_path)?.vocabulary()?);
            match engine.normalizer.normalize(&raw) {
                Some(chart) if json => println!("{}", serde_json::to_string_pretty(&chart)?),
                Some(chart) => print!("{}", chart.format()),
                None => anyhow::bail!("no usable size chart in {}", file.display()),
            }
        }
        Command::Stretch { text } => {
            let engine = SizeEngine::new(&load_config(config_path)?.vocabulary()?);
            let materials = engine.stretch.parse_materials(&text);
            let output = serde_json::json!({
                "materials": materials,
                "stretch": engine.stretch.estimate(&materials),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Parse { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let record = parse_recommendation(&text)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Analyze { product, profile } => {
            let config = load_config(config_path)?;
            let product: ProductData = read_json(&product)?;
            let profile: UserProfile = read_json(&profile)?;
            let session = AnalysisSession::from_config(&config)?;
            let analysis = session.analyze(&product, &profile).await?;
            log::info!("[cli] Storage key: {}", analysis.storage_key());
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
    }

    Ok(())
}
