//! Network Intrusion Detector CLI
//!
//! A command-line tool for classifying traffic records, either against a
//! running detector service or directly against an artifact directory.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{fields, health, predict, schema, stats, Target};
use std::path::PathBuf;

/// Network Intrusion Detector CLI
#[derive(Parser)]
#[command(name = "idsctl")]
#[command(author, version, about = "CLI for the Network Intrusion Detector", long_about = None)]
pub struct Cli {
    /// Detector service URL (can also be set via IDS_API_URL env var)
    #[arg(long, env = "IDS_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a traffic record
    Predict {
        /// Feature value as name=value (repeatable)
        #[arg(long = "feature", short = 'F', value_parser = predict::parse_feature)]
        features: Vec<(String, f64)>,

        /// Start from the form defaults for any field not given
        #[arg(long)]
        defaults: bool,

        /// Reject records with missing or unknown features
        #[arg(long)]
        strict: bool,

        /// Evaluate in-process against this artifact directory
        #[arg(long, env = "IDS_ARTIFACT_DIR")]
        local: Option<PathBuf>,
    },

    /// Show the feature order the classifier expects
    Schema {
        /// Read the schema from this artifact directory
        #[arg(long, env = "IDS_ARTIFACT_DIR")]
        local: Option<PathBuf>,
    },

    /// List the traffic fields and their accepted values
    Fields,

    /// Show detector service health
    Health,

    /// Show the detector's inference counters
    Stats,
}

fn target(config: &config::Config, api_url: Option<String>, local: Option<PathBuf>) -> Result<Target> {
    match config.resolve_artifact_dir(local) {
        Some(dir) => Ok(Target::Local(dir)),
        None => Ok(Target::Remote(client::ApiClient::new(
            &config.resolve_api_url(api_url),
        )?)),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;

    match cli.command {
        Commands::Predict {
            features,
            defaults,
            strict,
            local,
        } => {
            let target = target(&config, cli.api_url, local)?;
            predict::predict(&target, features, defaults, strict, cli.format).await?;
        }
        Commands::Schema { local } => {
            let target = target(&config, cli.api_url, local)?;
            schema::show_schema(&target, cli.format).await?;
        }
        Commands::Fields => fields::show_fields(cli.format),
        Commands::Health => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;
            health::show_health(&client, cli.format).await?;
        }
        Commands::Stats => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;
            stats::show_stats(&client, cli.format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
