use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lifeline::commands::{cache_clear, cache_show, ping, status};

#[derive(Parser)]
#[command(
    name = "lifeline",
    version,
    about = "Resilient API connectivity layer with DNS-outage fallback and health probing",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe API reachability and print the health classification
    Status {
        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Ping the API through the full endpoint-fallback machinery
    Ping,

    /// Inspect or reset the persisted resolution cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print cached hostname-to-IP mappings
    Show,
    /// Drop every cached mapping
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Status { json } => {
            tracing::info!(json = %json, "Starting status command");
            status(json).await?;
        }

        Commands::Ping => {
            tracing::info!("Starting ping command");
            ping().await?;
        }

        Commands::Cache { action } => match action {
            CacheAction::Show => {
                tracing::info!("Starting cache show command");
                cache_show().await?;
            }
            CacheAction::Clear => {
                tracing::info!("Starting cache clear command");
                cache_clear().await?;
            }
        },
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("lifeline=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("lifeline=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}
