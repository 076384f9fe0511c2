use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mtqueue::config::{LogFormat, LoggingConfig, ServiceConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mtqueue",
    about = "Priority-queued machine translation service",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the service (API server + translation worker)
    Serve {
        /// Bind address (overrides server.listen_address)
        #[arg(long)]
        bind: Option<String>,

        /// Path to the TOML configuration file
        #[arg(long, env = "MTQUEUE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Path to the TOML configuration file
        #[arg(long, env = "MTQUEUE_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, config } => {
            let mut config = ServiceConfig::resolve(config.as_deref())?;
            if let Some(bind) = bind {
                config.server.listen_address = bind;
            }
            config.validate()?;
            init_tracing(&config.logging);

            tracing::info!(
                bind = %config.server.listen_address,
                backend = ?config.processor.backend,
                "Starting mtqueue service"
            );
            mtqueue::serve(config).await?;
        }
        Commands::Config { config } => {
            let config = ServiceConfig::resolve(config.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
