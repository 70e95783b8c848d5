use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error};

use cuemaster_analytics::analytics::{AnalyticsApiServer, AnalyticsEngine};
use cuemaster_analytics::config::Config;
use cuemaster_analytics::storage::SheetStore;

/// Collect and summarize CueMaster gameplay analytics
#[derive(Parser)]
#[command(name = "cuemaster-analytics")]
#[command(about = "Analytics collection service for the CueMaster billiards suite", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP collection service (default command)
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory holding the analytics sheet
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Path to a TOML configuration file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
    /// Create or reset the analytics sheet with its header row
    Setup {
        /// Directory holding the analytics sheet
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Print the aggregate summary as JSON
    Summary {
        /// Directory holding the analytics sheet
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("cuemaster-analytics started with verbosity {}", cli.verbose);

    let result = match cli.command {
        Some(Commands::Serve {
            port,
            data_dir,
            config,
        }) => run_serve(port, data_dir, config).await,
        Some(Commands::Setup { data_dir }) => run_setup(data_dir).await,
        Some(Commands::Summary { data_dir }) => run_summary(data_dir).await,
        None => run_serve(None, None, None).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load(path.as_deref())?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

async fn run_serve(
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path, data_dir)?;
    if let Some(port) = port {
        config.port = port;
    }

    let store = SheetStore::open(&config.data_dir, config.lock_wait());
    if !store.is_initialized() {
        tracing::warn!(
            "Analytics sheet missing at {}; submissions will fail until `setup` is run",
            store.sheet_path().display()
        );
    }

    AnalyticsApiServer::new(config).start().await
}

async fn run_setup(data_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(None, data_dir)?;
    let store = SheetStore::open(&config.data_dir, config.lock_wait());
    store.setup().await?;
    println!("Analytics sheet ready at {}", store.sheet_path().display());
    Ok(())
}

async fn run_summary(data_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(None, data_dir)?;
    let store = SheetStore::open(&config.data_dir, config.lock_wait());

    let records = store.scan().await?;
    let summary = AnalyticsEngine::new(config.recent_limit).summarize(&records);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
