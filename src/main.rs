use std::path::PathBuf;

use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
#[command(disable_version_flag = true)]
struct Args {
    /// Load configuration from this file instead of the default location.
    #[arg(short, long, value_name = "file")]
    config: Option<PathBuf>,

    /// Parse and validate the configuration, then exit without binding.
    #[arg(long)]
    validate_only: bool,

    /// Print the version and exit.
    #[arg(short = 'V', long = "version")]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    ongarde_core::telemetry::setup_logging();

    let args = Args::parse();
    if args.version {
        println!("ongarde {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = match ongarde_config::Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "startup failed: invalid configuration");
            std::process::exit(1);
        }
    };

    if args.validate_only {
        println!("configuration is valid");
        return Ok(());
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("building the tokio runtime")
        .block_on(serve(config))
}

async fn serve(config: ongarde_config::Config) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting ongarde");

    let bound = match ongarde_proxy::app::run(config).await {
        Ok(bound) => bound,
        Err(err) => {
            tracing::error!(error = %err, "startup failed: could not bind proxy listener");
            std::process::exit(1);
        }
    };

    bound.wait_termination().await
}
