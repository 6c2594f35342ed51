mod amedas;
mod cache;
mod config;
mod error;
mod server;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "amedasd")]
#[command(about = "Latest-observation HTTP gateway for JMA Amedas data")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/amedasd/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Bind address, e.g. 0.0.0.0:8700
  #[arg(short, long)]
  bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override bind address if specified on command line
  if let Some(bind) = args.bind {
    config.server.bind = bind;
  }

  init_tracing(&config.log.filter);

  server::run(config).await
}

fn init_tracing(filter: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
  tracing_subscriber::fmt().with_env_filter(filter).init();
}
