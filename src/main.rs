mod cli;
mod wizard;

use clap::Parser;
use color_eyre::Result;

use opsdash::logging;

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = cli::Args::parse();

  // Logging goes to a file; keep the guard so it flushes on exit
  let _log_guard = logging::init(&logging::default_log_dir()?)?;

  cli::run(args).await
}
