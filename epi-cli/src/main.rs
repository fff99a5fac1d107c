//! epi-cli - fetch and reshape epidemiological time series.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "epi-cli",
    version,
    about = "Snapshot and archive tools for epidemiological signals"
)]
struct Cli {
    #[command(subcommand)]
    command: epi_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    epi_cmd::run(cli.command).await
}
