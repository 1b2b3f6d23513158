use anyhow::Result;
use clap::Parser;
use kbaudit::cli::Cli;
use kbaudit::{commands, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.json_logs, cli.log_level.level());
    commands::run(cli).await
}
