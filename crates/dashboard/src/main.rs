use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dashboard::config::DashboardConfig;
use dashboard::server::{self, Services};

#[derive(Debug, Parser)]
#[command(name = "dashboard")]
#[command(about = "Job Not Finished: unfinished GitHub projects, tracked and roasted")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Send the reminder emails once and print the summary as JSON.
    SendReminders,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dashboard=info,tower_http=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server::run(&config).await,
        Command::SendReminders => {
            let services = Services::from_config(&config).await?;
            let summary = services.runner.run(Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}
