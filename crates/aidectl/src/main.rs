//! Aide Control - CLI client for the Aide daemon.

use aide_common::DEFAULT_BIND_ADDR;
use aidectl::client::AideClient;
use aidectl::commands;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aidectl")]
#[command(about = "Aide - natural-language desktop assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Daemon base URL
    #[arg(long, global = true, env = "AIDE_URL", default_value_t = format!("http://{}", DEFAULT_BIND_ADDR))]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon health
    Health,

    /// Send a message to the assistant
    Chat {
        /// Message text (multiple words are joined)
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Run an action directly, e.g. `exec read_file file_path=notes.txt`
    Exec {
        action: String,

        /// Parameters as key=value
        params: Vec<String>,
    },

    /// Control the activity monitor
    Monitor {
        #[command(subcommand)]
        command: MonitorCommands,
    },

    /// Show conversation memory
    History,

    /// Clear conversation memory
    Forget,
}

#[derive(Subcommand)]
enum MonitorCommands {
    /// Start capturing snapshots
    Start {
        /// Seconds between snapshots (daemon default when omitted)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Stop capturing
    Stop,
    /// Show monitor state
    Status,
    /// Print the latest snapshot
    Latest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = AideClient::new(&cli.url)?;

    match cli.command {
        Commands::Health => commands::health(&client).await,
        Commands::Chat { message } => commands::chat(&client, &message.join(" ")).await,
        Commands::Exec { action, params } => commands::exec(&client, &action, &params).await,
        Commands::Monitor { command } => match command {
            MonitorCommands::Start { interval } => commands::monitor_start(&client, interval).await,
            MonitorCommands::Stop => commands::monitor_stop(&client).await,
            MonitorCommands::Status => commands::monitor_status(&client).await,
            MonitorCommands::Latest => commands::monitor_latest(&client).await,
        },
        Commands::History => commands::history(&client).await,
        Commands::Forget => commands::forget(&client).await,
    }
}
