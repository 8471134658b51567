use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Station Monitor task feed client.
/// Settings default to ~/.station-gantt/config.json or a path passed via --config.
#[derive(Parser)]
#[command(name = "sgantt", version, about = "Fetch and normalise station Gantt task feeds")]
pub struct Cli {
    /// Path to the JSON config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overriding config and STATION_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token, overriding STATION_API_TOKEN and the saved session.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
