//! # sgantt - Station Monitor task feed CLI
//!
//! Fetches scheduled maintenance tasks from the Station Monitor API and turns
//! the flat task and link lists into the nested, date-typed structure a Gantt
//! chart loads.
//!
//! ## What the pipeline does
//!
//! - **Dates**: ISO-8601 strings or epoch milliseconds become UTC instants;
//!   unparseable values are dropped with a warning. Missing durations are
//!   derived from start and end in whole days.
//! - **Hierarchy**: records with a `parent` are nested under it. Unknown
//!   parents and parent cycles are resolved by promoting the task to a root.
//! - **Dependencies**: `source`/`target` links become `from`/`to` edges,
//!   defaulting to finish-to-start.
//! - **Project window**: earliest start and latest end over the roots and
//!   their direct children.
//! - **Status**: Completed, Late, Started or Not Started, computed at display
//!   time.
//!
//! ## Quick Start
//!
//! ```bash
//! sgantt login ops
//! sgantt fetch --aircraft-id 12 > gantt.json
//! sgantt show --remote --status late
//! sgantt normalize saved-response.json --shape flat
//! ```
//!
//! Settings live in `~/.station-gantt/config.json`; the session token is kept
//! alongside it in `session.json`.

use std::path::PathBuf;

use clap::Parser;

pub mod api;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod dates;
pub mod deps;
pub mod error;
pub mod fields;
pub mod hierarchy;
pub mod loader;
pub mod pipeline;
pub mod session;
pub mod status;
pub mod task;
pub mod window;

use cli::Cli;
use cmd::*;
use config::{default_dir, Config, API_TOKEN_ENV};
use session::Session;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // Session file sits next to whichever config file is in use.
    let config_path = cli.config.clone().unwrap_or_else(|| default_dir().join("config.json"));
    let state_dir = config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let session_path = state_dir.join("session.json");

    let mut config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    config.apply_env(|k| std::env::var(k).ok());
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    let token = cli
        .token
        .or_else(|| std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.trim().is_empty()))
        .or_else(|| Session::load(&session_path).token);

    let ctx = Context { config, session_path, token };

    let result = match cli.command {
        Commands::Login { username, password } => cmd_login(&ctx, username, password).await,
        Commands::Logout => cmd_logout(&ctx),
        Commands::Fetch { filter, shape, output } => cmd_fetch(&ctx, filter, shape, output).await,
        Commands::Normalize { input, shape, output } => cmd_normalize(&ctx, input, shape, output),
        Commands::Show { input, remote, filter, status } => cmd_show(&ctx, input, remote, filter, status).await,
        Commands::Watch { interval, count, shape, filter } => cmd_watch(&ctx, interval, count, shape, filter).await,
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
