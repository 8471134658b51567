//! Command implementations for the CLI interface.
//!
//! Each subcommand loads or fetches a task feed, runs it through the
//! normalisation pipeline and prints either the chart document or a tree view.

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Subcommand};
use clap_complete::{generate, Shell};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::api::{ApiClient, FeedFilter};
use crate::config::Config;
use crate::dates::{format_day, CalendarDate};
use crate::error::{GanttError, Result};
use crate::fields::{OutputShape, TaskStatus};
use crate::hierarchy::{count_nodes, walk_with_depth};
use crate::loader::FeedLoader;
use crate::pipeline::{parse_payload, transform, FeedPayload, Forest};
use crate::session::Session;
use crate::status::task_status;
use crate::task::{GanttData, NormalizedTask};

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and save the session token.
    Login {
        username: String,
        /// Password; read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the saved session token.
    Logout,

    /// Fetch the task feed and print the chart document as JSON.
    Fetch {
        #[command(flatten)]
        filter: FilterArgs,
        /// Nested children or a flat list with parent ids.
        #[arg(long, value_enum, default_value_t = OutputShape::Nested)]
        shape: OutputShape,
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Normalise a saved API response ("-" for stdin).
    Normalize {
        input: String,
        #[arg(long, value_enum, default_value_t = OutputShape::Nested)]
        shape: OutputShape,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the task tree with derived statuses.
    Show {
        /// Saved API response ("-" for stdin). Omit with --remote.
        input: Option<String>,
        /// Fetch from the API instead of reading a file.
        #[arg(long)]
        remote: bool,
        #[command(flatten)]
        filter: FilterArgs,
        /// Only rows with this status.
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
    },

    /// Re-fetch on an interval and print one JSON document per refresh.
    Watch {
        /// Seconds between fetches.
        #[arg(long, default_value_t = 60)]
        interval: u64,
        /// Stop after this many documents.
        #[arg(long)]
        count: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputShape::Nested)]
        shape: OutputShape,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Task feed filters shared by the fetching commands.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub aircraft_id: Option<i64>,
    #[arg(long)]
    pub work_package_id: Option<i64>,
    #[arg(long)]
    pub location_code: Option<String>,
    /// true | false
    #[arg(long)]
    pub historic: Option<bool>,
}

impl From<FilterArgs> for FeedFilter {
    fn from(a: FilterArgs) -> Self {
        FeedFilter {
            aircraft_id: a.aircraft_id,
            work_package_id: a.work_package_id,
            location_code: a.location_code,
            is_historic: a.historic,
        }
    }
}

/// Resolved settings every command runs with.
pub struct Context {
    pub config: Config,
    pub session_path: PathBuf,
    pub token: Option<String>,
}

impl Context {
    pub fn client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.config, self.token.clone())
    }
}

/// Fetch the feed; a rejected token clears the saved session.
async fn fetch_payload(ctx: &Context, client: &ApiClient, filter: &FeedFilter) -> Result<FeedPayload> {
    match client.fetch_feed(filter).await {
        Err(GanttError::Unauthorized) => {
            forget_session(&ctx.session_path);
            Err(GanttError::Unauthorized)
        }
        other => other,
    }
}

fn forget_session(path: &Path) {
    if let Err(e) = Session::clear(path) {
        log::warn!("could not clear session {}: {e}", path.display());
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn emit(data: &GanttData, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            println!("Wrote {} task(s) to {}", count_nodes(&data.tasks), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub async fn cmd_login(ctx: &Context, username: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            eprint!("Password: ");
            io::stderr().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    let resp = ctx.client()?.login(&username, &password).await?;
    let name = resp.user.and_then(|u| u.username).unwrap_or(username);
    Session::new(resp.token, Some(name.clone())).save(&ctx.session_path)?;
    println!("Logged in as {name}");
    Ok(())
}

pub fn cmd_logout(ctx: &Context) -> Result<()> {
    Session::clear(&ctx.session_path)?;
    println!("Session cleared");
    Ok(())
}

pub async fn cmd_fetch(ctx: &Context, filter: FilterArgs, shape: OutputShape, output: Option<PathBuf>) -> Result<()> {
    let client = ctx.client()?;
    if !client.has_token() {
        log::warn!("no session token; sending the request unauthenticated");
    }
    let payload = fetch_payload(ctx, &client, &filter.into()).await?;
    let data = transform(&payload, Utc::now()).into_gantt_data(&ctx.config.calendar, shape);
    emit(&data, output.as_deref())
}

pub fn cmd_normalize(ctx: &Context, input: String, shape: OutputShape, output: Option<PathBuf>) -> Result<()> {
    let payload = parse_payload(&read_input(&input)?);
    let data = transform(&payload, Utc::now()).into_gantt_data(&ctx.config.calendar, shape);
    emit(&data, output.as_deref())
}

pub async fn cmd_show(
    ctx: &Context,
    input: Option<String>,
    remote: bool,
    filter: FilterArgs,
    status: Option<TaskStatus>,
) -> Result<()> {
    let payload = match (input, remote) {
        (Some(path), false) => parse_payload(&read_input(&path)?),
        (None, true) => fetch_payload(ctx, &ctx.client()?, &filter.into()).await?,
        _ => {
            return Err(GanttError::Config("give either an input file or --remote".into()));
        }
    };
    let now = Utc::now();
    let forest = transform(&payload, now);
    for line in format_forest(&forest, status, now) {
        println!("{line}");
    }
    Ok(())
}

pub async fn cmd_watch(
    ctx: &Context,
    interval: u64,
    count: Option<usize>,
    shape: OutputShape,
    filter: FilterArgs,
) -> Result<()> {
    let client = Arc::new(ctx.client()?);
    let loader = Arc::new(FeedLoader::new());
    let filter: FeedFilter = filter.into();
    let (tx, mut rx) = mpsc::unbounded_channel::<Result<FeedPayload>>();
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut emitted = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (client, loader, tx, filter) = (client.clone(), loader.clone(), tx.clone(), filter.clone());
                tokio::spawn(async move {
                    if let Some(result) = loader.try_load(client.fetch_feed(&filter)).await {
                        let _ = tx.send(result);
                    }
                });
            }
            Some(result) = rx.recv() => match result {
                Ok(payload) => {
                    let data = transform(&payload, Utc::now()).into_gantt_data(&ctx.config.calendar, shape);
                    println!("{}", serde_json::to_string(&data)?);
                    emitted += 1;
                    if count.is_some_and(|c| emitted >= c) {
                        break;
                    }
                }
                Err(GanttError::Unauthorized) => {
                    forget_session(&ctx.session_path);
                    return Err(GanttError::Unauthorized);
                }
                Err(e) => log::error!("refresh failed, retrying next tick: {e}"),
            },
            _ = &mut ctrl_c => {
                log::info!("interrupted, stopping watch");
                break;
            }
        }
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Render the forest as an indented table, optionally keeping one status only.
pub fn format_forest(forest: &Forest, status: Option<TaskStatus>, now: CalendarDate) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Project window: {} .. {}",
            format_day(&forest.project.start_date),
            format_day(&forest.project.end_date)
        ),
        format!(
            "{:<8} {:<12} {:<10} {:<10} {:>5} {:>4} {}",
            "ID", "Status", "Start", "End", "Days", "%", "Name"
        ),
    ];
    for (depth, t) in walk_with_depth(&forest.tasks) {
        let st = task_status(t, now);
        if status.is_some_and(|s| s != st) {
            continue;
        }
        lines.push(format_row(t, st, depth));
    }
    if !forest.dependencies.is_empty() {
        lines.push(format!("{} dependency link(s)", forest.dependencies.len()));
    }
    lines
}

fn format_row(t: &NormalizedTask, status: TaskStatus, depth: usize) -> String {
    let day = |d: Option<CalendarDate>| d.as_ref().map(format_day).unwrap_or_else(|| "-".into());
    format!(
        "{:<8} {:<12} {:<10} {:<10} {:>5} {:>4} {}{}",
        truncate(&t.id.to_string(), 8),
        status.label(),
        day(t.start_date),
        day(t.end_date),
        t.duration.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        t.percent_done.round(),
        "  ".repeat(depth),
        t.name
    )
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_forest(now: CalendarDate) -> Forest {
        let payload = parse_payload(
            r#"{"tasks": [
                {"id": 1, "text": "A-check", "start": "2025-01-01", "end": "2025-01-08"},
                {"id": 2, "text": "Cabin", "parent": 1, "start": "2025-01-01", "end": "2025-01-03", "progress": 100},
                {"id": 3, "text": "Engines", "parent": 1, "start": "2025-01-04", "end": "2025-01-08", "deadline": "2025-01-06"}
            ], "links": [{"source": 2, "target": 3}]}"#,
        );
        transform(&payload, now)
    }

    #[test]
    fn test_format_forest_rows() {
        let now = Utc.with_ymd_and_hms(2025, 1, 7, 12, 0, 0).unwrap();
        let lines = format_forest(&sample_forest(now), None, now);
        assert_eq!(lines[0], "Project window: 2025-01-01 .. 2025-01-08");
        assert_eq!(lines.len(), 2 + 3 + 1);
        assert!(lines[2].starts_with("1        Started"));
        assert!(lines[3].contains("Completed") && lines[3].ends_with("  Cabin"));
        assert!(lines[4].contains("Late") && lines[4].ends_with("  Engines"));
        assert_eq!(lines[5], "1 dependency link(s)");
    }

    #[test]
    fn test_format_forest_status_filter() {
        let now = Utc.with_ymd_and_hms(2025, 1, 7, 12, 0, 0).unwrap();
        let lines = format_forest(&sample_forest(now), Some(TaskStatus::Late), now);
        let rows: Vec<_> = lines.iter().filter(|l| l.contains("Engines") || l.contains("Cabin")).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("Engines"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 8), "short");
        assert_eq!(truncate("WP-1234567", 8), "WP-1234…");
    }

    #[test]
    fn test_normalize_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("feed.json");
        let output = dir.path().join("gantt.json");
        fs::write(&input, r#"{"tasks": [{"id": 1}, {"id": 2, "parent": 1}], "links": [{"source": 1, "target": 2}]}"#)
            .unwrap();
        let ctx = Context {
            config: Config::default(),
            session_path: dir.path().join("session.json"),
            token: None,
        };
        cmd_normalize(&ctx, input.display().to_string(), OutputShape::Flat, Some(output.clone())).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(doc["tasks"].as_array().unwrap().len(), 2);
        assert_eq!(doc["tasks"][1]["parentId"], serde_json::json!(1));
        assert_eq!(doc["dependencies"][0]["type"], serde_json::json!(0));
    }

    #[tokio::test]
    async fn test_fetch_unauthorised_clears_session() {
        let dir = TempDir::new().unwrap();
        let session_path = dir.path().join("session.json");
        Session::new("stale".into(), None).save(&session_path).unwrap();

        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/api/gantt/tasks").with_status(401).create_async().await;
        let ctx = Context {
            config: Config { api_url: server.url(), ..Config::default() },
            session_path: session_path.clone(),
            token: Some("stale".into()),
        };
        let err = cmd_fetch(&ctx, FilterArgs::default(), OutputShape::Nested, None).await.unwrap_err();
        assert!(matches!(err, GanttError::Unauthorized));
        assert!(!session_path.exists());
    }
}
