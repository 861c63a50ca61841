use esg_portal_client::bus::{BusEvent, PortalEvent};
use esg_portal_client::likes::{ButtonStyle, ContentRef, LikeButton};
use esg_portal_client::scores::ScoreBoard;
use esg_portal_client::tasks::TaskTracker;
use esg_portal_client::{PortalConfig, PortalSession};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    General,
    Task(String),
    Scores(String),
    Likes(Vec<ContentRef>),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("portal_watch failed: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "esg_portal_client=debug,info"
            .parse()
            .expect("valid env filter")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut base_url: Option<String> = None;
    let mut command: Option<Command> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            print_help();
            return Ok(());
        }

        if let Some(value) = arg.strip_prefix("--base-url=") {
            base_url = Some(value.to_string());
            continue;
        }
        if arg == "--base-url" {
            let value = args
                .next()
                .ok_or_else(|| "--base-url requires a value".to_string())?;
            base_url = Some(value);
            continue;
        }

        if command.is_some() {
            return Err(format!("unexpected argument '{arg}'"));
        }
        command = Some(match arg.as_str() {
            "general" => Command::General,
            "task" => Command::Task(
                args.next()
                    .ok_or_else(|| "task requires a task id".to_string())?,
            ),
            "scores" => Command::Scores(
                args.next()
                    .ok_or_else(|| "scores requires a company name".to_string())?,
            ),
            "likes" => {
                let raw = args
                    .next()
                    .ok_or_else(|| "likes requires a type:id list".to_string())?;
                Command::Likes(parse_items(&raw)?)
            }
            other => {
                return Err(format!(
                    "unknown command '{other}'. Use general, task, scores, or likes"
                ))
            }
        });
    }

    let Some(command) = command else {
        print_help();
        return Err("missing command".to_string());
    };

    let mut config = PortalConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(url) = base_url {
        config.base_url = url.trim_end_matches('/').to_string();
    }
    let session = PortalSession::new(config).map_err(|e| e.to_string())?;

    match command {
        Command::General => {
            let rx = session.connect_general();
            watch(rx, |event| {
                matches!(event.event, PortalEvent::SseMaxReconnectAttempts { .. })
            })
            .await
        }
        Command::Task(task_id) => {
            let rx = session.watch_task(&task_id);
            let mut tracker = TaskTracker::new();
            watch(rx, |event| {
                tracker.apply(event);
                tracker.is_finished(&task_id)
                    || matches!(event.event, PortalEvent::TaskDisconnected { .. })
            })
            .await?;
            if let Some(progress) = tracker.get(&task_id) {
                info!("task {task_id}: {} updates", progress.updates_seen);
            }
            Ok(())
        }
        Command::Scores(company_name) => {
            let rx = session.watch_scores(&company_name);
            let mut board = ScoreBoard::for_company(company_name.as_str());
            watch(rx, |event| {
                board.apply(event);
                match &event.event {
                    PortalEvent::ScoreDisconnected { .. } => true,
                    PortalEvent::ScoreUpdate { update, .. } => update.status.is_terminal(),
                    _ => false,
                }
            })
            .await?;
            for (source, cell) in board.cells() {
                println!("{source}\t{}", cell.label());
            }
            Ok(())
        }
        Command::Likes(items) => {
            let buttons = items
                .into_iter()
                .map(|item| LikeButton::new(item, ButtonStyle::Compact))
                .collect();
            if !session.likes().initialize(buttons).await {
                return Err("like status unavailable".to_string());
            }
            for button in session.likes().buttons() {
                let state = if button.is_liked { "liked" } else { "-" };
                println!("{}\t{}\t{state}", button.item, button.like_count);
            }
            Ok(())
        }
    }
}

/// Print bus events as JSON lines until `done` matches one, the bus closes,
/// or Ctrl-C.
async fn watch<F>(mut rx: broadcast::Receiver<BusEvent>, mut done: F) -> Result<(), String>
where
    F: FnMut(&BusEvent) -> bool,
{
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                return Ok(());
            }
            received = rx.recv() => match received {
                Ok(event) => {
                    let line = serde_json::to_string(&event).map_err(|e| e.to_string())?;
                    println!("{line}");
                    if done(&event) {
                        return Ok(());
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("watcher lagged, dropped {n} events"),
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}

fn parse_items(raw: &str) -> Result<Vec<ContentRef>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<ContentRef>().map_err(|e| e.to_string()))
        .collect()
}

fn print_help() {
    println!(
        "\
portal_watch - follow live ESG portal updates

Usage:
  portal_watch [--base-url <url>] <command>

Commands:
  general              Follow the general /sse stream
  task <task-id>       Follow one task until it finishes
  scores <company>     Follow score updates for a company
  likes <type:id,...>  Show like counts, e.g. likes article:1,event:4

Environment:
  ESG_PORTAL_BASE_URL, ESG_PORTAL_SESSION_COOKIE and the other ESG_PORTAL_*
  settings are read from the environment or a .env file.
  RUST_LOG overrides the default log filter."
    );
}
