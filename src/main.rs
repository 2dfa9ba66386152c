use std::sync::Arc;

use admin_session::clock::{Clock, SystemClock};
use admin_session::config::MonitorConfig;
use admin_session::countdown::{CountdownTone, format_countdown};
use admin_session::net::AdminClient;
use admin_session::{SessionError, SessionEvent, SessionHandle, SessionWindow, spawn_session_monitor};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "admin-session", about = "Admin session status, renewal, and inactivity watcher")]
struct Cli {
    /// Overrides `ADMIN_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `ADMIN_SESSION_COOKIE`.
    #[arg(long)]
    session_cookie: Option<String>,

    /// Overrides `ADMIN_CSRF_TOKEN`.
    #[arg(long)]
    csrf_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the server-reported session expiry.
    Status,
    /// Extend the current session once.
    Extend,
    /// Delete a comment by id.
    DeleteComment { comment_id: u64 },
    /// Track the session until it expires. Reads `extend` / `logout` from stdin.
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), SessionError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = apply_overrides(MonitorConfig::from_env()?, &cli);
    let client = AdminClient::new(&config)?;
    info!(base_url = client.base_url(), "admin-session configured");

    match cli.command {
        Command::Status => run_status(&client).await,
        Command::Extend => run_extend(&client).await,
        Command::DeleteComment { comment_id } => run_delete_comment(&client, comment_id).await,
        Command::Watch => run_watch(client, &config).await,
    }
}

fn apply_overrides(mut config: MonitorConfig, cli: &Cli) -> MonitorConfig {
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(cookie) = &cli.session_cookie {
        config.session_cookie = Some(cookie.clone());
    }
    if let Some(token) = &cli.csrf_token {
        config.csrf_token = Some(token.clone());
    }
    config
}

async fn run_status(client: &AdminClient) -> Result<(), SessionError> {
    let snapshot = client.fetch_status().await?;
    let remaining = snapshot.remaining_secs_at(SystemClock.now_utc());
    println!("expires_at: {}", snapshot.expires_at);
    println!("remaining:  {}", format_countdown(remaining));
    Ok(())
}

async fn run_extend(client: &AdminClient) -> Result<(), SessionError> {
    client.extend_session().await?;
    println!("session extended");
    Ok(())
}

async fn run_delete_comment(client: &AdminClient, comment_id: u64) -> Result<(), SessionError> {
    let resp = client.delete_comment(comment_id).await?;
    if resp.success {
        println!("deleted comment {comment_id}: {}", resp.message);
    } else {
        eprintln!("comment {comment_id} not deleted: {}", resp.message);
    }
    Ok(())
}

async fn run_watch(client: AdminClient, config: &MonitorConfig) -> Result<(), SessionError> {
    let (handle, mut events) =
        spawn_session_monitor(Arc::new(client), Arc::new(SystemClock), SessionWindow::admin_default(), config.timing());
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    // Extend calls run here so the countdown keeps printing while one waits.
    let mut renewals = JoinSet::new();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::StateChanged(state)) => {
                    let tone = CountdownTone::for_state(&state);
                    println!("[{tone:?}] {}", format_countdown(state.remaining_secs));
                }
                Some(SessionEvent::WarningStarted { remaining_secs }) => {
                    println!("session expires in {}; type `extend` to stay signed in", format_countdown(remaining_secs));
                }
                Some(SessionEvent::RenewalFailed(e)) => eprintln!("could not extend session: {e}"),
                Some(SessionEvent::Navigate(route)) => {
                    println!("redirect: {route}");
                    break;
                }
                Some(other) => info!(event = ?other, "session event"),
                None => break,
            },
            line = input.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_input(&handle, &mut renewals, line.trim()).await,
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            },
            Some(joined) = renewals.join_next(), if !renewals.is_empty() => match joined {
                Ok(Ok(())) => println!("session extended"),
                Ok(Err(SessionError::RenewalInFlight)) => println!("renewal already in progress"),
                Ok(Err(e)) => warn!(error = %e, "extend failed"),
                Err(e) => warn!(error = %e, "extend task failed"),
            },
        }
    }

    renewals.abort_all();
    handle.shutdown().await;
    Ok(())
}

async fn handle_input(handle: &SessionHandle, renewals: &mut JoinSet<Result<(), SessionError>>, line: &str) {
    match line {
        "" => {}
        "extend" => {
            renewals.spawn(handle.extend_request());
        }
        "logout" => {
            if let Err(e) = handle.logout_now().await {
                warn!(error = %e, "logout failed");
            }
        }
        other => eprintln!("unknown command {other:?}; expected `extend` or `logout`"),
    }
}
