use anyhow::Context;
use clap::Parser;
use colored::*;
use notisync::{BearerToken, NotificationKind, NotificationSync, StoreState, SyncConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the notification service
    #[arg(long)]
    base_url: String,

    /// WebSocket URL of the push endpoint
    #[arg(long)]
    push_url: String,

    /// Bearer token for the session
    #[arg(long, env = "NOTISYNC_TOKEN")]
    token: String,

    /// Maximum notifications per list pull
    #[arg(long, default_value_t = 50)]
    limit: u32,

    /// Mark everything read on start, then keep tailing
    #[arg(long)]
    mark_all_read: bool,
}

fn kind_label(kind: NotificationKind) -> ColoredString {
    match kind {
        NotificationKind::Info => "info".blue(),
        NotificationKind::Success => "success".green(),
        NotificationKind::Warning => "warning".yellow(),
        NotificationKind::Error => "error".red(),
    }
}

fn print_state(state: &StoreState) {
    println!(
        "{} {} unread / {} total",
        "inbox:".bold(),
        state.unread_count.to_string().cyan(),
        state.items.len()
    );
    for item in &state.items {
        let marker = if item.read { " " } else { "*" };
        println!(
            "  {} [{}] {} {}",
            marker.cyan().bold(),
            kind_label(item.kind),
            item.created_at.format("%Y-%m-%d %H:%M"),
            item.title.bold()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let auth = BearerToken::new(args.token);
    let mut config = SyncConfig::new(args.base_url, args.push_url);
    config.list_limit = args.limit;

    let sync = NotificationSync::connect(config, auth);
    let mut state_rx = sync.watch_state();
    let mut conn_rx = sync.watch_connection();

    if args.mark_all_read {
        sync.mark_all_as_read()
            .await
            .context("failed to mark all notifications read")?;
        println!("{}", "marked all notifications read".green());
    }

    println!("{}", "tailing notifications, ctrl-c to quit".bold());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            res = state_rx.changed() => {
                res.context("sync engine stopped")?;
                let state = state_rx.borrow_and_update().clone();
                print_state(&state);
                if let Some(err) = &state.last_error {
                    eprintln!("{} {}", "sync error:".red(), err);
                }
            }
            res = conn_rx.changed() => {
                res.context("sync engine stopped")?;
                let status = conn_rx.borrow_and_update().clone();
                if status.connected() {
                    println!("{}", "push channel connected".green());
                } else {
                    println!("{} {:?}", "push channel:".yellow(), status.state);
                }
            }
        }
    }

    sync.shutdown().await;
    Ok(())
}
