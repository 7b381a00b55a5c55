//! ircpanel: a single-window IRC chat panel for the terminal.
//!
//! Pick a nickname and channel, connect, chat. Every server event lands in
//! the color-coded console below the input fields.

mod app;
mod config;
mod ui;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{Event as TermEvent, KeyEventKind};
use ircpanel_core::{Panel, SdkConnector, SessionController};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::{Config, Resolved};

#[derive(Parser, Debug)]
#[command(name = "ircpanel", about = "Minimal IRC chat panel")]
pub struct Cli {
    /// IRC server address (host:port)
    #[arg(long)]
    pub server: Option<String>,

    /// Nickname to prefill
    #[arg(long)]
    pub nick: Option<String>,

    /// Channel to prefill
    #[arg(long)]
    pub channel: Option<String>,

    /// Use TLS
    #[arg(long)]
    pub tls: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub tls_insecure: bool,

    /// Show the console chronologically instead of latest-on-top
    #[arg(long)]
    pub oldest_first: bool,

    /// Give up on a connect attempt after this many seconds (0 = never)
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, env = "IRCPANEL_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = cli.log_file.clone().unwrap_or_else(config::default_log_path);
    init_logging(&log_path)?;

    let config = Config::load();
    let resolved = Resolved::merge(&cli, &config);
    tracing::info!(server = %resolved.server, tls = resolved.tls, "starting ircpanel");

    let connector = SdkConnector {
        tls: resolved.tls,
        tls_insecure: resolved.tls_insecure,
        connect_timeout: resolved.connect_timeout,
        ..Default::default()
    };
    let controller = SessionController::new(connector, Panel::new(resolved.console_order));
    let mut app = App::new(resolved.server, resolved.nick, resolved.channel, controller);

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app).await;
    ratatui::restore();
    result
}

/// Use JSON logs with IRCPANEL_LOG_JSON=1, human-readable otherwise.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ircpanel_tui=info,ircpanel_core=info,ircpanel_sdk=info".into());
    let json_logs = std::env::var("IRCPANEL_LOG_JSON").unwrap_or_default() == "1";
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file));
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn run(terminal: &mut ratatui::DefaultTerminal, app: &mut App<SdkConnector>) -> Result<()> {
    let (input_tx, mut input_rx) = mpsc::channel::<TermEvent>(64);

    // crossterm::event::read blocks, so it gets its own thread
    std::thread::spawn(move || {
        while let Ok(event) = crossterm::event::read() {
            if input_tx.blocking_send(event).is_err() {
                break;
            }
        }
    });

    // Router output arrives from another task; redraw on a tick to show it
    let mut tick = tokio::time::interval(Duration::from_millis(100));

    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            Some(event) = input_rx.recv() => {
                if let TermEvent::Key(key) = event
                    && key.kind == KeyEventKind::Press
                {
                    let action = app.handle_key(key);
                    app.perform(action).await;
                }
            }
            joined = attempt_finished(&mut app.pending) => {
                app.finish_connect(joined).await;
            }
            _ = tick.tick() => {}
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Resolves when the connect attempt in flight ends; never, if there is none.
async fn attempt_finished<T>(pending: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match pending {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
