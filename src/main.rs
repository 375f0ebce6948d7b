use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use parlor_core::{ApiClient, Config};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "parlor", version)]
#[command(about = "Chat with an AI service from your terminal")]
struct Cli {
    /// Base URL of the chat service
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Log file (defaults to parlor.log in the config directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Remember --api-url in the config file
    #[arg(long, requires = "api_url")]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match &cli.log_file {
        Some(path) => path.clone(),
        None => Config::get_config_dir()?.join("parlor.log"),
    };
    init_logging(&log_path)?;

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable config file");
        Config::new()
    });

    if cli.save {
        if let Some(url) = cli.api_url.as_deref() {
            Config::save_api_base_url(url)?;
            info!(%url, "saved API base URL");
        }
    }

    let base_url = config.resolve_base_url(cli.api_url.as_deref());
    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.request_timeout());
    let client = ApiClient::with_timeout(&base_url, timeout)?;

    info!(%base_url, ?timeout, "starting parlor v{}", env!("CARGO_PKG_VERSION"));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(Arc::new(client), events.sender());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!("exiting");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

/// Send logs to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
