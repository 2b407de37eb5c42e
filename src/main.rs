#![deny(dead_code)]
use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, warn};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

mod ui;
mod utils;

use crate::ui::{ChatUI, UiAction};
use tripchat::chat::{ApplyOutcome, ChatError, ConversationLoader, HttpLoader, LoadTicket};
use tripchat::config::{self, Config, ConfigOverrides};
use tripchat::models::ChatPage;

type LoadResult = (LoadTicket, std::result::Result<ChatPage, ChatError>);

/// Command line arguments for tripchat
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tripchat: a terminal viewer for trip group conversations.",
    long_about = "tripchat pages a trip conversation in from the chat endpoint and shows it in the terminal.\n\n\
    Values on the command line override the config file.\n\
    Use -h or --help to see all options."
)]
struct Args {
    /// Base URL of the chat service; pages are read from <URL>/chat?page=N
    #[arg(long, env = "TRIPCHAT_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// First page to load
    #[arg(long, value_name = "N")]
    start_page: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Retries for a failed page before giving up (0 disables retrying)
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Where to write the log
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "TRIPCHAT_LOG_LEVEL", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            start_page: self.start_page,
            request_timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            log_file: self.log_file.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => config::default_config_path().ok(),
    };
    let file = match path {
        Some(path) => config::load_config_file(&path)?,
        None => None,
    };
    Ok(Config::resolve(file, &args.overrides())?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    utils::setup_logging(&config.log_file, config.log_level)?;
    info!("tripchat starting up");
    info!("System information: {} {}", std::env::consts::OS, std::env::consts::ARCH);
    info!("Chat endpoint: {}", config.base_url);

    let loader: Arc<dyn ConversationLoader> =
        Arc::new(HttpLoader::with_options(config.base_url.clone(), config.loader_options())?);

    // Setup terminal UI
    let mut terminal = ui::setup_terminal()?;
    let mut chat_ui = ChatUI::new(config.start_page);

    let result = run_main_loop(&mut chat_ui, &mut terminal, loader).await;

    info!("Closing with {} messages loaded", chat_ui.session().messages().len());
    chat_ui.close();
    ui::restore_terminal(terminal)?;

    if let Err(e) = &result {
        error!("Main loop ended with error: {}", e);
    }
    info!("Chat session ended.");
    result
}

/// Fetch a page in the background and post the result back to the UI loop
fn spawn_fetch(loader: Arc<dyn ConversationLoader>, ticket: LoadTicket, tx: mpsc::Sender<LoadResult>) {
    tokio::spawn(async move {
        let page = ticket.page();
        let result = loader.load_page(page).await;
        if tx.send((ticket, result)).await.is_err() {
            debug!("Screen closed before page {} arrived", page);
        }
    });
}

/// Run the main event loop
async fn run_main_loop(
    chat_ui: &mut ChatUI,
    terminal: &mut ui::Terminal<ui::CrosstermBackend<io::Stdout>>,
    loader: Arc<dyn ConversationLoader>,
) -> Result<()> {
    let (result_tx, mut result_rx) = mpsc::channel::<LoadResult>(16);

    if let Some(ticket) = chat_ui.mount() {
        spawn_fetch(Arc::clone(&loader), ticket, result_tx.clone());
    }

    loop {
        chat_ui.tick();
        terminal.draw(|f| chat_ui.draw(f))?;

        match chat_ui.handle_input()? {
            UiAction::Quit => {
                info!("Quit requested");
                break;
            }
            UiAction::Fetch(ticket) => spawn_fetch(Arc::clone(&loader), ticket, result_tx.clone()),
            UiAction::Nothing => {}
        }

        while let Ok((ticket, result)) = result_rx.try_recv() {
            let page = ticket.page();
            match chat_ui.apply_result(ticket, result) {
                ApplyOutcome::Applied { pages, new_messages } => {
                    info!("Applied page(s) {:?}: {} new messages", pages, new_messages);
                }
                ApplyOutcome::Buffered { page } => debug!("Page {} waiting for earlier pages", page),
                ApplyOutcome::Failed(e) => warn!("Page {} not loaded: {}", e.page(), e),
                ApplyOutcome::Stale => debug!("Dropped stale result for page {}", page),
            }
        }

        tokio::task::yield_now().await;
    }

    Ok(())
}
