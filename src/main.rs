//! Wai Bot: entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build backend client, router, dispatcher (+ intent loop for sync)
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Spawn channels and, for the polling variant, the pending-message poller
//!   8. Wait for every component to exit

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use wai_bot::backend::BackendClient;
use wai_bot::config::{self, Variant};
use wai_bot::dispatcher::Dispatcher;
use wai_bot::error::AppError;
use wai_bot::intent::IntentLoop;
use wai_bot::llm::providers;
use wai_bot::logger;
use wai_bot::router::ResponseRouter;
use wai_bot::subsystems::comms;
use wai_bot::subsystems::poll::PendingPoller;
use wai_bot::subsystems::runtime::{Component, spawn_components};

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present: ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        bot_name = %config.bot_name,
        variant = ?config.variant,
        backend = %config.backend.base_url,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let backend = BackendClient::new(&config.backend).map_err(|e| AppError::Backend(e.to_string()))?;
    let router = ResponseRouter::new();

    let intent = match config.variant {
        Variant::Sync => {
            let provider = providers::build(&config.llm, config.llm_api_key.clone())
                .map_err(|e| AppError::Llm(e.to_string()))?;
            info!(provider = %config.llm.provider, history_cap = ?config.intent.history_cap, "intent loop ready");
            Some(IntentLoop::new(provider, config.intent.history_cap))
        }
        Variant::Polling => None,
    };

    let dispatcher = Arc::new(Dispatcher::new(backend.clone(), router.clone(), config.variant, intent));

    // Shared shutdown token: Ctrl-C cancels it, all components watch it.
    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received: initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let mut components: Vec<Box<dyn Component>> = comms::channels(&config, dispatcher);

    if config.variant == Variant::Polling {
        components.push(Box::new(PendingPoller::new("poll0", backend, router, config.poll.clone())));
    }

    info!(components = components.len(), "starting components");
    let result = spawn_components(components, shutdown.clone()).join().await;

    shutdown.cancel();
    info!("shutdown complete");
    result
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: wai-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    CliArgs { log_level: logger::level_from_verbosity(verbosity), config_path }
}
