//! Folio Bot server entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Open the session ledger (canned chat is disabled without a store)
//!   6. Build the LLM provider and retrieval engine (disabled without a credential)
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Spawn engine initialization in the background
//!   9. Serve HTTP until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use folio_bot::canned::ContactInfo;
use folio_bot::http::{self, AppState};
use folio_bot::ledger::SessionLedger;
use folio_bot::{config, error, logger, rag};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), error::AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.server.log_level.as_str());
    logger::init(
        effective_log_level,
        args.log_level.is_some(),
        config.server.log_file.as_deref(),
    )?;

    info!(
        bind = %config.server.bind,
        configured_log_level = %config.server.log_level,
        effective_log_level = %effective_log_level,
        llm_provider = %config.llm.provider,
        data_dir = %config.knowledge.data_dir.display(),
        "config loaded"
    );

    let ledger = match SessionLedger::open(&config.store) {
        Ok(Some(ledger)) => Some(ledger),
        Ok(None) => {
            warn!("no store path configured; canned chat endpoints disabled");
            None
        }
        Err(e) => {
            warn!(error = %e, "session ledger unavailable; canned chat endpoints disabled");
            None
        }
    };

    let engine = rag::build_engine(&config);

    // Shared shutdown token: Ctrl-C cancels it, the server watches it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    if let Some(engine) = &engine {
        let engine = engine.clone();
        let force_rebuild = args.rebuild_index;
        tokio::spawn(async move {
            if engine.initialize(force_rebuild).await.is_err() {
                warn!("retrieval chat stays unavailable until restart");
            }
        });
    }

    let state = AppState {
        ledger,
        engine,
        contact: Arc::new(ContactInfo::from(&config.contact)),
        profile: Arc::new(config.profile.clone()),
    };
    let router = http::build_router(state, &config.server.cors_origins);

    http::serve(&config.server.bind, router, shutdown).await
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
    rebuild_index: bool,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;
    let mut rebuild_index = false;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: folio-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                println!("      --rebuild-index        Rebuild the knowledge index instead of loading it");
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
            "--rebuild-index" => rebuild_index = true,
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v picks a fixed level regardless of config:
    //   -v → warn, -vv → info, -vvv → debug, -vvvv+ → trace
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs {
        log_level,
        config_path,
        rebuild_index,
    }
}
