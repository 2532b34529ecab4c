use election_cache::config::load_config;
use election_cache::control::{listen_for_commands, wait_for_shutdown, ControlContext, Shutdown};
use election_cache::parser::ResultsParser;
use election_cache::scraper::ScraperImpl;
use election_cache::server::{self, AppState};
use election_cache::storage::CacheStore;
use election_cache::updater::{UpdateOrchestrator, UpdateSchedule};
use std::process;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = load_config(&config_path);

    // Initialize logging
    let level = config
        .as_ref()
        .ok()
        .and_then(|c| c.log_level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config = match config {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            process::exit(1);
        }
    };

    let parser = match ResultsParser::from_config(&config.remote) {
        Ok(p) => p,
        Err(e) => {
            error!("Invalid extraction rules: {}", e);
            process::exit(1);
        }
    };
    let scraper = match ScraperImpl::new(&config.remote.user_agent, config.remote.request_timeout()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            process::exit(1);
        }
    };
    let (cadence, addr) = match (config.cadence(), config.bind_addr()) {
        (Ok(cadence), Ok(addr)) => (cadence, addr),
        (Err(e), _) | (_, Err(e)) => {
            error!("Config error: {}", e);
            process::exit(1);
        }
    };

    let store = Arc::new(CacheStore::new());
    let orchestrator = Arc::new(UpdateOrchestrator::new(
        Arc::new(scraper),
        Arc::new(parser),
        store,
        config.remote.url.clone(),
        config.freshness(),
    ));
    let schedule = Arc::new(UpdateSchedule::new(cadence));
    let (shutdown_tx, shutdown_rx) = watch::channel(None::<Shutdown>);

    info!("Caching and setting schedule of {}", config.cache_schedule);
    {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.on_timer().await;
        });
    }
    let timer = {
        let schedule = schedule.clone();
        let orchestrator = orchestrator.clone();
        let shutdown = wait_for_shutdown(shutdown_rx.clone());
        tokio::spawn(async move { schedule.run(orchestrator, shutdown).await })
    };

    tokio::spawn(listen_for_signals(shutdown_tx.clone()));

    {
        let ctx = ControlContext {
            orchestrator: orchestrator.clone(),
            schedule: schedule.clone(),
            started: Instant::now(),
        };
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            listen_for_commands(BufReader::new(tokio::io::stdin()), &ctx, &shutdown_tx).await;
        });
    }

    info!("Starting server...");
    let served = server::serve(
        addr,
        AppState::new(orchestrator),
        wait_for_shutdown(shutdown_rx.clone()),
    )
    .await;

    if let Err(e) = served {
        error!("{}", e);
        shutdown_tx.send_replace(Some(Shutdown::Stop));
        process::exit(1);
    }

    if let Err(e) = timer.await {
        warn!("Update timer task ended abnormally: {}", e);
    }

    let reason = (*shutdown_rx.borrow()).unwrap_or(Shutdown::Signal);
    info!("Exiting ({:?})", reason);
    // stdin reads block a runtime thread, so exit without waiting on them
    process::exit(reason.exit_code());
}

/// Ctrl-C, or SIGTERM on Unix.
async fn listen_for_signals(shutdown: watch::Sender<Option<Shutdown>>) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
    shutdown.send_replace(Some(Shutdown::Signal));
}
