//! Finboard HTTP server.
//!
//! # Responsibility
//! - Wire configuration, logging, the store, services, the reset scheduler
//!   and the background worker into one process.
//! - Shut down in order: HTTP, scheduler, worker, store.

mod dto;
mod error;
mod handlers;
mod routes;

use crate::routes::AppState;
use finboard_core::{
    init_logging, init_stderr_logging, reset_scheduler, AppConfig, BackgroundWorker, Clock,
    FinanceStore, HistoryRecorder, LedgerService, ResetService, SystemClock, TransactionService,
};
use log::{info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("ENV").ok().as_deref() != Some("prod") {
        dotenvy::dotenv().ok();
    }
    let config = AppConfig::from_env()?;

    let logging = match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy()),
        None => init_stderr_logging(&config.log_level),
    };
    logging.map_err(anyhow::Error::msg)?;

    let store = Arc::new(FinanceStore::open(&config.db_path)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let worker = BackgroundWorker::start()?;
    let history = HistoryRecorder::background(Arc::clone(&store), worker.handle());

    let ledger = Arc::new(LedgerService::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        config.amount_mode,
        history.clone(),
    ));
    let transactions = Arc::new(TransactionService::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        config.amount_mode,
        history,
    ));
    let reset = Arc::new(ResetService::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        config.amount_mode,
    ));
    let scheduler =
        reset_scheduler(reset, config.request_timeout).spawn(clock, config.scheduler_tick)?;

    let state = AppState {
        store: Arc::clone(&store),
        ledger,
        transactions,
        request_timeout: config.request_timeout,
    };
    let app = routes::app().with_state(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!(
        "event=server_start module=http status=ok addr={} db_path={} amount_mode={}",
        listener.local_addr()?,
        config.db_path.display(),
        config.amount_mode.as_str()
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("event=server_stop module=http status=ok");

    let grace = config.shutdown_grace;
    tokio::task::spawn_blocking(move || {
        scheduler.shutdown();
        worker.shutdown();
        if !store.close(grace) {
            warn!("event=shutdown module=server status=error error_code=store_not_closed");
        }
    })
    .await?;

    info!("event=shutdown module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("event=signal module=server status=error signal=ctrl_c error={err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("event=signal module=server status=error signal=sigterm error={err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("event=shutdown module=server status=start");
}
