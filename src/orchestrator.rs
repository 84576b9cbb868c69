//! C7 Orchestrator: boot sequence, accept loop, and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::{Config, DbBackend};
use crate::pool::{WorkerPool, WorkerPoolConfig};
use crate::poller::Poller;
use crate::repository::mongo::MongoRateRepository;
use crate::repository::redis::RedisRateRepository;
use crate::repository::RateRepository;
use crate::service::RateService;

/// Load configuration, wire every component together, and run until a
/// shutdown signal arrives or the service loop exits on its own.
///
/// # Errors
/// Returns an error if configuration fails to validate or a backend
/// connection/initialization fails at startup. Steady-state repository and
/// delivery errors are absorbed by their respective worker pools and never
/// reach this function.
pub async fn run() -> anyhow::Result<()> {
    crate::util::init_tracing();

    let config = Config::load()?;
    config.validate()?;
    info!(host = %config.host, port = config.port, db = ?config.db, "starting rate fan-out server");

    let repository = build_repository(&config).await?;
    repository.initialize().await?;
    let repository_handle = Arc::clone(&repository);

    let notifier_pool = Arc::new(WorkerPool::start(WorkerPoolConfig {
        name: "notifier",
        concurrency: config.notifier_worker_concurrency,
        queue_size: 1024,
        timeout: Some(Duration::from_secs(5)),
    }));
    let db_pool = Arc::new(WorkerPool::start(WorkerPoolConfig {
        name: "db",
        concurrency: config.db_worker_concurrency,
        queue_size: 1024,
        // Matches the original's `timeout=None`: an insert is awaited to
        // completion, never force-cancelled.
        timeout: None,
    }));

    let symbols = crate::core::SymbolTable::new(config.available_symbols.clone());
    let service = Arc::new(RateService::new(
        repository,
        Arc::clone(&notifier_pool),
        Arc::clone(&db_pool),
        symbols,
        config.history_period_secs,
    ));

    let poller = Poller::new(config.parser_interval, config.parser_timeout);
    let batches = poller.spawn();

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(addr = %listener.local_addr()?, "listening");

    // Connection-handler tasks are tracked here, outside the `select!`,
    // so they can still be drained after accept_loop is cancelled.
    let mut connections = JoinSet::new();

    let service_loop = Arc::clone(&service);
    tokio::select! {
        () = service_loop.start(batches) => {
            info!("service loop exited on its own");
        }
        () = accept_loop(listener, Arc::clone(&service), &mut connections) => {
            info!("accept loop exited on its own");
        }
        () = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    info!("draining in-flight connections");
    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(remaining = connections.len(), "timed out draining connections, abandoning the rest");
    }

    info!("stopping worker pools");
    notifier_pool.stop().await;
    db_pool.stop().await;

    info!("closing repository");
    repository_handle.close().await;

    info!("app stopped");
    Ok(())
}

async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn RateRepository>> {
    match config.db {
        DbBackend::Mongo => {
            info!("using mongo as db");
            let client = mongodb::Client::with_uri_str(&config.mongo_uri).await?;
            let db = client.database("rate_db");
            Ok(Arc::new(MongoRateRepository::new(&db)))
        }
        DbBackend::Redis => {
            info!("using redis as db");
            let redis_url = format!("redis://{}:{}", config.redis_host, config.redis_port);
            let client = redis::Client::open(redis_url)?;
            let conn = client.get_multiplexed_tokio_connection().await?;
            Ok(Arc::new(RedisRateRepository::new(conn, config.history_period_secs)))
        }
    }
}

async fn accept_loop(listener: TcpListener, service: Arc<RateService>, connections: &mut JoinSet<()>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let service = Arc::clone(&service);
                connections.spawn(async move {
                    crate::connection::handle_connection(stream, peer_addr, service).await;
                });
            }
            Err(err) => {
                error!(%err, "failed to accept connection");
            }
        }
    }
}

/// Resolves once either `ctrl_c` or `SIGTERM` (unix only) is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut sigterm) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
