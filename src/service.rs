//! C4 Rate Service: turns poll batches into [`RatePoint`]s, persists them,
//! and fans each one out to whichever subscriber wants that asset.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::core::{RatePoint, SymbolEntry, SymbolTable};
use crate::pool::WorkerPool;
use crate::repository::RateRepository;
use crate::util::now_epoch_seconds;
use crate::wire::UpstreamQuote;

type SubscriberId = String;

struct Subscriber {
    asset_id: u32,
    sender: mpsc::Sender<RatePoint>,
}

/// Coordinates the poll-batch -> point -> (db, subscribers) pipeline.
pub struct RateService {
    repository: Arc<dyn RateRepository>,
    notifier_pool: Arc<WorkerPool>,
    db_pool: Arc<WorkerPool>,
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    symbols: SymbolTable,
    history_period_secs: i64,
}

impl RateService {
    /// Build a service over an already-initialized repository and started
    /// worker pools. Pools are `Arc`-shared with the orchestrator, which
    /// retains its own handle to stop them at shutdown.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RateRepository>,
        notifier_pool: Arc<WorkerPool>,
        db_pool: Arc<WorkerPool>,
        symbols: SymbolTable,
        history_period_secs: i64,
    ) -> Self {
        Self {
            repository,
            notifier_pool,
            db_pool,
            subscribers: Mutex::new(HashMap::new()),
            symbols,
            history_period_secs,
        }
    }

    /// Consume poll batches until the channel closes, deriving points,
    /// persisting them, and notifying subscribers for each tick.
    pub async fn start(&self, mut batches: mpsc::Receiver<Vec<UpstreamQuote>>) {
        while let Some(batch) = batches.recv().await {
            self.process_batch(batch).await;
        }
        info!("poll batch channel closed, service loop exiting");
    }

    async fn process_batch(&self, batch: Vec<UpstreamQuote>) {
        if batch.is_empty() {
            return;
        }
        // One timestamp for every point derived from this tick (I4/P7).
        let timestamp = now_epoch_seconds();
        let mut points = Vec::with_capacity(batch.len());
        for quote in batch {
            let Some(asset_id) = self.symbols.id_for_name(&quote.symbol) else {
                continue;
            };
            let point = RatePoint::from_quote(asset_id, quote.symbol, timestamp, quote.ask, quote.bid);
            self.notify_subscribers(&point).await;
            points.push(point);
        }
        if points.is_empty() {
            return;
        }
        debug!(count = points.len(), "persisting batch");
        let repository = Arc::clone(&self.repository);
        let job: crate::pool::BoxedJob = Box::pin(async move {
            if let Err(err) = repository.insert_many(&points).await {
                error!(%err, "failed to persist batch");
            }
        });
        if let Err(err) = self.db_pool.submit(job) {
            error!(%err, "db pool rejected batch");
        }
    }

    async fn notify_subscribers(&self, point: &RatePoint) {
        // Snapshot under the lock, dispatch outside it: a slow or dropped
        // subscriber must never hold up admission of new subscribers.
        let targets: Vec<mpsc::Sender<RatePoint>> = {
            let subscribers = self.subscribers.lock().await;
            subscribers
                .values()
                .filter(|s| s.asset_id == point.asset_id)
                .map(|s| s.sender.clone())
                .collect()
        };
        for sender in targets {
            let point = point.clone();
            let job: crate::pool::BoxedJob = Box::pin(async move {
                let _ = sender.send(point).await;
            });
            if let Err(err) = self.notifier_pool.submit(job) {
                error!(%err, "notifier pool rejected delivery");
            }
        }
    }

    /// Subscribe `subscriber_id` to live updates for `asset_id`, replacing
    /// any prior subscription it held. Returns `false` (no-op beyond the
    /// implicit unsubscribe) if `asset_id` isn't in the symbol table.
    pub async fn subscribe(&self, subscriber_id: &str, asset_id: u32, sender: mpsc::Sender<RatePoint>) -> bool {
        self.unsubscribe(subscriber_id).await;
        if !self.symbols.contains_id(asset_id) {
            return false;
        }
        self.subscribers.lock().await.insert(
            subscriber_id.to_string(),
            Subscriber { asset_id, sender },
        );
        info!(subscriber_id, asset_id, "new subscriber");
        true
    }

    /// Remove a subscription, if one exists. Safe to call for an id that
    /// was never subscribed.
    pub async fn unsubscribe(&self, subscriber_id: &str) {
        if self.subscribers.lock().await.remove(subscriber_id).is_some() {
            info!(subscriber_id, "unsubscribed");
        }
    }

    /// Retention-window history for one asset, ascending by time. Returns
    /// an empty history, not an error, for an `asset_id` outside the symbol
    /// table — callers that need to distinguish "unknown asset" from
    /// "known asset, no history yet" should check [`Self::is_known_asset`]
    /// first.
    pub async fn history(&self, asset_id: u32) -> Result<Vec<RatePoint>, crate::repository::RepositoryError> {
        if !self.symbols.contains_id(asset_id) {
            return Ok(Vec::new());
        }
        self.repository.history(asset_id, self.history_period_secs).await
    }

    /// Whether `asset_id` is one of the admitted symbols.
    #[must_use]
    pub fn is_known_asset(&self, asset_id: u32) -> bool {
        self.symbols.contains_id(asset_id)
    }

    /// The static symbol table, for an `"assets"` reply.
    #[must_use]
    pub fn symbols(&self) -> Vec<SymbolEntry> {
        self.symbols.entries().to_vec()
    }
}
