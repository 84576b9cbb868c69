//! `RateService` behavior against a fake repository, real (but small)
//! worker pools, and a hand-fed batch channel instead of a live `Poller`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rate_fanout_server::core::{SymbolEntry, SymbolTable};
use rate_fanout_server::pool::{WorkerPool, WorkerPoolConfig};
use rate_fanout_server::repository::{RateRepository, RepositoryError};
use rate_fanout_server::service::RateService;
use rate_fanout_server::wire::UpstreamQuote;
use tokio::sync::Mutex;

#[derive(Default)]
struct FakeRepository {
    inserted: Mutex<Vec<RatePoint>>,
}

#[async_trait]
impl RateRepository for FakeRepository {
    async fn initialize(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn history(&self, _asset_id: u32, _period_secs: i64) -> Result<Vec<RatePoint>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn insert_many(&self, points: &[RatePoint]) -> Result<(), RepositoryError> {
        self.inserted.lock().await.extend_from_slice(points);
        Ok(())
    }
}

fn symbols() -> SymbolTable {
    SymbolTable::new(vec![
        SymbolEntry { id: 1, name: "EURUSD".into() },
        SymbolEntry { id: 2, name: "USDJPY".into() },
    ])
}

fn pool(name: &'static str) -> Arc<WorkerPool> {
    Arc::new(WorkerPool::start(WorkerPoolConfig {
        name,
        concurrency: 2,
        queue_size: 32,
        timeout: Some(Duration::from_secs(1)),
    }))
}

fn quote(symbol: &str, bid: f64, ask: f64) -> UpstreamQuote {
    // Construct via the wire format's own deserialization so the test
    // doesn't depend on `UpstreamQuote`'s field visibility.
    serde_json::from_value(serde_json::json!({
        "Symbol": symbol,
        "Bid": bid,
        "Ask": ask,
    }))
    .unwrap()
}

#[tokio::test]
async fn subscribing_to_unknown_asset_is_rejected() {
    let service = RateService::new(
        Arc::new(FakeRepository::default()),
        pool("notifier"),
        pool("db"),
        symbols(),
        1800,
    );
    let (tx, _rx) = tokio::sync::mpsc::channel(4);
    assert!(!service.subscribe("peer-1", 999, tx).await);
}

#[tokio::test]
async fn resubscribing_replaces_the_prior_subscription() {
    let service = Arc::new(RateService::new(
        Arc::new(FakeRepository::default()),
        pool("notifier"),
        pool("db"),
        symbols(),
        1800,
    ));
    let (batch_tx, batch_rx) = tokio::sync::mpsc::channel(1);
    let service_clone = Arc::clone(&service);
    let driver = tokio::spawn(async move { service_clone.start(batch_rx).await });

    let (tx1, mut rx1) = tokio::sync::mpsc::channel(4);
    let (tx2, mut rx2) = tokio::sync::mpsc::channel(4);
    assert!(service.subscribe("peer-1", 1, tx1).await);
    assert!(service.subscribe("peer-1", 2, tx2).await);

    batch_tx
        .send(vec![quote("EURUSD", 1.10, 1.20), quote("USDJPY", 149.0, 150.0)])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(rx1.try_recv().is_err(), "old subscription must no longer receive updates");
    assert!(rx2.try_recv().is_ok(), "new subscription must receive updates");

    drop(batch_tx);
    let _ = driver.await;
}

#[tokio::test]
async fn every_point_in_a_batch_shares_one_timestamp() {
    let service = Arc::new(RateService::new(
        Arc::new(FakeRepository::default()),
        pool("notifier"),
        pool("db"),
        symbols(),
        1800,
    ));
    let (batch_tx, batch_rx) = tokio::sync::mpsc::channel(1);
    let service_clone = Arc::clone(&service);
    let driver = tokio::spawn(async move { service_clone.start(batch_rx).await });

    batch_tx
        .send(vec![quote("EURUSD", 1.10, 1.20), quote("USDJPY", 149.0, 150.0)])
        .await
        .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::channel(4);
    service.subscribe("peer-1", 1, tx).await;
    let (tx2, mut rx2) = tokio::sync::mpsc::channel(4);
    service.subscribe("peer-2", 2, tx2).await;

    // Send a fresh batch now that subscribers are installed.
    batch_tx
        .send(vec![quote("EURUSD", 1.10, 1.20), quote("USDJPY", 149.0, 150.0)])
        .await
        .unwrap();

    let p1 = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    let p2 = tokio::time::timeout(Duration::from_secs(1), rx2.recv()).await.unwrap().unwrap();
    assert_eq!(p1.time, p2.time);

    drop(batch_tx);
    let _ = driver.await;
}
