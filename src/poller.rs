//! C3 Poller: periodically fetches the upstream quote feed and republishes
//! each tick's batch on a bounded channel.
//!
//! The original implementation streams batches from an `async def` generator;
//! Rust has no equivalent, so this is modeled the way spec.md §9 suggests for
//! such targets — one background task drives a bounded channel of batches,
//! and callers consume it like a stream via [`tokio::sync::mpsc::Receiver`].
//! The channel capacity is 1: a consumer slower than the poll cadence simply
//! sees the newest batch once it catches up, rather than the poller
//! building up backlog.

use std::time::Duration;

use tracing::{error, warn};

use crate::wire::{self, UpstreamQuote};

const UPSTREAM_URL: &str = "https://rates.emcont.com/";

/// Periodically fetches `UPSTREAM_URL` and yields one quote batch per tick.
pub struct Poller {
    client: reqwest::Client,
    interval: Duration,
}

impl Poller {
    /// Build a poller with the given poll cadence and per-fetch timeout.
    ///
    /// # Panics
    /// Panics if the underlying `reqwest::Client` fails to build, which
    /// only happens on a misconfigured TLS backend.
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builds with default TLS backend");
        Self { client, interval }
    }

    /// Spawn the background fetch loop, returning a channel that yields one
    /// `Vec<UpstreamQuote>` per tick. An empty vector means the tick's fetch
    /// failed; the poller logs the error and keeps polling rather than
    /// stopping.
    #[must_use]
    pub fn spawn(self) -> tokio::sync::mpsc::Receiver<Vec<UpstreamQuote>> {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        tokio::spawn(async move {
            loop {
                let start = tokio::time::Instant::now();
                let batch = match self.fetch_once().await {
                    Ok(quotes) => quotes,
                    Err(err) => {
                        error!(%err, "error while fetching rates");
                        Vec::new()
                    }
                };
                if tx.send(batch).await.is_err() {
                    warn!("poller receiver dropped, stopping");
                    return;
                }
                let elapsed = start.elapsed();
                if let Some(delay) = self.interval.checked_sub(elapsed) {
                    tokio::time::sleep(delay).await;
                }
            }
        });
        rx
    }

    async fn fetch_once(&self) -> anyhow::Result<Vec<UpstreamQuote>> {
        let body = self.client.get(UPSTREAM_URL).send().await?.bytes().await?;
        let parsed = wire::parse_jsonp_response(&body)?;
        Ok(parsed.rates)
    }
}
