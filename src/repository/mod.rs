//! C1 Rate Repository: the pluggable retention store behind [`RateRepository`].
//!
//! Two variants ship, chosen at startup by [`crate::config::DbBackend`]:
//! [`mongo::MongoRateRepository`] (document store) and
//! [`redis::RedisRateRepository`] (list-per-key store). Both honor the same
//! bounded-retention contract: `history` never returns a point older than
//! the configured window, and `insert_many` never blocks the caller on
//! anything beyond the write itself (no compaction, no background GC).

pub mod mongo;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::RatePoint;

/// Errors a repository backend can produce.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The MongoDB driver returned an error.
    #[error("mongo error: {0}")]
    Mongo(#[from] ::mongodb::error::Error),
    /// The Redis client returned an error.
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    /// A stored point failed to decode (Redis variant only; Mongo decodes
    /// via the driver's own BSON mapping and surfaces failures as `Mongo`).
    #[error("stored point failed to decode: {0}")]
    Decode(#[from] serde_json::Error),
    /// An operation was attempted after `close` had already been called.
    #[error("repository has been closed")]
    Closed,
}

/// Bounded-retention store for derived rate points, keyed by asset id.
///
/// Implementations own their own notion of "bounded" (a compound index plus
/// a query-time cutoff for Mongo; an `LTRIM`-maintained list cap for Redis)
/// but must all honor the same external contract: `history` returns points
/// with `time >= now - period_secs`, ascending by `time`.
#[async_trait]
pub trait RateRepository: Send + Sync {
    /// One-time setup (index creation, connectivity check). Called once at
    /// startup; steady-state operations assume it has already succeeded.
    async fn initialize(&self) -> Result<(), RepositoryError>;

    /// Points for one asset no older than `period_secs` seconds, ascending
    /// by time.
    async fn history(&self, asset_id: u32, period_secs: i64) -> Result<Vec<RatePoint>, RepositoryError>;

    /// Persist a batch of points. No dedup; callers are expected to pass
    /// one batch per poll tick.
    async fn insert_many(&self, points: &[RatePoint]) -> Result<(), RepositoryError>;

    /// Release any resources the backend holds (connections, clients).
    ///
    /// Called once during graceful shutdown, after the DB pool has
    /// finished draining, so no further repository calls are in flight.
    /// The default does nothing; backends that own a releasable resource
    /// override it.
    async fn close(&self) {}
}
