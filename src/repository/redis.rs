//! List-per-key variant: `rate:{assetId}` holds a JSON-encoded point per
//! list entry, trimmed to the retention window on every write.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Mutex;

use super::{RateRepository, RepositoryError};
use crate::core::RatePoint;
use crate::util::now_epoch_seconds;

/// Wraps a `redis::aio::MultiplexedConnection`.
///
/// The connection is held behind a `Mutex<Option<_>>` rather than stored
/// bare: the crate has no explicit "close" call, a connection's background
/// task simply ends when its last clone is dropped, so `close` takes the
/// connection out and drops it.
pub struct RedisRateRepository {
    conn: Mutex<Option<MultiplexedConnection>>,
    /// List length cap applied on every `insert_many`, in points. Kept as
    /// the same value as the history query window (spec leaves the two
    /// unsplit; see design notes).
    retention: i64,
}

impl RedisRateRepository {
    /// Build a repository over an already-connected multiplexed connection.
    #[must_use]
    pub fn new(conn: MultiplexedConnection, retention: i64) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            retention,
        }
    }

    fn key(asset_id: u32) -> String {
        format!("rate:{asset_id}")
    }

    async fn connection(&self) -> Result<MultiplexedConnection, RepositoryError> {
        self.conn.lock().await.clone().ok_or(RepositoryError::Closed)
    }
}

#[async_trait]
impl RateRepository for RedisRateRepository {
    async fn initialize(&self) -> Result<(), RepositoryError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn history(&self, asset_id: u32, period_secs: i64) -> Result<Vec<RatePoint>, RepositoryError> {
        let cutoff = now_epoch_seconds() - period_secs;
        let mut conn = self.connection().await?;
        let raw: Vec<String> = conn.lrange(Self::key(asset_id), 0, -1).await?;
        let mut points = Vec::with_capacity(raw.len());
        for item in raw {
            let point: RatePoint = serde_json::from_str(&item)?;
            if point.time >= cutoff {
                points.push(point);
            }
        }
        Ok(points)
    }

    async fn insert_many(&self, points: &[RatePoint]) -> Result<(), RepositoryError> {
        if points.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for point in points {
            let key = Self::key(point.asset_id);
            let json = serde_json::to_string(point)?;
            pipe.rpush(&key, json).ignore();
            pipe.ltrim(&key, -self.retention, -1).ignore();
        }
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn close(&self) {
        self.conn.lock().await.take();
    }
}
