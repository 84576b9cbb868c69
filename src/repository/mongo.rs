//! Document-store variant: one `rates` collection, one document per point.

use bson::doc;
use futures_util::TryStreamExt;
use mongodb::{options::IndexOptions, Client, Collection, Database, IndexModel};

use async_trait::async_trait;

use super::{RateRepository, RepositoryError};
use crate::core::RatePoint;
use crate::util::now_epoch_seconds;

/// Wraps `rate_db.rates`.
pub struct MongoRateRepository {
    collection: Collection<RatePoint>,
    client: Client,
}

impl MongoRateRepository {
    /// Build a repository over the `rates` collection of `db`.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<RatePoint>("rates"),
            client: db.client().clone(),
        }
    }
}

#[async_trait]
impl RateRepository for MongoRateRepository {
    async fn initialize(&self) -> Result<(), RepositoryError> {
        let index = IndexModel::builder()
            .keys(doc! { "assetId": 1, "time": 1, "assetName": 1, "value": 1 })
            .options(IndexOptions::builder().build())
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }

    async fn history(&self, asset_id: u32, period_secs: i64) -> Result<Vec<RatePoint>, RepositoryError> {
        let cutoff = now_epoch_seconds() - period_secs;
        let filter = doc! { "assetId": i64::from(asset_id), "time": { "$gte": cutoff } };
        let cursor = self
            .collection
            .find(filter)
            .projection(doc! { "_id": false, "assetId": 1, "time": 1, "assetName": 1, "value": 1 })
            .sort(doc! { "time": 1 })
            .await?;
        let points: Vec<RatePoint> = cursor.try_collect().await?;
        Ok(points)
    }

    async fn insert_many(&self, points: &[RatePoint]) -> Result<(), RepositoryError> {
        if points.is_empty() {
            return Ok(());
        }
        self.collection.insert_many(points).await?;
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}
