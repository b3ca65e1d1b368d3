//! MongoDB-backed plan and usage stores.

use super::{PlanStore, PlanUpdate, UsageStore};
use crate::error::AppError;
use crate::models::{DailyUsage, UserPlanRecord};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument, UpdateOptions},
    Collection, Database, IndexModel,
};

/// Mongo-backed implementation of both store traits.
#[derive(Clone)]
pub struct MongoStores {
    db: Database,
}

impl MongoStores {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn init_indexes(&self) -> Result<(), AppError> {
        // One counter per (user, day); the unique index is what makes the
        // $inc upsert safe under concurrent recordings.
        let user_day_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "date_key": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_day_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.usage()
            .create_index(user_day_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create user_day index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        Ok(())
    }

    fn plans(&self) -> Collection<UserPlanRecord> {
        self.db.collection("user_plans")
    }

    fn usage(&self) -> Collection<DailyUsage> {
        self.db.collection("daily_usage")
    }
}

#[async_trait]
impl PlanStore for MongoStores {
    async fn get(&self, user_id: &str) -> Result<UserPlanRecord, AppError> {
        let now = BsonDateTime::now();

        // $setOnInsert + upsert keeps lazy creation idempotent when two
        // requests race on a user's first access.
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let record = self
            .plans()
            .find_one_and_update(
                doc! { "_id": user_id },
                doc! {
                    "$setOnInsert": {
                        "plan": "free",
                        "created_at": now,
                        "updated_at": now,
                    }
                },
                options,
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to load plan record: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        record.ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("upsert returned no plan record"))
        })
    }

    async fn update(&self, user_id: &str, update: PlanUpdate) -> Result<(), AppError> {
        let now = BsonDateTime::now();

        let mut set = doc! {
            "plan": update.plan.as_str(),
            "updated_at": now,
        };
        if let Some(customer_id) = update.stripe_customer_id {
            set.insert("stripe_customer_id", customer_id);
        }
        if let Some(subscription_id) = update.stripe_subscription_id {
            set.insert("stripe_subscription_id", subscription_id);
        }
        if let Some(status) = update.subscription_status {
            let status = mongodb::bson::to_bson(&status).map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
            set.insert("subscription_status", status);
        }

        self.plans()
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$set": set,
                    "$setOnInsert": { "created_at": now },
                },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to update plan record: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        Ok(())
    }
}

#[async_trait]
impl UsageStore for MongoStores {
    async fn sum_since(&self, user_id: &str, from_key: &str) -> Result<i64, AppError> {
        let pipeline = vec![
            doc! { "$match": { "user_id": user_id, "date_key": { "$gte": from_key } } },
            doc! { "$group": { "_id": null, "total": { "$sum": "$tokens" } } },
        ];

        let mut cursor = self.usage().aggregate(pipeline, None).await.map_err(|e| {
            tracing::error!("Failed to aggregate usage: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;

        let total = match cursor.try_next().await.map_err(|e| {
            tracing::error!("Failed to read usage aggregation: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })? {
            Some(document) => bson_total(&document),
            None => 0,
        };

        Ok(total)
    }

    async fn increment(&self, user_id: &str, date_key: &str, tokens: i64) -> Result<(), AppError> {
        // Single atomic $inc, never read-modify-write: concurrent
        // recordings for the same day must commute.
        self.usage()
            .update_one(
                doc! { "user_id": user_id, "date_key": date_key },
                doc! {
                    "$inc": { "tokens": tokens },
                    "$set": { "updated_at": BsonDateTime::now() },
                },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to increment usage counter: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        Ok(())
    }

    async fn delete_before(&self, user_id: &str, cutoff_key: &str) -> Result<u64, AppError> {
        let result = self
            .usage()
            .delete_many(
                doc! { "user_id": user_id, "date_key": { "$lt": cutoff_key } },
                None,
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to prune usage entries: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        Ok(result.deleted_count)
    }
}

/// `$sum` yields int32, int64, or double depending on the stored values.
fn bson_total(document: &Document) -> i64 {
    match document.get("total") {
        Some(Bson::Int64(n)) => *n,
        Some(Bson::Int32(n)) => *n as i64,
        Some(Bson::Double(n)) => *n as i64,
        _ => 0,
    }
}
