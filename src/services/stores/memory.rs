//! In-memory store implementations for testing.

use super::{PlanStore, PlanUpdate, UsageStore};
use crate::error::AppError;
use crate::models::UserPlanRecord;
use async_trait::async_trait;
use mongodb::bson::DateTime as BsonDateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory plan store for testing.
#[derive(Default)]
pub struct MemoryPlanStore {
    records: Mutex<HashMap<String, UserPlanRecord>>,
    failing: AtomicBool,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail, to exercise degraded paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Seed a record directly, bypassing merge semantics.
    pub fn insert(&self, record: UserPlanRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.user_id.clone(), record);
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn get(&self, user_id: &str) -> Result<UserPlanRecord, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "memory plan store failing"
            )));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(user_id.to_string())
            .or_insert_with(|| UserPlanRecord::new_free(user_id));
        Ok(record.clone())
    }

    async fn update(&self, user_id: &str, update: PlanUpdate) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "memory plan store failing"
            )));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(user_id.to_string())
            .or_insert_with(|| UserPlanRecord::new_free(user_id));

        record.plan = update.plan;
        if let Some(customer_id) = update.stripe_customer_id {
            record.stripe_customer_id = Some(customer_id);
        }
        if let Some(subscription_id) = update.stripe_subscription_id {
            record.stripe_subscription_id = Some(subscription_id);
        }
        if let Some(status) = update.subscription_status {
            record.subscription_status = Some(status);
        }
        record.updated_at = BsonDateTime::now();

        Ok(())
    }
}

/// In-memory usage store for testing.
#[derive(Default)]
pub struct MemoryUsageStore {
    entries: Mutex<HashMap<(String, String), i64>>,
    failing: AtomicBool,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail, to exercise fail-open behavior.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entry(&self, user_id: &str, date_key: &str) -> Option<i64> {
        self.entries
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), date_key.to_string()))
            .copied()
    }

    pub fn entry_count(&self, user_id: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .keys()
            .filter(|(uid, _)| uid == user_id)
            .count()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn sum_since(&self, user_id: &str, from_key: &str) -> Result<i64, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "memory usage store failing"
            )));
        }

        let entries = self.entries.lock().unwrap();
        let total = entries
            .iter()
            .filter(|((uid, key), _)| uid == user_id && key.as_str() >= from_key)
            .map(|(_, tokens)| tokens)
            .sum();
        Ok(total)
    }

    async fn increment(&self, user_id: &str, date_key: &str, tokens: i64) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "memory usage store failing"
            )));
        }

        let mut entries = self.entries.lock().unwrap();
        *entries
            .entry((user_id.to_string(), date_key.to_string()))
            .or_insert(0) += tokens;
        Ok(())
    }

    async fn delete_before(&self, user_id: &str, cutoff_key: &str) -> Result<u64, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "memory usage store failing"
            )));
        }

        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|(uid, key), _| uid != user_id || key.as_str() >= cutoff_key);
        Ok((before - entries.len()) as u64)
    }
}
