//! Record store abstraction
//!
//! Services talk to [`RecordStore`] only. Two backends implement it: the
//! MongoDB collection wrapper in `db::mongo` and [`MemoryStore`] below, used
//! for `STORE=memory` and the test suites.
//!
//! Soft-deleted records are invisible to every read, but still hold their
//! unique values, matching the unique indexes on the MongoDB side.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::manager::{Connector, PoolSettings};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{now_millis, Metadata};
use crate::db::Stores;
use crate::types::{QuillError, Result};

/// A document type the store can persist
pub trait Record:
    Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + IntoIndexes + MutMetadata + 'static
{
    /// Collection (table) name
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn metadata(&self) -> &Metadata;
}

/// Field names covered by a unique index on `T`
pub fn unique_fields<T: IntoIndexes>() -> Vec<String> {
    T::into_indices()
        .into_iter()
        .filter(|(_, opts)| opts.as_ref().and_then(|o| o.unique) == Some(true))
        .filter_map(|(keys, _)| keys.keys().next().cloned())
        .collect()
}

/// Query over live records: equality on fields plus an optional
/// case-insensitive substring match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub eq: Vec<(String, Value)>,
    pub contains: Option<(String, String)>,
}

impl Filter {
    /// Matches every live record
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.eq.push((field.into(), value.into()));
        self
    }

    pub fn contains(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.contains = Some((field.into(), needle.into()));
        self
    }
}

/// Storage capability consumed by the services
///
/// Lookups return `Ok(None)` for a missing (or soft-deleted) record; callers
/// decide whether that is an error.
#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;

    async fn find_by_field(&self, field: &str, value: &Value) -> Result<Option<T>>;

    /// Whether a live record other than `excluding_id` has `field == value`
    async fn exists(&self, field: &str, value: &Value, excluding_id: Option<&str>) -> Result<bool>;

    /// Insert a record, resetting its metadata timestamps
    ///
    /// Fails with [`QuillError::Duplicate`] on a unique field collision.
    async fn create(&self, record: T) -> Result<T>;

    /// Set top-level `fields` on a live record and bump `updated_at`
    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<Option<T>>;

    /// Soft delete; returns false if no live record has this id
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// Live records matching `filter` in creation order
    async fn paginate(&self, filter: &Filter, limit: u64, offset: u64) -> Result<Vec<T>>;
}

/// In-process record store
pub struct MemoryStore<T> {
    records: RwLock<Vec<T>>,
    unique: Vec<String>,
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            unique: unique_fields::<T>(),
        }
    }

    fn check_unique(&self, records: &[T], candidate: &Value, id: &str) -> Result<()> {
        for field in &self.unique {
            let Some(wanted) = lookup(candidate, field) else {
                continue;
            };
            for other in records.iter().filter(|r| r.id() != id) {
                let other = to_value(other)?;
                if lookup(&other, field) == Some(wanted) {
                    return Err(QuillError::Duplicate(field.clone()));
                }
            }
        }
        Ok(())
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for MemoryStore<T> {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| is_live(*r) && r.id() == id).cloned())
    }

    async fn find_by_field(&self, field: &str, value: &Value) -> Result<Option<T>> {
        let records = self.records.read().await;
        for record in records.iter().filter(|r| is_live(*r)) {
            if lookup(&to_value(record)?, field) == Some(value) {
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }

    async fn exists(&self, field: &str, value: &Value, excluding_id: Option<&str>) -> Result<bool> {
        let records = self.records.read().await;
        for record in records.iter().filter(|r| is_live(*r)) {
            if Some(record.id()) == excluding_id {
                continue;
            }
            if lookup(&to_value(record)?, field) == Some(value) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn create(&self, mut record: T) -> Result<T> {
        *record.mut_metadata() = Metadata::new();

        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(QuillError::Duplicate("_id".into()));
        }
        self.check_unique(&records, &to_value(&record)?, record.id())?;

        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<Option<T>> {
        let mut records = self.records.write().await;
        let Some(pos) = records.iter().position(|r| is_live(r) && r.id() == id) else {
            return Ok(None);
        };

        let mut value = to_value(&records[pos])?;
        if let Value::Object(obj) = &mut value {
            obj.extend(fields);
        }
        let mut updated: T = serde_json::from_value(value)
            .map_err(|e| QuillError::Internal(format!("Invalid update for {}: {}", T::COLLECTION, e)))?;
        updated.mut_metadata().updated_at = now_millis();

        self.check_unique(&records, &to_value(&updated)?, id)?;
        records[pos] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| is_live(&**r) && r.id() == id) {
            Some(record) => {
                record.mut_metadata().mark_deleted(now_millis());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let records = self.records.read().await;
        let mut total = 0;
        for record in records.iter().filter(|r| is_live(*r)) {
            if matches(&to_value(record)?, filter) {
                total += 1;
            }
        }
        Ok(total)
    }

    async fn paginate(&self, filter: &Filter, limit: u64, offset: u64) -> Result<Vec<T>> {
        let records = self.records.read().await;
        let mut page = Vec::new();
        let mut skipped = 0;
        for record in records.iter().filter(|r| is_live(*r)) {
            if page.len() as u64 >= limit {
                break;
            }
            if !matches(&to_value(record)?, filter) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            page.push(record.clone());
        }
        Ok(page)
    }
}

/// Connector for the in-memory backend; always reachable
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryConnector;

#[async_trait]
impl Connector for MemoryConnector {
    type Conn = Stores;

    async fn connect(&self, _settings: &PoolSettings) -> Result<Stores> {
        Ok(Stores {
            users: Arc::new(MemoryStore::new()),
            categories: Arc::new(MemoryStore::new()),
            articles: Arc::new(MemoryStore::new()),
        })
    }

    async fn reconcile_schema(&self, _conn: &Stores) -> Result<()> {
        Ok(())
    }

    async fn ping(&self, _conn: &Stores) -> Result<()> {
        Ok(())
    }
}

fn is_live<T: Record>(record: &T) -> bool {
    !record.metadata().is_deleted
}

fn to_value<T: Serialize>(record: &T) -> Result<Value> {
    serde_json::to_value(record).map_err(|e| QuillError::Internal(format!("Serialization failed: {}", e)))
}

fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

fn matches(value: &Value, filter: &Filter) -> bool {
    let eq = filter
        .eq
        .iter()
        .all(|(field, wanted)| lookup(value, field) == Some(wanted));

    let contains = match &filter.contains {
        None => true,
        Some((field, needle)) => lookup(value, field)
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
    };

    eq && contains
}
