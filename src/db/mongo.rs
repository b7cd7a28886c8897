//! MongoDB client and collection wrapper

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, ReturnDocument},
    Client, Collection, IndexModel,
};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::db::manager::{Connector, PoolSettings};
use crate::db::schemas::{now_millis, ArticleDoc, CategoryDoc, Metadata, UserDoc};
use crate::db::store::{Filter, Record, RecordStore};
use crate::types::{QuillError, Result};

const DUPLICATE_KEY: i32 = 11000;
const SELECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect with the given pool bounds and verify the server answers a ping
    pub async fn connect(uri: &str, db_name: &str, settings: &PoolSettings) -> Result<Self> {
        info!("Connecting to MongoDB database '{}'", db_name);

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| QuillError::Database(format!("Invalid MongoDB URI: {}", e)))?;
        apply_pool_settings(&mut options, settings);
        options.server_selection_timeout = Some(SELECTION_TIMEOUT);
        options.connect_timeout = Some(SELECTION_TIMEOUT);

        let client = Client::with_options(options)
            .map_err(|e| QuillError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        let mongo = Self {
            client,
            db_name: db_name.to_string(),
        };
        mongo.ping().await?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(mongo)
    }

    pub async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| QuillError::Database(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }

    /// Get a typed collection
    pub fn collection<T: Record>(&self) -> MongoCollection<T> {
        MongoCollection {
            inner: self.client.database(&self.db_name).collection::<T>(T::COLLECTION),
        }
    }

    /// Create the collection for `T` if missing and apply its indexes
    pub async fn ensure_collection<T: Record>(&self) -> Result<()> {
        let db = self.client.database(&self.db_name);
        let existing = db.list_collection_names().await?;

        if !existing.iter().any(|name| name == T::COLLECTION) {
            db.create_collection(T::COLLECTION).await?;
            info!(collection = T::COLLECTION, "Created collection");
        }

        self.collection::<T>().apply_indexes().await
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Send + Sync,
{
    inner: Collection<T>,
}

impl<T: Record> MongoCollection<T> {
    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| QuillError::Database(format!("Failed to create indexes: {}", e)))?;

        debug!(collection = T::COLLECTION, "Indexes applied");
        Ok(())
    }

    fn live(mut filter: Document) -> Document {
        filter.insert("metadata.is_deleted", doc! { "$ne": true });
        filter
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for MongoCollection<T> {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        Ok(self.inner.find_one(Self::live(doc! { "_id": id })).await?)
    }

    async fn find_by_field(&self, field: &str, value: &Value) -> Result<Option<T>> {
        let filter = Self::live(doc! { field: to_bson(value)? });
        Ok(self.inner.find_one(filter).await?)
    }

    async fn exists(&self, field: &str, value: &Value, excluding_id: Option<&str>) -> Result<bool> {
        let mut filter = Self::live(doc! { field: to_bson(value)? });
        if let Some(id) = excluding_id {
            filter.insert("_id", doc! { "$ne": id });
        }
        Ok(self.inner.count_documents(filter).limit(1).await? > 0)
    }

    async fn create(&self, mut record: T) -> Result<T> {
        *record.mut_metadata() = Metadata::new();

        self.inner.insert_one(&record).await.map_err(map_write_error)?;
        Ok(record)
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<Option<T>> {
        let mut set = bson::to_document(&fields)?;
        set.insert("metadata.updated_at", now_millis());

        self.inner
            .find_one_and_update(Self::live(doc! { "_id": id }), doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_write_error)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let now = now_millis();
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": now,
                "metadata.updated_at": now,
            }
        };

        let result = self.inner.update_one(Self::live(doc! { "_id": id }), update).await?;
        Ok(result.matched_count > 0)
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        Ok(self.inner.count_documents(filter_document(filter)?).await?)
    }

    async fn paginate(&self, filter: &Filter, limit: u64, offset: u64) -> Result<Vec<T>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let cursor = self
            .inner
            .find(filter_document(filter)?)
            .sort(doc! { "metadata.created_at": 1, "_id": 1 })
            .skip(offset)
            .limit(limit)
            .await?;

        Ok(cursor.try_collect().await?)
    }
}

/// Connector for a MongoDB deployment
#[derive(Debug, Clone)]
pub struct MongoConnector {
    uri: String,
    db_name: String,
}

impl MongoConnector {
    pub fn new(uri: impl Into<String>, db_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            db_name: db_name.into(),
        }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Conn = MongoClient;

    async fn connect(&self, settings: &PoolSettings) -> Result<MongoClient> {
        MongoClient::connect(&self.uri, &self.db_name, settings).await
    }

    async fn reconcile_schema(&self, conn: &MongoClient) -> Result<()> {
        conn.ensure_collection::<UserDoc>().await?;
        conn.ensure_collection::<CategoryDoc>().await?;
        conn.ensure_collection::<ArticleDoc>().await?;
        Ok(())
    }

    async fn ping(&self, conn: &MongoClient) -> Result<()> {
        conn.ping().await
    }
}

/// Map pool bounds onto driver options
///
/// The driver has no idle-connection ceiling and no maximum connection
/// lifetime. `max_idle_conns` is not applied (`min_pool_size` is a floor, not
/// a ceiling) and the lifetime bound becomes the maximum idle time.
fn apply_pool_settings(options: &mut ClientOptions, settings: &PoolSettings) {
    options.max_pool_size = Some(settings.max_open_conns);
    options.max_idle_time = Some(settings.conn_max_lifetime);
    debug!(
        max_idle_conns = settings.max_idle_conns,
        "MongoDB driver has no idle-connection ceiling; max idle setting not applied"
    );
}

/// Live-record query document for a [`Filter`]
pub fn filter_document(filter: &Filter) -> Result<Document> {
    let mut document = Document::new();
    for (field, value) in &filter.eq {
        document.insert(field.as_str(), to_bson(value)?);
    }
    if let Some((field, needle)) = &filter.contains {
        document.insert(
            field.as_str(),
            doc! { "$regex": regex::escape(needle), "$options": "i" },
        );
    }
    document.insert("metadata.is_deleted", doc! { "$ne": true });
    Ok(document)
}

fn to_bson(value: &Value) -> Result<Bson> {
    Ok(bson::to_bson(value)?)
}

fn map_write_error(err: mongodb::error::Error) -> QuillError {
    match duplicate_field(&err) {
        Some(field) => QuillError::Duplicate(field),
        None => err.into(),
    }
}

/// Field behind a duplicate-key error, from the `{field}_unique` index name
fn duplicate_field(err: &mongodb::error::Error) -> Option<String> {
    let message = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => &e.message,
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY => &e.message,
        _ => return None,
    };
    parse_duplicate_index(message)
}

fn parse_duplicate_index(message: &str) -> Option<String> {
    let index = message.split("index: ").nth(1)?.split_whitespace().next()?;
    Some(index.strip_suffix("_unique").unwrap_or(index).to_string())
}
