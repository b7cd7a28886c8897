//! Persistence layer
//!
//! - `manager`: connection lifecycle with retry and health monitoring
//! - `mongo`: MongoDB backend
//! - `store`: the record store trait and the in-memory backend
//! - `schemas`: document types

pub mod manager;
pub mod mongo;
pub mod schemas;
pub mod store;

use std::sync::Arc;

pub use manager::{
    ConnectionManager, Connector, HealthProbe, PoolSettings, RetryPolicy, HEALTH_CHECK_INTERVAL,
};
pub use mongo::{MongoClient, MongoCollection, MongoConnector};
pub use store::{Filter, MemoryConnector, MemoryStore, Record, RecordStore};

use schemas::{ArticleDoc, CategoryDoc, UserDoc};

/// One store per collection, shared by the services
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn RecordStore<UserDoc>>,
    pub categories: Arc<dyn RecordStore<CategoryDoc>>,
    pub articles: Arc<dyn RecordStore<ArticleDoc>>,
}

impl Stores {
    /// Stores backed by the collections of a connected MongoDB client
    pub fn mongo(client: &MongoClient) -> Self {
        Self {
            users: Arc::new(client.collection::<UserDoc>()),
            categories: Arc::new(client.collection::<CategoryDoc>()),
            articles: Arc::new(client.collection::<ArticleDoc>()),
        }
    }
}
