//! Category document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{rfc3339, Metadata};
use crate::db::store::Record;

pub const CATEGORY_COLLECTION: &str = "categories";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CategoryDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,
}

impl CategoryDoc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            name: name.into(),
        }
    }

    pub fn view(&self) -> CategoryView {
        CategoryView {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: rfc3339(self.metadata.created_at),
        }
    }
}

impl IntoIndexes for CategoryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("name_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CategoryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Record for CategoryDoc {
    const COLLECTION: &'static str = CATEGORY_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub created_at: String,
}
