//! Article document schema
//!
//! `user_id` is the owning user and drives the permission policy for
//! edits and deletes.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{rfc3339, Metadata};
use crate::db::store::Record;

pub const ARTICLE_COLLECTION: &str = "articles";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ArticleDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    pub content: String,

    /// Cover image reference
    #[serde(default)]
    pub img: String,

    pub category_id: String,

    /// Owning user
    pub user_id: String,
}

impl ArticleDoc {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        img: impl Into<String>,
        category_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            title: title.into(),
            content: content.into(),
            img: img.into(),
            category_id: category_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn view(&self) -> ArticleView {
        ArticleView {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            img: self.img.clone(),
            category_id: self.category_id.clone(),
            user_id: self.user_id.clone(),
            created_at: rfc3339(self.metadata.created_at),
            updated_at: rfc3339(self.metadata.updated_at),
        }
    }
}

impl IntoIndexes for ArticleDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "category_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("category_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ArticleDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Record for ArticleDoc {
    const COLLECTION: &'static str = ARTICLE_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ArticleView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub img: String,
    pub category_id: String,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}
