//! User document schema
//!
//! Stores credentials, role, and profile fields. The password hash never
//! leaves this type; responses use [`UserView`].

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{rfc3339, Metadata};
use crate::db::store::Record;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: String,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub username: String,

    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    #[serde(default)]
    pub role: Role,

    /// Whether the user account is active
    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub avatar_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new active user document with a fresh identifier
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: String,
        role: Role,
    ) -> Self {
        let username = username.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: Metadata::new(),
            display_name: username.clone(),
            username,
            email: email.into(),
            password_hash,
            role,
            is_active: true,
            bio: String::new(),
            avatar_url: String::new(),
            last_login: None,
        }
    }

    pub fn view(&self) -> UserView {
        UserView::from(self)
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Record for UserDoc {
    const COLLECTION: &'static str = USER_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Public representation of a user
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserDoc> for UserView {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            last_login: user.last_login.map(rfc3339),
            created_at: rfc3339(user.metadata.created_at),
            updated_at: rfc3339(user.metadata.updated_at),
        }
    }
}
