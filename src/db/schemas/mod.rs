//! Database schemas for Quill
//!
//! Defines document structures for users, categories, and articles.

mod article;
mod category;
mod metadata;
mod user;

pub use article::{ArticleDoc, ArticleView, ARTICLE_COLLECTION};
pub use category::{CategoryDoc, CategoryView, CATEGORY_COLLECTION};
pub use metadata::{now_millis, rfc3339, Metadata};
pub use user::{UserDoc, UserView, USER_COLLECTION};
