//! Category catalogue

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::auth::{authorize, Action, Principal, Resource, ResourceKind};
use crate::db::schemas::{CategoryDoc, CategoryView};
use crate::db::{Filter, RecordStore};
use crate::services::{Page, Paged};
use crate::types::{QuillError, RespCode, Result};

pub struct CategoryService {
    categories: Arc<dyn RecordStore<CategoryDoc>>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn RecordStore<CategoryDoc>>) -> Self {
        Self { categories }
    }

    /// Add a category (admin only)
    pub async fn add(&self, principal: &Principal, name: &str) -> Result<CategoryView> {
        authorize(principal, Action::Create, Resource::unowned(ResourceKind::Category)).into_result()?;

        let name = name.trim();
        if name.is_empty() {
            return Err(QuillError::Rejected(RespCode::EmptyCategoryName));
        }
        if self.categories.exists("name", &json!(name), None).await? {
            return Err(QuillError::Rejected(RespCode::CategoryNameUsed));
        }

        let category = self
            .categories
            .create(CategoryDoc::new(name))
            .await
            .map_err(|e| match e {
                QuillError::Duplicate(_) => QuillError::Rejected(RespCode::CategoryNameUsed),
                other => other,
            })?;

        info!(category = %category.name, by = %principal.username, "Category created");
        Ok(category.view())
    }

    pub async fn get(&self, id: &str) -> Result<CategoryView> {
        Ok(self.require(id).await?.view())
    }

    pub async fn list(&self, page: Page) -> Result<Paged<CategoryView>> {
        let filter = Filter::all();
        let total = self.categories.count(&filter).await?;
        let items = self.categories.paginate(&filter, page.limit(), page.offset()).await?;
        Ok(Paged { items, total }.map(|c| c.view()))
    }

    /// Soft delete a category (admin only)
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        authorize(principal, Action::Delete, Resource::unowned(ResourceKind::Category)).into_result()?;

        if !self.categories.delete(id).await? {
            return Err(QuillError::Rejected(RespCode::CategoryNotExist));
        }
        info!(category_id = %id, by = %principal.username, "Category deleted");
        Ok(())
    }

    /// Load a live category or reject with `CategoryNotExist`
    pub async fn require(&self, id: &str) -> Result<CategoryDoc> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or(QuillError::Rejected(RespCode::CategoryNotExist))
    }
}
