//! Articles and their ownership
//!
//! Any principal may read. Edits and deletes go through the permission
//! policy with the article's `user_id` as owner.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::auth::{authorize, Action, Principal, Resource, ResourceKind};
use crate::db::schemas::{ArticleDoc, ArticleView, CategoryDoc, UserDoc};
use crate::db::{Filter, RecordStore};
use crate::services::{Page, Paged};
use crate::types::{QuillError, RespCode, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub img: String,
    #[serde(alias = "cid")]
    pub category_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub img: Option<String>,
    #[serde(alias = "cid")]
    pub category_id: Option<String>,
}

pub struct ArticleService {
    articles: Arc<dyn RecordStore<ArticleDoc>>,
    categories: Arc<dyn RecordStore<CategoryDoc>>,
    users: Arc<dyn RecordStore<UserDoc>>,
}

impl ArticleService {
    pub fn new(
        articles: Arc<dyn RecordStore<ArticleDoc>>,
        categories: Arc<dyn RecordStore<CategoryDoc>>,
        users: Arc<dyn RecordStore<UserDoc>>,
    ) -> Self {
        Self {
            articles,
            categories,
            users,
        }
    }

    /// Create an article owned by the caller
    pub async fn add(&self, principal: &Principal, input: NewArticle) -> Result<ArticleView> {
        if input.title.trim().is_empty() {
            return Err(QuillError::Rejected(RespCode::ArticleTitleEmpty));
        }
        if input.content.trim().is_empty() {
            return Err(QuillError::Rejected(RespCode::ArticleContentEmpty));
        }
        self.require_category(&input.category_id).await?;

        let article = ArticleDoc::new(
            input.title,
            input.content,
            input.img,
            input.category_id,
            principal.user_id.as_str(),
        );
        let article = self.articles.create(article).await?;

        info!(article_id = %article.id, by = %principal.username, "Article created");
        Ok(article.view())
    }

    pub async fn get(&self, id: &str) -> Result<ArticleView> {
        Ok(self.require(id).await?.view())
    }

    pub async fn list(&self, page: Page) -> Result<Paged<ArticleView>> {
        self.page(&Filter::all(), page).await
    }

    pub async fn list_by_category(&self, category_id: &str, page: Page) -> Result<Paged<ArticleView>> {
        self.require_category(category_id).await?;
        self.page(&Filter::all().eq("category_id", category_id), page).await
    }

    pub async fn list_by_user(&self, user_id: &str, page: Page) -> Result<Paged<ArticleView>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(QuillError::Rejected(RespCode::UserNotExist));
        }
        self.page(&Filter::all().eq("user_id", user_id), page).await
    }

    /// Case-insensitive title search
    pub async fn search(&self, keyword: &str, page: Page) -> Result<Paged<ArticleView>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(QuillError::BadRequest("keyword is required".into()));
        }
        self.page(&Filter::all().contains("title", keyword), page).await
    }

    /// Edit an article (owner or admin)
    pub async fn edit(&self, principal: &Principal, id: &str, update: ArticleUpdate) -> Result<ArticleView> {
        let article = self.require(id).await?;
        authorize(principal, Action::Edit, Resource::owned(ResourceKind::Article, &article.user_id))
            .into_result()?;

        let mut fields = Map::new();
        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(QuillError::Rejected(RespCode::ArticleTitleEmpty));
            }
            fields.insert("title".into(), Value::String(title));
        }
        if let Some(content) = update.content {
            if content.trim().is_empty() {
                return Err(QuillError::Rejected(RespCode::ArticleContentEmpty));
            }
            fields.insert("content".into(), Value::String(content));
        }
        if let Some(img) = update.img {
            fields.insert("img".into(), Value::String(img));
        }
        if let Some(category_id) = update.category_id {
            self.require_category(&category_id).await?;
            fields.insert("category_id".into(), Value::String(category_id));
        }

        let article = self
            .articles
            .update(id, fields)
            .await?
            .ok_or(QuillError::Rejected(RespCode::ArticleNotExist))?;

        info!(article_id = %id, by = %principal.username, "Article updated");
        Ok(article.view())
    }

    /// Soft delete an article (owner or admin)
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        let article = self.require(id).await?;
        authorize(principal, Action::Delete, Resource::owned(ResourceKind::Article, &article.user_id))
            .into_result()?;

        if !self.articles.delete(id).await? {
            return Err(QuillError::Rejected(RespCode::ArticleNotExist));
        }
        info!(article_id = %id, by = %principal.username, "Article deleted");
        Ok(())
    }

    async fn page(&self, filter: &Filter, page: Page) -> Result<Paged<ArticleView>> {
        let total = self.articles.count(filter).await?;
        let items = self.articles.paginate(filter, page.limit(), page.offset()).await?;
        Ok(Paged { items, total }.map(|a| a.view()))
    }

    async fn require(&self, id: &str) -> Result<ArticleDoc> {
        self.articles
            .find_by_id(id)
            .await?
            .ok_or(QuillError::Rejected(RespCode::ArticleNotExist))
    }

    async fn require_category(&self, id: &str) -> Result<()> {
        match self.categories.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(QuillError::Rejected(RespCode::CategoryNotExist)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::MemoryStore;

    struct Fixture {
        svc: ArticleService,
        category_id: String,
        alice: Principal,
        bob: Principal,
        admin: Principal,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(MemoryStore::<UserDoc>::new());
        let categories = Arc::new(MemoryStore::<CategoryDoc>::new());

        let mut principals = Vec::new();
        for (name, role) in [("alice", Role::Member), ("bob", Role::Member), ("root", Role::Admin)] {
            let user = users
                .create(UserDoc::new(name, format!("{name}@example.com"), "hash".into(), role))
                .await
                .unwrap();
            principals.push(Principal {
                user_id: user.id,
                username: user.username,
                role,
            });
        }
        let category = categories.create(CategoryDoc::new("Rust")).await.unwrap();

        let svc = ArticleService::new(Arc::new(MemoryStore::<ArticleDoc>::new()), categories, users);
        let admin = principals.pop().unwrap();
        let bob = principals.pop().unwrap();
        let alice = principals.pop().unwrap();
        Fixture {
            svc,
            category_id: category.id,
            alice,
            bob,
            admin,
        }
    }

    fn draft(title: &str, category_id: &str) -> NewArticle {
        NewArticle {
            title: title.into(),
            content: "body".into(),
            img: String::new(),
            category_id: category_id.into(),
        }
    }

    #[tokio::test]
    async fn test_owner_is_the_author() {
        let f = fixture().await;
        let article = f.svc.add(&f.alice, draft("Hello", &f.category_id)).await.unwrap();
        assert_eq!(article.user_id, f.alice.user_id);
        assert_eq!(f.svc.get(&article.id).await.unwrap().title, "Hello");
    }

    #[tokio::test]
    async fn test_add_validation() {
        let f = fixture().await;

        let err = f.svc.add(&f.alice, draft(" ", &f.category_id)).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::ArticleTitleEmpty);

        let mut input = draft("Hello", &f.category_id);
        input.content = String::new();
        let err = f.svc.add(&f.alice, input).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::ArticleContentEmpty);

        let err = f.svc.add(&f.alice, draft("Hello", "missing")).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::CategoryNotExist);
    }

    #[tokio::test]
    async fn test_member_cannot_edit_others_article() {
        let f = fixture().await;
        let article = f.svc.add(&f.bob, draft("Bob's", &f.category_id)).await.unwrap();

        let update = ArticleUpdate {
            title: Some("Hijacked".into()),
            ..Default::default()
        };
        let err = f.svc.edit(&f.alice, &article.id, update.clone()).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::NoPermission);
        assert_eq!(err.status_code(), hyper::StatusCode::FORBIDDEN);
        assert_eq!(f.svc.get(&article.id).await.unwrap().title, "Bob's");

        let err = f.svc.delete(&f.alice, &article.id).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::NoPermission);

        let edited = f.svc.edit(&f.admin, &article.id, update).await.unwrap();
        assert_eq!(edited.title, "Hijacked");
    }

    #[tokio::test]
    async fn test_owner_edits_and_deletes() {
        let f = fixture().await;
        let article = f.svc.add(&f.alice, draft("Draft", &f.category_id)).await.unwrap();

        let update = ArticleUpdate {
            content: Some("final".into()),
            ..Default::default()
        };
        let edited = f.svc.edit(&f.alice, &article.id, update).await.unwrap();
        assert_eq!(edited.content, "final");
        assert_eq!(edited.title, "Draft");

        f.svc.delete(&f.alice, &article.id).await.unwrap();
        let err = f.svc.get(&article.id).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::ArticleNotExist);
        assert_eq!(err.status_code(), hyper::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_and_search() {
        let f = fixture().await;
        f.svc.add(&f.alice, draft("Rust traits", &f.category_id)).await.unwrap();
        f.svc.add(&f.alice, draft("Async RUST", &f.category_id)).await.unwrap();
        f.svc.add(&f.bob, draft("Cooking", &f.category_id)).await.unwrap();

        assert_eq!(f.svc.list(Page::default()).await.unwrap().total, 3);
        assert_eq!(f.svc.list_by_user(&f.alice.user_id, Page::default()).await.unwrap().total, 2);
        assert_eq!(
            f.svc.list_by_category(&f.category_id, Page::new(Some(1), Some(2))).await.unwrap().items.len(),
            1
        );

        let hits = f.svc.search("rust", Page::default()).await.unwrap();
        assert_eq!(hits.total, 2);

        let err = f.svc.search("  ", Page::default()).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::BadRequest);
        let err = f.svc.list_by_category("missing", Page::default()).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::CategoryNotExist);
        let err = f.svc.list_by_user("missing", Page::default()).await.unwrap_err();
        assert_eq!(err.resp_code(), RespCode::UserNotExist);
    }
}
