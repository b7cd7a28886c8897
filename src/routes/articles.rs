//! Article endpoints

use bytes::Bytes;
use hyper::Request;

use crate::auth::Principal;
use crate::routes::response::{BoxError, ok, ok_empty, ok_paged, parse_json_body, HttpResponse, Query};
use crate::server::AppState;
use crate::services::{ArticleUpdate, NewArticle};
use crate::types::Result;

pub async fn handle_add<B>(state: &AppState, principal: &Principal, req: Request<B>) -> Result<HttpResponse>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let input: NewArticle = parse_json_body(req).await?;
    Ok(ok(state.articles.add(principal, input).await?))
}

pub async fn handle_get(state: &AppState, id: &str) -> Result<HttpResponse> {
    Ok(ok(state.articles.get(id).await?))
}

pub async fn handle_list(state: &AppState, query: &Query) -> Result<HttpResponse> {
    Ok(ok_paged(state.articles.list(query.page()).await?))
}

pub async fn handle_list_by_category(state: &AppState, query: &Query, category_id: &str) -> Result<HttpResponse> {
    Ok(ok_paged(state.articles.list_by_category(category_id, query.page()).await?))
}

pub async fn handle_list_by_user(state: &AppState, query: &Query, user_id: &str) -> Result<HttpResponse> {
    Ok(ok_paged(state.articles.list_by_user(user_id, query.page()).await?))
}

/// GET /api/v1/articles/search?keyword=
pub async fn handle_search(state: &AppState, query: &Query) -> Result<HttpResponse> {
    let keyword = query.get("keyword").unwrap_or_default();
    Ok(ok_paged(state.articles.search(keyword, query.page()).await?))
}

pub async fn handle_edit<B>(
    state: &AppState,
    principal: &Principal,
    req: Request<B>,
    id: &str,
) -> Result<HttpResponse>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let update: ArticleUpdate = parse_json_body(req).await?;
    Ok(ok(state.articles.edit(principal, id, update).await?))
}

pub async fn handle_delete(state: &AppState, principal: &Principal, id: &str) -> Result<HttpResponse> {
    state.articles.delete(principal, id).await?;
    Ok(ok_empty())
}
