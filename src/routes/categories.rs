//! Category endpoints
//!
//! Reads are open to any authenticated principal; changes are admin-only.

use bytes::Bytes;
use hyper::Request;
use serde::Deserialize;

use crate::auth::Principal;
use crate::routes::response::{BoxError, ok, ok_empty, ok_paged, parse_json_body, HttpResponse, Query};
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
}

/// POST /api/v1/category/add
pub async fn handle_add<B>(state: &AppState, principal: &Principal, req: Request<B>) -> Result<HttpResponse>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let body: CategoryRequest = parse_json_body(req).await?;
    Ok(ok(state.categories.add(principal, &body.name).await?))
}

/// GET /api/v1/category/{id}
pub async fn handle_get(state: &AppState, id: &str) -> Result<HttpResponse> {
    Ok(ok(state.categories.get(id).await?))
}

/// GET /api/v1/categories
pub async fn handle_list(state: &AppState, query: &Query) -> Result<HttpResponse> {
    Ok(ok_paged(state.categories.list(query.page()).await?))
}

/// DELETE /api/v1/category/delete/{id}
pub async fn handle_delete(state: &AppState, principal: &Principal, id: &str) -> Result<HttpResponse> {
    state.categories.delete(principal, id).await?;
    Ok(ok_empty())
}
