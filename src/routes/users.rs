//! User management endpoints
//!
//! - GET    /api/v1/user/{id}        - self or admin
//! - GET    /api/v1/users            - admin
//! - POST   /api/v1/user/add         - admin
//! - PUT    /api/v1/user/edit/{id}   - self or admin
//! - DELETE /api/v1/user/delete/{id} - self or admin

use bytes::Bytes;
use hyper::Request;

use crate::auth::Principal;
use crate::routes::response::{BoxError, ok, ok_empty, ok_paged, parse_json_body, HttpResponse, Query};
use crate::server::AppState;
use crate::services::{NewUser, UserUpdate};
use crate::types::Result;

pub async fn handle_get(state: &AppState, principal: &Principal, id: &str) -> Result<HttpResponse> {
    Ok(ok(state.users.get_user(principal, id).await?))
}

pub async fn handle_list(state: &AppState, principal: &Principal, query: &Query) -> Result<HttpResponse> {
    Ok(ok_paged(state.users.list_users(principal, query.page()).await?))
}

pub async fn handle_add<B>(state: &AppState, principal: &Principal, req: Request<B>) -> Result<HttpResponse>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let input: NewUser = parse_json_body(req).await?;
    Ok(ok(state.users.add_user(principal, input).await?))
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
    let update: UserUpdate = parse_json_body(req).await?;
    Ok(ok(state.users.update_user(principal, id, update).await?))
}

pub async fn handle_delete(state: &AppState, principal: &Principal, id: &str) -> Result<HttpResponse> {
    state.users.delete_user(principal, id).await?;
    Ok(ok_empty())
}
