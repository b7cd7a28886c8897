//! HTTP routes
//!
//! Everything under `/api/v1` except login and token validation requires a
//! bearer token. The principal is resolved once per request, before the
//! handler runs.

pub mod articles;
pub mod auth_routes;
pub mod categories;
pub mod health;
pub mod response;
pub mod users;

use bytes::Bytes;
use hyper::header::AUTHORIZATION;
use hyper::{Method, Request};
use std::sync::Arc;

use crate::server::AppState;
use crate::types::{RespCode, Result};

pub use health::{health_check, readiness_check, version_info};
pub use response::{code_response, BoxError, cors_preflight, error_response, HttpResponse, Query};

pub const API_PREFIX: &str = "/api/v1";

/// A recognised `/api/v1` endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Validate,

    GetUser(String),
    ListUsers,
    AddUser,
    EditUser(String),
    DeleteUser(String),
    UserArticles(String),

    AddCategory,
    GetCategory(String),
    DeleteCategory(String),
    ListCategories,
    CategoryArticles(String),

    ListArticles,
    GetArticle(String),
    AddArticle,
    EditArticle(String),
    DeleteArticle(String),
    SearchArticles,
}

impl Route {
    /// Match a path below the API prefix
    ///
    /// Unknown paths give `NotFound`; known paths with the wrong method give
    /// `MethodNotAllowed`.
    pub fn parse(method: &Method, path: &str) -> std::result::Result<Self, RespCode> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        let (expected, route) = match segments.as_slice() {
            ["auth", "login"] => (Method::POST, Route::Login),
            ["auth", "validate"] => (Method::GET, Route::Validate),

            ["users"] => (Method::GET, Route::ListUsers),
            ["user", "add"] => (Method::POST, Route::AddUser),
            ["user", "edit", user] => (Method::PUT, Route::EditUser(user.to_string())),
            ["user", "delete", user] => (Method::DELETE, Route::DeleteUser(user.to_string())),
            ["user", user, "articles"] => (Method::GET, Route::UserArticles(user.to_string())),
            ["user", user] => (Method::GET, Route::GetUser(user.to_string())),

            ["categories"] => (Method::GET, Route::ListCategories),
            ["category", "add"] => (Method::POST, Route::AddCategory),
            ["category", "delete", cat] => (Method::DELETE, Route::DeleteCategory(cat.to_string())),
            ["category", cat, "articles"] => (Method::GET, Route::CategoryArticles(cat.to_string())),
            ["category", cat] => (Method::GET, Route::GetCategory(cat.to_string())),

            ["articles"] => (Method::GET, Route::ListArticles),
            ["articles", "search"] => (Method::GET, Route::SearchArticles),
            ["article", "add"] => (Method::POST, Route::AddArticle),
            ["article", "edit", art] => (Method::PUT, Route::EditArticle(art.to_string())),
            ["article", "delete", art] => (Method::DELETE, Route::DeleteArticle(art.to_string())),
            ["article", art] => (Method::GET, Route::GetArticle(art.to_string())),

            _ => return Err(RespCode::NotFound),
        };

        if *method == expected {
            Ok(route)
        } else {
            Err(RespCode::MethodNotAllowed)
        }
    }

    fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Validate)
    }
}

/// Handle a request below [`API_PREFIX`]
///
/// Returns `None` if the path is outside the API.
pub async fn handle_api_request<B>(mut req: Request<B>, state: Arc<AppState>) -> Option<HttpResponse>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().strip_prefix(API_PREFIX)?.to_string();
    if !path.is_empty() && !path.starts_with('/') {
        return None;
    }

    let route = match Route::parse(req.method(), &path) {
        Ok(route) => route,
        Err(code) => return Some(code_response(code)),
    };

    if route.is_public() {
        let response = match route {
            Route::Login => auth_routes::handle_login(req, &state).await,
            _ => Ok(auth_routes::handle_validate(req.headers().get(AUTHORIZATION), &state).await),
        };
        return Some(response.unwrap_or_else(|e| error_response(&e)));
    }

    let principal = match state.resolver.authenticate(&mut req).await {
        Ok(principal) => principal,
        Err(e) => return Some(error_response(&e)),
    };

    Some(
        dispatch(route, req, &state, &principal)
            .await
            .unwrap_or_else(|e| error_response(&e)),
    )
}

async fn dispatch<B>(
    route: Route,
    req: Request<B>,
    state: &AppState,
    principal: &crate::auth::Principal,
) -> Result<HttpResponse>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let query = Query::from_query_string(req.uri().query());

    match route {
        Route::GetUser(id) => users::handle_get(state, principal, &id).await,
        Route::ListUsers => users::handle_list(state, principal, &query).await,
        Route::AddUser => users::handle_add(state, principal, req).await,
        Route::EditUser(id) => users::handle_edit(state, principal, req, &id).await,
        Route::DeleteUser(id) => users::handle_delete(state, principal, &id).await,
        Route::UserArticles(id) => articles::handle_list_by_user(state, &query, &id).await,

        Route::AddCategory => categories::handle_add(state, principal, req).await,
        Route::GetCategory(id) => categories::handle_get(state, &id).await,
        Route::DeleteCategory(id) => categories::handle_delete(state, principal, &id).await,
        Route::ListCategories => categories::handle_list(state, &query).await,
        Route::CategoryArticles(id) => articles::handle_list_by_category(state, &query, &id).await,

        Route::ListArticles => articles::handle_list(state, &query).await,
        Route::GetArticle(id) => articles::handle_get(state, &id).await,
        Route::AddArticle => articles::handle_add(state, principal, req).await,
        Route::EditArticle(id) => articles::handle_edit(state, principal, req, &id).await,
        Route::DeleteArticle(id) => articles::handle_delete(state, principal, &id).await,
        Route::SearchArticles => articles::handle_search(state, &query).await,

        Route::Login | Route::Validate => Ok(code_response(RespCode::NotFound)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parsing() {
        assert_eq!(Route::parse(&Method::POST, "/auth/login"), Ok(Route::Login));
        assert_eq!(Route::parse(&Method::GET, "/user/u1"), Ok(Route::GetUser("u1".into())));
        assert_eq!(Route::parse(&Method::POST, "/user/add"), Ok(Route::AddUser));
        assert_eq!(
            Route::parse(&Method::PUT, "/article/edit/a1"),
            Ok(Route::EditArticle("a1".into()))
        );
        assert_eq!(
            Route::parse(&Method::GET, "/category/c1/articles"),
            Ok(Route::CategoryArticles("c1".into()))
        );
        assert_eq!(Route::parse(&Method::GET, "/articles/search"), Ok(Route::SearchArticles));
    }

    #[test]
    fn test_route_errors() {
        assert_eq!(Route::parse(&Method::GET, "/auth/login"), Err(RespCode::MethodNotAllowed));
        assert_eq!(Route::parse(&Method::GET, "/nope"), Err(RespCode::NotFound));
        assert_eq!(Route::parse(&Method::GET, "/article/edit/a1/x"), Err(RespCode::NotFound));
    }
}
