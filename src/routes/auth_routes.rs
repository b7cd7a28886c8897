//! Authentication endpoints
//!
//! - POST /api/v1/auth/login    - exchange credentials for a session token
//! - GET  /api/v1/auth/validate - check a bearer token and echo its principal

use bytes::Bytes;
use hyper::header::HeaderValue;
use hyper::{Request, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::Principal;
use crate::routes::response::{BoxError, json_response, ok, parse_json_body, HttpResponse};
use crate::server::AppState;
use crate::types::{QuillError, RespCode, Result};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub status: RespCode,
    pub message: &'static str,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PrincipalView>,
}

#[derive(Debug, Serialize)]
pub struct PrincipalView {
    pub id: String,
    pub username: String,
    pub role: crate::auth::Role,
}

impl From<Principal> for PrincipalView {
    fn from(p: Principal) -> Self {
        Self {
            id: p.user_id,
            username: p.username,
            role: p.role,
        }
    }
}

/// POST /api/v1/auth/login
pub async fn handle_login<B>(req: Request<B>, state: &AppState) -> Result<HttpResponse>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let body: LoginRequest = parse_json_body(req).await?;

    if body.username.is_empty() || body.password.is_empty() {
        return Err(QuillError::BadRequest(
            "Missing required fields: username, password".into(),
        ));
    }

    let outcome = state.users.login(&body.username, &body.password).await?;
    Ok(ok(outcome))
}

/// GET /api/v1/auth/validate
pub async fn handle_validate(authorization: Option<&HeaderValue>, state: &AppState) -> HttpResponse {
    let header = authorization
        .map(|v| v.to_str().map_err(|_| QuillError::Unauthenticated(RespCode::TokenInvalid)));

    let resolved = match header.transpose() {
        Ok(header) => state.resolver.resolve(header).await,
        Err(e) => Err(e),
    };

    match resolved {
        Ok(principal) => json_response(
            StatusCode::OK,
            &ValidateResponse {
                status: RespCode::Success,
                message: RespCode::Success.message(),
                valid: true,
                data: Some(principal.into()),
            },
        ),
        Err(e) => {
            if e.is_server_fault() {
                error!("Token validation failed: {}", e);
            }
            let code = e.resp_code();
            json_response(
                e.status_code(),
                &ValidateResponse {
                    status: code,
                    message: code.message(),
                    valid: false,
                    data: None,
                },
            )
        }
    }
}
