//! Error types for Quill
//!
//! Every variant resolves to a [`RespCode`] for the response envelope and an
//! HTTP status. Only the code's fixed message ever reaches the client; the
//! `Display` text (which may contain driver detail) is for server logs.

use hyper::StatusCode;

use super::RespCode;

/// Main error type for Quill operations
#[derive(Debug, thiserror::Error)]
pub enum QuillError {
    /// Malformed request input (body, path, query)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A domain rejection, returned with the code's default HTTP status
    #[error("Rejected: {0}")]
    Rejected(RespCode),

    /// A rejection during authentication, always returned as 401
    #[error("Unauthenticated: {0}")]
    Unauthenticated(RespCode),

    /// Unique index violation on the named field
    #[error("Duplicate value for unique field '{0}'")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Hashing or signing failure (never a wrong password or bad token)
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuillError {
    /// Status code placed in the response envelope
    pub fn resp_code(&self) -> RespCode {
        match self {
            Self::BadRequest(_) => RespCode::BadRequest,
            Self::Rejected(code) | Self::Unauthenticated(code) => *code,
            Self::Duplicate(_)
            | Self::Database(_)
            | Self::Config(_)
            | Self::Auth(_)
            | Self::Internal(_) => RespCode::Error,
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected(code) => code.http_status(),
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Duplicate(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Config(_) | Self::Auth(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the detail should be logged at error level (infrastructure faults)
    pub fn is_server_fault(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<std::io::Error> for QuillError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for QuillError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for QuillError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for QuillError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encoding error: {}", err))
    }
}

/// Result type alias for Quill operations
pub type Result<T> = std::result::Result<T, QuillError>;
