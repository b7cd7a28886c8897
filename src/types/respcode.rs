//! Response status codes carried in every JSON envelope
//!
//! Codes below 1000 mirror HTTP semantics; domain codes are grouped by
//! thousand (1xxx users, 2xxx auth, 3xxx categories, 4xxx articles).

use hyper::StatusCode;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespCode {
    Success,
    Error,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,

    UsernameUsed,
    PasswordWrong,
    UserNotExist,
    UserInactive,
    EmailUsed,
    InvalidEmail,
    InvalidRole,
    EmptyDisplayName,
    InvalidAvatarUrl,
    PasswordTooShort,

    TokenInvalid,
    NoPermission,

    CategoryNameUsed,
    CategoryNotExist,
    EmptyCategoryName,

    ArticleNotExist,
    ArticleTitleEmpty,
    ArticleContentEmpty,
}

impl RespCode {
    /// Numeric code placed in the `status` field of the envelope
    pub fn code(self) -> u16 {
        match self {
            Self::Success => 200,
            Self::Error => 500,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,

            Self::UsernameUsed => 1001,
            Self::PasswordWrong => 1002,
            Self::UserNotExist => 1003,
            Self::UserInactive => 1004,
            Self::EmailUsed => 1005,
            Self::InvalidEmail => 1006,
            Self::InvalidRole => 1007,
            Self::EmptyDisplayName => 1008,
            Self::InvalidAvatarUrl => 1009,
            Self::PasswordTooShort => 1010,

            Self::TokenInvalid => 2001,
            Self::NoPermission => 2002,

            Self::CategoryNameUsed => 3001,
            Self::CategoryNotExist => 3002,
            Self::EmptyCategoryName => 3003,

            Self::ArticleNotExist => 4001,
            Self::ArticleTitleEmpty => 4002,
            Self::ArticleContentEmpty => 4003,
        }
    }

    /// Fixed, client-safe message for the code
    pub fn message(self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Error => "Internal server error",
            Self::BadRequest => "Bad request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not found",
            Self::MethodNotAllowed => "Method not allowed",

            Self::UsernameUsed => "Username already exists",
            Self::PasswordWrong => "Wrong password",
            Self::UserNotExist => "User does not exist",
            Self::UserInactive => "User account is deactivated",
            Self::EmailUsed => "Email already in use",
            Self::InvalidEmail => "Invalid email address",
            Self::InvalidRole => "Invalid user role",
            Self::EmptyDisplayName => "Display name must not be empty",
            Self::InvalidAvatarUrl => "Invalid avatar URL",
            Self::PasswordTooShort => "Password is too short",

            Self::TokenInvalid => "Invalid authentication token",
            Self::NoPermission => "No permission for this operation",

            Self::CategoryNameUsed => "Category already exists",
            Self::CategoryNotExist => "Category does not exist",
            Self::EmptyCategoryName => "Category name must not be empty",

            Self::ArticleNotExist => "Article does not exist",
            Self::ArticleTitleEmpty => "Article title must not be empty",
            Self::ArticleContentEmpty => "Article content must not be empty",
        }
    }

    /// Default HTTP status when the code is returned on its own
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::Error => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized
            | Self::TokenInvalid
            | Self::PasswordWrong => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NoPermission | Self::UserInactive => StatusCode::FORBIDDEN,
            Self::NotFound
            | Self::UserNotExist
            | Self::CategoryNotExist
            | Self::ArticleNotExist => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::UsernameUsed | Self::EmailUsed | Self::CategoryNameUsed => StatusCode::CONFLICT,
            Self::BadRequest
            | Self::InvalidEmail
            | Self::InvalidRole
            | Self::EmptyDisplayName
            | Self::InvalidAvatarUrl
            | Self::PasswordTooShort
            | Self::EmptyCategoryName
            | Self::ArticleTitleEmpty
            | Self::ArticleContentEmpty => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for RespCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

impl Serialize for RespCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}
