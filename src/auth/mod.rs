//! Authentication and authorization
//!
//! - `password`: Argon2id credential hashing
//! - `jwt`: session token issuance and parsing
//! - `middleware`: bearer header to principal resolution
//! - `permissions`: roles and the ownership policy

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;

pub use jwt::{Claims, IssuedToken, TokenError, TokenService, TOKEN_LIFETIME_SECS};
pub use middleware::{bearer_token, principal_of, Principal, PrincipalResolver};
pub use password::{hash_password, verify_password, HashingError};
pub use permissions::{authorize, Action, Decision, Resource, ResourceKind, Role};
