//! Quill - content-management backend
//!
//! Quill serves a JSON API for publishing articles under categories, with
//! bearer-token authentication and role-based permissions.
//!
//! ## Components
//!
//! - **Auth**: password hashing, token issuing, principal resolution and the permission policy
//! - **DB**: MongoDB or in-memory record stores behind a retrying connection manager
//! - **Services**: user, category and article operations
//! - **Routes**: `/api/v1` handlers plus health, readiness and version endpoints

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{QuillError, Result};
