//! Configuration for Quill
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::jwt::MIN_SECRET_LEN;
use crate::db::PoolSettings;

/// Persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Mongo,
    /// In-process, non-durable; for development
    Memory,
}

/// Quill - content-management backend
#[derive(Parser, Debug, Clone)]
#[command(name = "quill")]
#[command(about = "Authenticated article and category publishing backend")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Persistence backend
    #[arg(long, env = "STORE", value_enum, default_value = "mongo")]
    pub store: StoreBackend,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "quill")]
    pub mongodb_db: String,

    /// Maximum idle connections (not enforced by the MongoDB driver)
    #[arg(long, env = "DB_MAX_IDLE_CONNS", default_value = "10")]
    pub db_max_idle_conns: u32,

    /// Maximum open connections
    #[arg(long, env = "DB_MAX_OPEN_CONNS", default_value = "100")]
    pub db_max_open_conns: u32,

    /// Connection lifetime bound in minutes
    #[arg(long, env = "DB_CONN_MAX_LIFETIME_MINS", default_value = "60")]
    pub db_conn_max_lifetime_mins: u64,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Enable development mode (fixed signing secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Bootstrap administrator username
    #[arg(long, env = "ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Bootstrap administrator password
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Bootstrap administrator email
    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@localhost")]
    pub admin_email: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < MIN_SECRET_LEN => {
                    return Err(format!("JWT_SECRET must be at least {} characters", MIN_SECRET_LEN));
                }
                Some(_) => {}
            }
        }

        if self.db_max_open_conns == 0 {
            return Err("DB_MAX_OPEN_CONNS must be at least 1".to_string());
        }

        if self.db_max_idle_conns > self.db_max_open_conns {
            return Err("DB_MAX_IDLE_CONNS must be less than or equal to DB_MAX_OPEN_CONNS".to_string());
        }

        if self.admin_username.is_some() != self.admin_password.is_some() {
            return Err("ADMIN_USERNAME and ADMIN_PASSWORD must be set together".to_string());
        }

        Ok(())
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_idle_conns: self.db_max_idle_conns,
            max_open_conns: self.db_max_open_conns,
            conn_max_lifetime: Duration::from_secs(self.db_conn_max_lifetime_mins * 60),
        }
    }

    /// Bootstrap admin credentials, if configured
    pub fn bootstrap_admin(&self) -> Option<(&str, &str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str(), self.admin_email.as_str())),
            _ => None,
        }
    }
}
