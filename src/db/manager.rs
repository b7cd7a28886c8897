//! Persistent-store connection lifecycle
//!
//! The manager connects with a bounded retry budget, reconciles the schema
//! once, and then supervises the live handle with a periodic health probe
//! that stops on the shutdown signal.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::types::{QuillError, Result};

/// Default interval between background health checks
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Pool bounds applied to a new connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
    pub conn_max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_idle_conns: 10,
            max_open_conns: 100,
            conn_max_lifetime: Duration::from_secs(60 * 60),
        }
    }
}

/// How many times to try connecting, and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}

/// A store driver the manager can open and probe
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Live connection handle; cheap to clone and safe to share
    type Conn: Clone + Send + Sync + 'static;

    async fn connect(&self, settings: &PoolSettings) -> Result<Self::Conn>;

    /// Create-if-missing for every collection and its indexes
    async fn reconcile_schema(&self, conn: &Self::Conn) -> Result<()>;

    async fn ping(&self, conn: &Self::Conn) -> Result<()>;
}

/// Readiness probe used by the HTTP layer
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn health_check(&self) -> Result<()>;
}

/// Owns the live store connection
pub struct ConnectionManager<C: Connector> {
    connector: C,
    conn: C::Conn,
    settings: PoolSettings,
}

impl<C: Connector> ConnectionManager<C> {
    /// Connect under `retry`, then reconcile the schema once
    ///
    /// Every failed attempt is logged at warn level. Once the attempts are
    /// exhausted the last error is returned; there is no delay after the
    /// final attempt.
    pub async fn initialize(connector: C, settings: PoolSettings, retry: RetryPolicy) -> Result<Self> {
        let attempts = retry.max_attempts.max(1);
        let mut attempt = 1;

        let conn = loop {
            match connector.connect(&settings).await {
                Ok(conn) => {
                    info!(attempt, "Store connection established");
                    break conn;
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        "Store connection failed, retrying in {:?}: {}",
                        retry.delay,
                        e
                    );
                    tokio::time::sleep(retry.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempt, "Store connection failed, giving up: {}", e);
                    return Err(QuillError::Database(format!(
                        "Failed to connect after {} attempts: {}",
                        attempts, e
                    )));
                }
            }
        };

        info!(
            max_idle_conns = settings.max_idle_conns,
            max_open_conns = settings.max_open_conns,
            conn_max_lifetime_secs = settings.conn_max_lifetime.as_secs(),
            "Connection pool configured"
        );

        connector.reconcile_schema(&conn).await?;
        info!("Schema reconciled");

        Ok(Self {
            connector,
            conn,
            settings,
        })
    }

    /// The live connection handle
    pub fn handle(&self) -> &C::Conn {
        &self.conn
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Ping the live connection
    pub async fn health_check(&self) -> Result<()> {
        self.connector.ping(&self.conn).await
    }

    /// Run `health_check` every `interval` until `shutdown` fires
    ///
    /// Failures are logged and never end the task.
    pub fn spawn_health_monitor(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);

        info!(interval_secs = interval.as_secs(), "Store health monitor started");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = manager.health_check().await {
                            error!("Store health check failed: {}", e);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Store health monitor stopped");
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl<C: Connector> HealthProbe for ConnectionManager<C> {
    async fn health_check(&self) -> Result<()> {
        ConnectionManager::health_check(self).await
    }
}
