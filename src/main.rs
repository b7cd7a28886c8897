//! Quill - content-management backend

use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill::{
    auth::TokenService,
    config::{Args, StoreBackend},
    db::{
        ConnectionManager, Connector, HealthProbe, MemoryConnector, MongoConnector, Stores,
        HEALTH_CHECK_INTERVAL,
    },
    server,
    services::UserService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("quill={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Quill - content-management backend");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Store: {:?}", args.store);
    if args.store == StoreBackend::Mongo {
        info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    }
    info!("======================================");

    let tokens = if args.dev_mode {
        warn!("Development mode: tokens are signed with a fixed secret");
        TokenService::new_dev()
    } else {
        match TokenService::new(args.jwt_secret.as_deref().unwrap_or_default()) {
            Ok(tokens) => tokens,
            Err(e) => {
                error!("Token service setup failed: {}", e);
                std::process::exit(1);
            }
        }
    };
    let tokens = Arc::new(tokens);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (stores, health, monitor) = match args.store {
        StoreBackend::Mongo => {
            let manager = open(MongoConnector::new(&args.mongodb_uri, &args.mongodb_db), &args).await;
            let stores = Stores::mongo(manager.handle());
            let monitor = manager.spawn_health_monitor(HEALTH_CHECK_INTERVAL, shutdown_rx.clone());
            (stores, manager as Arc<dyn HealthProbe>, monitor)
        }
        StoreBackend::Memory => {
            warn!("In-memory store: data is lost on exit");
            let manager = open(MemoryConnector, &args).await;
            let stores = manager.handle().clone();
            let monitor = manager.spawn_health_monitor(HEALTH_CHECK_INTERVAL, shutdown_rx.clone());
            (stores, manager as Arc<dyn HealthProbe>, monitor)
        }
    };

    if let Some((username, password, email)) = args.bootstrap_admin() {
        let users = UserService::new(Arc::clone(&stores.users), Arc::clone(&tokens));
        match users.ensure_admin(username, password, email).await {
            Ok(true) => info!(username, "Bootstrap administrator created"),
            Ok(false) => info!(username, "Bootstrap administrator already present"),
            Err(e) => {
                error!("Failed to create bootstrap administrator: {}", e);
                std::process::exit(1);
            }
        }
    }

    let state = Arc::new(server::AppState::new(tokens, stores, health));
    let server = tokio::spawn(server::run(state, args.listen, shutdown_rx));

    tokio::select! {
        result = server => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Server error: {}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Server task failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = monitor.await {
        warn!("Health monitor did not stop cleanly: {}", e);
    }
    info!("Quill stopped");

    Ok(())
}

/// Connect the store or exit
async fn open<C: Connector>(connector: C, args: &Args) -> Arc<ConnectionManager<C>> {
    match ConnectionManager::initialize(connector, args.pool_settings(), Default::default()).await {
        Ok(manager) => Arc::new(manager),
        Err(e) => {
            error!("Store initialization failed: {}", e);
            std::process::exit(1);
        }
    }
}
