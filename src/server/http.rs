//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use bytes::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::auth::{PrincipalResolver, TokenService};
use crate::db::{HealthProbe, Stores};
use crate::routes::{self, BoxError, HttpResponse};
use crate::services::{ArticleService, CategoryService, UserService};
use crate::types::{RespCode, Result};

/// Shared application state
pub struct AppState {
    pub resolver: PrincipalResolver,
    pub users: UserService,
    pub categories: CategoryService,
    pub articles: ArticleService,
    /// Store readiness probe
    pub health: Arc<dyn HealthProbe>,
}

impl AppState {
    pub fn new(tokens: Arc<TokenService>, stores: Stores, health: Arc<dyn HealthProbe>) -> Self {
        Self {
            resolver: PrincipalResolver::new(Arc::clone(&tokens), Arc::clone(&stores.users)),
            users: UserService::new(Arc::clone(&stores.users), tokens),
            categories: CategoryService::new(Arc::clone(&stores.categories)),
            articles: ArticleService::new(stores.articles, stores.categories, stores.users),
            health,
        }
    }
}

/// Accept connections on `listen` until `shutdown` fires
pub async fn run(state: Arc<AppState>, listen: SocketAddr, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!("Quill listening on {}", listen);

    loop {
        let (stream, addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            },
            _ = shutdown.changed() => {
                info!("HTTP server shutting down");
                return Ok(());
            }
        };

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);

            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(handle_request(state, req).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving connection from {}: {:?}", addr, err);
            }
        });
    }
}

/// Route a request and log its outcome
pub async fn handle_request<B>(state: Arc<AppState>, req: Request<B>) -> HttpResponse
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::OPTIONS, _) => routes::cors_preflight(),

        (&Method::GET, "/health") | (&Method::GET, "/healthz") => routes::health_check(),
        (&Method::GET, "/ready") | (&Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state)).await
        }
        (&Method::GET, "/version") => routes::version_info(),

        _ => match routes::handle_api_request(req, state).await {
            Some(response) => response,
            None => routes::code_response(RespCode::NotFound),
        },
    };

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    response
}
