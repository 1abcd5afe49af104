//! API Server
//!
//! HTTP front end for the outcome engine. Sessions live in memory only.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::{ApiConfig, FairseedConfig};
use crate::store::SessionStore;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Router with state and the full middleware stack
pub fn build_app(config: &FairseedConfig) -> axum::Router {
    app_for(Arc::new(SessionStore::new(config.games.clone())), &config.api)
}

fn app_for(store: Arc<SessionStore>, api: &ApiConfig) -> axum::Router {
    let state = Arc::new(AppState::new(store));
    with_middleware(create_router(state), api)
}

fn with_middleware(router: axum::Router, api: &ApiConfig) -> axum::Router {
    router
        // Request ID middleware (first for tracing)
        .layer(axum::middleware::from_fn(request_id_middleware))
        // CORS layer (before timeout to handle preflight)
        .layer(create_cors_layer(api.allowed_origins.clone()))
        .layer(TimeoutLayer::new(api.request_timeout()))
        // Tracing layer (last for complete request tracing)
        .layer(TraceLayer::new_for_http())
}

pub struct ApiServer {
    config: FairseedConfig,
}

impl ApiServer {
    pub fn new(config: FairseedConfig) -> Self {
        Self { config }
    }

    /// Start the API server and block until shutdown
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let store = Arc::new(SessionStore::new(self.config.games.clone()));
        if let Some(max_idle) = self.config.api.session_idle_timeout() {
            SessionStore::start_cleanup_task(Arc::clone(&store), max_idle);
        }
        let app = app_for(store, &self.config.api);
        let addr = self.get_socket_addr()?;

        info!("🎲 Starting fairseed API Server (HTTP)");
        info!("   Listen: http://{}", addr);
        self.log_server_info();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("✅ API Server running");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("🛑 API Server stopped gracefully");
        Ok(())
    }

    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.api.host.parse::<std::net::IpAddr>()?,
            self.config.api.port,
        )))
    }

    fn log_server_info(&self) {
        let api = &self.config.api;
        let games = &self.config.games;
        info!("📋 Server Configuration:");
        info!("   CORS: {:?}", api.allowed_origins);
        info!("   Request timeout: {}s", api.request_timeout_secs);
        match api.session_idle_timeout() {
            Some(idle) => info!("   Idle sessions evicted after: {}s", idle.as_secs()),
            None => info!("   Idle session eviction: disabled"),
        }
        info!("   House edge: {}%", games.house_edge_percent);
        info!("   Max plinko balls per request: {}", games.max_plinko_balls);
        if api.allowed_origins.is_empty() {
            warn!("⚠️  No CORS origins configured, browsers on other origins will be refused");
        }

        info!("📊 Available endpoints:");
        info!("   GET  /health                          - Health check");
        info!("   POST /sessions                        - Open a session");
        info!("   GET  /sessions/:id                    - Current commitment");
        info!("   DELETE /sessions/:id                  - Close session, reveal seeds");
        info!("   POST /sessions/:id/rotate             - Reveal and rotate seeds");
        info!("   GET  /sessions/:id/revealed           - Revealed seed history");
        info!("   POST /sessions/:id/dice               - Roll dice");
        info!("   POST /sessions/:id/plinko             - Drop plinko balls");
        info!("   POST /sessions/:id/blackjack          - Deal blackjack");
        info!("   GET  /sessions/:id/blackjack          - Open round view");
        info!("   POST /sessions/:id/blackjack/action   - Blackjack decision");
        info!("   POST /sessions/:id/blackjack/abandon  - Abandon blackjack round");
        info!("   POST /verify                          - Verify a game result");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
