//! # HTTP Server
//!
//! Server assembly for the fact log API: routes, CORS, request tracing,
//! bind and serve.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::config::HttpServerConfig;
use super::db_routes::{db_routes, AppState};
use crate::db::Factlog;

/// HTTP server for a set of fact logs.
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server with default configuration.
    pub fn new(db: Arc<Factlog>) -> Self {
        Self::with_config(HttpServerConfig::default(), db)
    }

    /// Create a server with custom configuration.
    pub fn with_config(config: HttpServerConfig, db: Arc<Factlog>) -> Self {
        let router = Self::build_router(&config, db);
        Self { config, router }
    }

    /// Build the router with every route and layer attached.
    fn build_router(config: &HttpServerConfig, db: Arc<Factlog>) -> Router {
        let state = Arc::new(AppState {
            db,
            long_poll: config.long_poll_timeout(),
        });

        // Configure CORS from config
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            use tower_http::cors::AllowOrigin;
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        db_routes(state)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process dies.
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!(addr = %addr, "factlog serving");
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CounterRule, RuleRegistry};
    use crate::store::MemoryStore;

    fn db() -> Arc<Factlog> {
        let rules = Arc::new(RuleRegistry::new(Arc::new(CounterRule::new(["cool"]))));
        Arc::new(Factlog::new(Arc::new(MemoryStore::new()), rules))
    }

    #[test]
    fn test_server_creation() {
        let server = HttpServer::new(db());
        assert_eq!(server.socket_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_server_with_custom_port() {
        let server = HttpServer::with_config(HttpServerConfig::with_port(8080), db());
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds() {
        let server = HttpServer::with_config(
            HttpServerConfig {
                cors_origins: vec!["http://localhost:5173".to_string()],
                ..Default::default()
            },
            db(),
        );
        let _router = server.router();
    }
}
