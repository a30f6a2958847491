//! # Fact Log HTTP Server Module
//!
//! Thin axum layer over the engine: routes, CORS, request tracing.
//!
//! # Endpoints
//!
//! - `GET /{db}` - snapshot of a log's age and folded state
//! - `GET /{db}/{n}` - one fact; one past the end long-polls
//! - `GET /{db}/{n}..` - facts n onward
//! - `PUT /{db}/{n}` - record fact n

pub mod config;
pub mod db_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use db_routes::{db_routes, AppState};
pub use server::HttpServer;
