//! ER-Match Engine HTTP server.
//!
//! Wires the dialogue engine, ranking engine and inference gateway into
//! an axum application over the hospital-data repositories.

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;

pub use error::{ApiError, ApiErrorResponse};
pub use server::{ErMatchServer, ServerConfig};

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router with all routes and middleware
pub fn create_app(server: ErMatchServer) -> Router {
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(server)
}
