use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    handlers::{chat, health, hospitals, location, search},
    openapi,
    server::ErMatchServer,
};

/// Create health check routes
pub fn health_routes() -> Router<ErMatchServer> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/version", get(health::version_info))
}

/// Create chat routes
pub fn chat_routes() -> Router<ErMatchServer> {
    Router::new()
        .route("/chat", post(chat::chat_turn))
        .route("/chat/finish", post(chat::chat_finish))
}

/// Create location and search routes
pub fn matching_routes() -> Router<ErMatchServer> {
    Router::new()
        .route("/location", post(location::update_location))
        .route("/search", post(search::symptom_search))
        .route("/hospitals", get(hospitals::list_hospitals))
}

fn api_v1_routes() -> Router<ErMatchServer> {
    Router::new().merge(chat_routes()).merge(matching_routes())
}

pub fn create_routes() -> Router<ErMatchServer> {
    Router::new()
        // Liveness routes (outside the versioned prefix)
        .merge(health_routes())
        // API documentation routes
        .merge(openapi::create_docs_routes())
        .nest("/api/v1", api_v1_routes())
}
