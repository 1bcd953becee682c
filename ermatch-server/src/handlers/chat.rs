use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::ErMatchServer;
use crate::services::{ChatService, ChatTurnResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatTurnRequest {
    /// Omit to start or resume a conversation implicitly
    pub session_id: Option<Uuid>,
    pub message: Option<String>,
    /// Authenticated user id, if any
    pub user: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatFinishRequest {
    pub session_id: Uuid,
    pub user: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatFinishResponse {
    pub result: bool,
    pub message: String,
}

/// Process one chat turn
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    request_body = ChatTurnRequest,
    responses(
        (status = 200, description = "Turn processed", body = ChatTurnResponse),
        (status = 400, description = "Missing message for an existing session"),
        (status = 404, description = "Session owned by another user"),
        (status = 409, description = "Concurrent turn for the same session")
    ),
    tag = "chat"
)]
pub async fn chat_turn(
    State(server): State<ErMatchServer>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    let message = request.message.unwrap_or_default();
    if message.is_empty() && request.session_id.is_some() {
        return Err(ApiError::validation("Message is required."));
    }

    let response = ChatService::new(&server)
        .process_turn(request.session_id, message, request.user)
        .await?;
    Ok(Json(response))
}

/// Close a session explicitly
#[utoipa::path(
    post,
    path = "/api/v1/chat/finish",
    request_body = ChatFinishRequest,
    responses(
        (status = 200, description = "Session finished", body = ChatFinishResponse),
        (status = 404, description = "Session not found for this user")
    ),
    tag = "chat"
)]
pub async fn chat_finish(
    State(server): State<ErMatchServer>,
    Json(request): Json<ChatFinishRequest>,
) -> Result<Json<ChatFinishResponse>, ApiError> {
    ChatService::new(&server)
        .finish(request.session_id, request.user)
        .await?;
    Ok(Json(ChatFinishResponse {
        result: true,
        message: "Session finished successfully.".to_string(),
    }))
}
