use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use ranking_engine::SEARCH_RADIUS_KM;

use crate::error::ApiError;
use crate::server::ErMatchServer;
use crate::services::{ChatService, ChatTurnResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationRequest {
    pub user: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub location_text: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationResponse {
    pub result: bool,
    /// Present when the stored location was pushed into an active
    /// dialogue session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chatbot_response: Option<ChatTurnResponse>,
}

/// Store a user's latest location and notify their active session
#[utoipa::path(
    post,
    path = "/api/v1/location",
    request_body = LocationRequest,
    responses(
        (status = 200, description = "Location stored", body = LocationResponse)
    ),
    tag = "location"
)]
pub async fn update_location(
    State(server): State<ErMatchServer>,
    Json(request): Json<LocationRequest>,
) -> Result<Json<LocationResponse>, ApiError> {
    server
        .users
        .upsert_location(
            request.user,
            request.latitude,
            request.longitude,
            request.location_text.as_deref(),
        )
        .await?;
    server
        .users
        .log_location(
            request.user,
            request.latitude,
            request.longitude,
            SEARCH_RADIUS_KM as i32,
            request.location_text.as_deref(),
        )
        .await?;

    let chatbot_response = ChatService::new(&server)
        .push_location(
            request.user,
            request.latitude,
            request.longitude,
            request.location_text.as_deref(),
        )
        .await?;

    Ok(Json(LocationResponse {
        result: true,
        chatbot_response,
    }))
}
