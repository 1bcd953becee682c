use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use ranking_engine::{RankedHospital, SearchProfile};

use crate::error::ApiError;
use crate::server::ErMatchServer;
use crate::services::SearchService;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SymptomSearchRequest {
    /// Symptom strings; must be non-empty
    pub symptom: Vec<String>,
    pub gender: Option<String>,
    pub age: Option<String>,
    /// Request coordinates; fall back to the stored user location
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Re-rank without writing a new search log
    #[serde(default)]
    pub refresh: bool,
    pub user: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SymptomSearchResponse {
    pub result: bool,
    pub sorted_by_distance: Vec<RankedHospital>,
    pub sorted_by_score: Vec<RankedHospital>,
    /// The field weights the ranking used
    pub openai_recommendation: BTreeMap<String, i32>,
    pub openai_comment: String,
}

/// Rank nearby emergency rooms for a symptom profile
#[utoipa::path(
    post,
    path = "/api/v1/search",
    request_body = SymptomSearchRequest,
    responses(
        (status = 200, description = "Ranked results", body = SymptomSearchResponse),
        (status = 400, description = "Missing symptoms or unresolvable location")
    ),
    tag = "search"
)]
pub async fn symptom_search(
    State(server): State<ErMatchServer>,
    Json(request): Json<SymptomSearchRequest>,
) -> Result<Json<SymptomSearchResponse>, ApiError> {
    let profile = SearchProfile::new(request.symptom, request.gender, request.age);

    let outcome = SearchService::new(&server)
        .search(
            profile,
            request.latitude,
            request.longitude,
            request.user,
            request.refresh,
        )
        .await?;

    Ok(Json(SymptomSearchResponse {
        result: true,
        sorted_by_distance: outcome.results.by_distance,
        sorted_by_score: outcome.results.by_score,
        openai_recommendation: outcome.recommendation.fields,
        openai_comment: outcome.recommendation.comment,
    }))
}
