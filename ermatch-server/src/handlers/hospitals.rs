use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use hospital_data::Hospital;

use crate::error::ApiError;
use crate::server::ErMatchServer;

#[derive(Debug, Deserialize, IntoParams)]
pub struct HospitalListParams {
    /// Scope bookmark flags to this user
    pub user: Option<Uuid>,
}

/// Directory entry with engagement aggregates.
#[derive(Debug, Serialize, ToSchema)]
pub struct HospitalListEntry {
    #[serde(flatten)]
    pub hospital: Hospital,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub is_bookmarked: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HospitalListResponse {
    pub result: bool,
    pub count: usize,
    /// Hospitals grouped by top-level region
    pub data: BTreeMap<String, Vec<HospitalListEntry>>,
}

const UNGROUPED_REGION: &str = "기타";

/// Region-grouped hospital directory
#[utoipa::path(
    get,
    path = "/api/v1/hospitals",
    params(HospitalListParams),
    responses(
        (status = 200, description = "Hospital directory", body = HospitalListResponse)
    ),
    tag = "hospitals"
)]
pub async fn list_hospitals(
    State(server): State<ErMatchServer>,
    Query(params): Query<HospitalListParams>,
) -> Result<Json<HospitalListResponse>, ApiError> {
    let hospitals = server.hospitals.list_all().await?;
    let hpids: Vec<String> = hospitals.iter().map(|h| h.hpid.clone()).collect();
    let mut engagement = server.hospitals.engagement_for(&hpids, params.user).await?;

    let count = hospitals.len();
    let mut data: BTreeMap<String, Vec<HospitalListEntry>> = BTreeMap::new();
    for hospital in hospitals {
        let region = hospital
            .first_address
            .clone()
            .unwrap_or_else(|| UNGROUPED_REGION.to_string());
        let (average_rating, review_count, is_bookmarked) =
            match engagement.remove(&hospital.hpid) {
                Some(e) => (e.average_rating, e.review_count, e.is_bookmarked),
                None => (None, 0, false),
            };
        data.entry(region).or_default().push(HospitalListEntry {
            hospital,
            average_rating,
            review_count,
            is_bookmarked,
        });
    }

    Ok(Json(HospitalListResponse {
        result: true,
        count,
        data,
    }))
}
