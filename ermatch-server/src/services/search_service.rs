//! Symptom search orchestration: coordinate resolution, cache-or-call
//! field recommendation, candidate assembly and ranking.

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use hospital_data::NewSearchLog;
use ranking_engine::{
    filter_by_radius, rank, Candidate, FieldRecommendation, RankedResults, SearchProfile,
    CACHE_WINDOW_SECS, SEARCH_RADIUS_KM,
};

use crate::error::ApiError;
use crate::server::ErMatchServer;

/// Upper bound on distance-sorted candidates pulled per search.
const NEARBY_LIMIT: i64 = 200;

pub struct SearchOutcome {
    pub results: RankedResults,
    pub recommendation: FieldRecommendation,
}

pub struct SearchService<'a> {
    server: &'a ErMatchServer,
}

impl<'a> SearchService<'a> {
    pub fn new(server: &'a ErMatchServer) -> Self {
        Self { server }
    }

    pub async fn search(
        &self,
        profile: SearchProfile,
        latitude: Option<f64>,
        longitude: Option<f64>,
        user_id: Option<Uuid>,
        refresh: bool,
    ) -> Result<SearchOutcome, ApiError> {
        if profile.symptoms.is_empty() {
            return Err(ApiError::validation("Symptoms are required."));
        }

        let (latitude, longitude) = self.resolve_coordinates(latitude, longitude, user_id).await?;

        let recommendation = self.resolve_recommendation(&profile).await;

        if !refresh {
            // Off the response path: a failed log write must not fail
            // the search.
            let log = NewSearchLog {
                user_id,
                latitude,
                longitude,
                radius_km: SEARCH_RADIUS_KM as i32,
                symptoms: profile.symptom_signature(),
                gender: profile.gender.clone(),
                age: profile.age.clone(),
                recommended_fields: serde_json::to_value(&recommendation.fields)
                    .unwrap_or(Value::Null),
                comment: recommendation.comment.clone(),
            };
            if let Err(e) = self.server.search_logs.insert(&log).await {
                warn!(error = %e, "search log insert failed");
            }
        }

        let nearby = self
            .server
            .hospitals
            .nearby_with_capacity(latitude, longitude, NEARBY_LIMIT)
            .await?;
        let candidates = filter_by_radius(nearby, SEARCH_RADIUS_KM);

        let hpids: Vec<String> = candidates.iter().map(|h| h.hpid.clone()).collect();
        let mut capacities = self.server.hospitals.capacities_for(&hpids).await?;
        let mut severe = self.server.hospitals.severe_messages_for(&hpids).await?;
        let mut engagement = self.server.hospitals.engagement_for(&hpids, user_id).await?;

        let candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter_map(|hospital| {
                let capacity = capacities.remove(&hospital.hpid)?;
                Some(Candidate {
                    severe_messages: severe.remove(&hospital.hpid).unwrap_or_default(),
                    engagement: engagement.remove(&hospital.hpid),
                    hospital,
                    capacity,
                })
            })
            .collect();

        info!(
            candidates = candidates.len(),
            recommended_fields = recommendation.fields.len(),
            "ranking symptom search"
        );

        let results = rank(candidates, &recommendation);
        Ok(SearchOutcome {
            results,
            recommendation,
        })
    }

    /// Request coordinates win; otherwise fall back to the caller's stored
    /// location. No resolvable point is a hard client error.
    async fn resolve_coordinates(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
        user_id: Option<Uuid>,
    ) -> Result<(f64, f64), ApiError> {
        if let (Some(lat), Some(lon)) = (latitude, longitude) {
            return Ok((lat, lon));
        }
        if let Some(user_id) = user_id {
            if let Some(location) = self.server.users.latest_location(user_id).await? {
                return Ok((location.latitude, location.longitude));
            }
        }
        Err(ApiError::bad_request("User location not found."))
    }

    /// Recommendation cache policy: freshest equal-signature log within
    /// the cache window, else any equal-signature log, else one live call.
    /// Every failure degrades to the empty weight set.
    async fn resolve_recommendation(&self, profile: &SearchProfile) -> FieldRecommendation {
        let signature = profile.symptom_signature();
        let cutoff = Utc::now() - Duration::seconds(CACHE_WINDOW_SECS);

        let cached = match self
            .server
            .search_logs
            .recent_with_fields(
                &signature,
                profile.gender.as_deref(),
                profile.age.as_deref(),
                cutoff,
            )
            .await
        {
            Ok(Some(row)) => Some(row),
            Ok(None) => self
                .server
                .search_logs
                .latest_with_fields(&signature, profile.gender.as_deref(), profile.age.as_deref())
                .await
                .ok()
                .flatten(),
            Err(e) => {
                warn!(error = %e, "recommendation cache lookup failed");
                None
            }
        };

        if let Some(row) = cached {
            if let Some(fields) = row.recommended_fields {
                if let Ok(fields) = serde_json::from_value(fields) {
                    return FieldRecommendation {
                        fields,
                        comment: row.comment.unwrap_or_default(),
                    };
                }
            }
        }

        match self.server.recommender.recommend(profile).await {
            Ok(recommendation) => recommendation,
            Err(e) => {
                warn!(error = %e, "field recommender failed, ranking on beds only");
                FieldRecommendation::fallback()
            }
        }
    }
}
