//! Field-recommendation types and the seam to the external reasoning
//! service.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::profile::SearchProfile;

/// How long an equal-signature cached recommendation stays preferred
/// before any-age results and live calls are considered.
pub const CACHE_WINDOW_SECS: i64 = 3600;

/// Upper bound on recommended fields per profile.
pub const MAX_RECOMMENDED_FIELDS: usize = 10;

/// Weight range the recommender is instructed to use, descending.
pub const WEIGHT_CEILING: i32 = 30;
pub const WEIGHT_FLOOR: i32 = 12;

/// A ranked, weighted subset of capacity fields judged relevant to a
/// symptom/demographic profile, plus the model's rationale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct FieldRecommendation {
    #[serde(default)]
    pub fields: BTreeMap<String, i32>,
    #[serde(default)]
    pub comment: String,
}

impl FieldRecommendation {
    /// Degraded result when the reasoning service failed or answered
    /// garbage: no weights, so ranking falls back to bed-count-only.
    pub fn fallback() -> Self {
        Self {
            fields: BTreeMap::new(),
            comment: "AI 분석 중 오류가 발생했습니다.".to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("Recommender request failed: {0}")]
    Http(String),

    #[error("Recommender timed out")]
    Timeout,

    #[error("Unparsable recommender response: {0}")]
    InvalidResponse(String),

    #[error("Recommender misconfigured: {0}")]
    Config(String),
}

/// Seam to the external reasoning backend that maps a profile onto
/// weighted capacity fields. Implementations own their transport and
/// timeout; callers treat any error as "no field weights".
#[async_trait]
pub trait FieldRecommender: Send + Sync {
    async fn recommend(&self, profile: &SearchProfile)
        -> Result<FieldRecommendation, RecommendError>;
}
