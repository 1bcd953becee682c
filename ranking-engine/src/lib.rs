//! Hospital relevance ranking: bed-count baseline plus AI-recommended
//! capacity fields, normalized 0–100 against the best hospital in the
//! batch, with a distance view alongside.

pub mod engine;
pub mod profile;
pub mod recommend;
pub mod score;
pub mod vocabulary;

pub use engine::{
    filter_by_radius, rank, Candidate, RankedHospital, RankedResults, MIN_RESULTS,
    SEARCH_RADIUS_KM,
};
pub use profile::SearchProfile;
pub use recommend::{
    FieldRecommendation, FieldRecommender, RecommendError, CACHE_WINDOW_SECS,
    MAX_RECOMMENDED_FIELDS, WEIGHT_CEILING, WEIGHT_FLOOR,
};
pub use score::{normalize_score, score_capacity, BED_BASE_SCORE, BED_UNIT_SCORE};
pub use vocabulary::{describe, vocabulary_json, FIELD_DESCRIPTIONS};
