//! Row types shared by the repositories.
//!
//! Hospital and capacity columns mirror the national emergency-room feed
//! (`hv*` field names are kept verbatim so AI field recommendations can be
//! resolved against rows dynamically).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Hospital master record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Hospital {
    pub hpid: String,
    pub name: String,
    pub address: Option<String>,
    /// Top-level region (시/도), used for directory grouping.
    pub first_address: Option<String>,
    pub main_phone: Option<String>,
    pub emergency_phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A hospital returned by the nearby query, with its geodesic distance
/// from the search origin. Only hospitals with coordinates and a live
/// capacity record are returned, already sorted by distance.
#[derive(Debug, Clone, FromRow)]
pub struct NearbyHospital {
    pub hpid: String,
    pub name: String,
    pub address: Option<String>,
    pub main_phone: Option<String>,
    pub emergency_phone: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub distance_km: f64,
}

/// Real-time capacity snapshot for one hospital (1:1).
///
/// Counts are available-bed counters; `*ayn` columns are `Y`/`N`
/// equipment-availability flags. Refreshed out-of-band by the ingestion
/// job on a fixed cadence; this crate only reads them.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub hpid: String,
    /// General emergency-room beds currently available.
    pub hvec: i32,
    /// Operating rooms.
    pub hvoc: i32,
    /// General admission beds.
    pub hvgc: i32,
    /// General ICU beds.
    pub hvicc: i32,
    /// Neurological ICU beds.
    pub hvcc: i32,
    /// Thoracic-surgery ICU beds.
    pub hvccc: i32,
    /// Neonatal ICU beds.
    pub hvncc: i32,
    pub hvctayn: Option<String>,
    pub hvmriayn: Option<String>,
    pub hvangioayn: Option<String>,
    pub hvventiayn: Option<String>,
    pub hvventisoayn: Option<String>,
    pub hvecmoayn: Option<String>,
    pub hvcrrtayn: Option<String>,
    pub hvoxyayn: Option<String>,
    pub hvhypoayn: Option<String>,
    pub hvincuayn: Option<String>,
    pub hvamyn: Option<String>,
    pub hvs01: i32,
    pub hvs02: i32,
    pub hvs03: i32,
    pub hvs04: i32,
    pub hvs05: i32,
    pub hvs06: i32,
    pub hvs07: i32,
    pub hvs08: i32,
    /// Feed-side refresh timestamp, as delivered.
    pub hvidate: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// A single capacity field value, looked up by feed name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapacityValue<'a> {
    Count(i32),
    Flag(Option<&'a str>),
}

impl CapacityValue<'_> {
    /// Whether the resource counts as "available" for scoring: a positive
    /// count, or a flag equal to `Y` case-insensitively.
    pub fn is_available(&self) -> bool {
        match self {
            CapacityValue::Count(n) => *n > 0,
            CapacityValue::Flag(Some(s)) => s.eq_ignore_ascii_case("y"),
            CapacityValue::Flag(None) => false,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CapacityValue::Count(n) => Value::from(*n),
            CapacityValue::Flag(Some(s)) => Value::from(*s),
            CapacityValue::Flag(None) => Value::Null,
        }
    }
}

impl CapacityRecord {
    /// Dynamic field lookup by feed name. Returns `None` for names outside
    /// the documented vocabulary, which the scorer skips.
    pub fn field(&self, name: &str) -> Option<CapacityValue<'_>> {
        let value = match name {
            "hvec" => CapacityValue::Count(self.hvec),
            "hvoc" => CapacityValue::Count(self.hvoc),
            "hvgc" => CapacityValue::Count(self.hvgc),
            "hvicc" => CapacityValue::Count(self.hvicc),
            "hvcc" => CapacityValue::Count(self.hvcc),
            "hvccc" => CapacityValue::Count(self.hvccc),
            "hvncc" => CapacityValue::Count(self.hvncc),
            "hvs01" => CapacityValue::Count(self.hvs01),
            "hvs02" => CapacityValue::Count(self.hvs02),
            "hvs03" => CapacityValue::Count(self.hvs03),
            "hvs04" => CapacityValue::Count(self.hvs04),
            "hvs05" => CapacityValue::Count(self.hvs05),
            "hvs06" => CapacityValue::Count(self.hvs06),
            "hvs07" => CapacityValue::Count(self.hvs07),
            "hvs08" => CapacityValue::Count(self.hvs08),
            "hvctayn" => CapacityValue::Flag(self.hvctayn.as_deref()),
            "hvmriayn" => CapacityValue::Flag(self.hvmriayn.as_deref()),
            "hvangioayn" => CapacityValue::Flag(self.hvangioayn.as_deref()),
            "hvventiayn" => CapacityValue::Flag(self.hvventiayn.as_deref()),
            "hvventisoayn" => CapacityValue::Flag(self.hvventisoayn.as_deref()),
            "hvecmoayn" => CapacityValue::Flag(self.hvecmoayn.as_deref()),
            "hvcrrtayn" => CapacityValue::Flag(self.hvcrrtayn.as_deref()),
            "hvoxyayn" => CapacityValue::Flag(self.hvoxyayn.as_deref()),
            "hvhypoayn" => CapacityValue::Flag(self.hvhypoayn.as_deref()),
            "hvincuayn" => CapacityValue::Flag(self.hvincuayn.as_deref()),
            "hvamyn" => CapacityValue::Flag(self.hvamyn.as_deref()),
            _ => return None,
        };
        Some(value)
    }
}

/// Active severe-case broadcast for a hospital (e.g. "neurosurgery
/// unavailable tonight"), newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SevereMessage {
    pub message: Option<String>,
    pub message_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Severe message row with its owning hospital id, used for batch grouping.
#[derive(Debug, Clone, FromRow)]
pub struct SevereMessageRow {
    pub hpid: String,
    pub message: Option<String>,
    pub message_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-only review/bookmark aggregates for a hospital, optionally scoped
/// to a requesting user for the bookmark flag.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct HospitalEngagement {
    pub hpid: String,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub is_bookmarked: bool,
}

/// Persisted dialogue session. `collected` and `history` are opaque JSONB
/// payloads owned by the dialogue engine; `version` is the optimistic
/// concurrency counter bumped on every turn.
#[derive(Debug, Clone, FromRow)]
pub struct ChatSessionRow {
    pub session_id: Uuid,
    pub user_id: Option<Uuid>,
    pub state: String,
    pub collected: Value,
    pub history: Value,
    pub ai_model_used: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Symptom-search log row. Rows with non-null `recommended_fields` double
/// as the recommender cache, keyed by (symptoms, gender, age).
#[derive(Debug, Clone, FromRow)]
pub struct SearchLogRow {
    pub symptoms: String,
    pub gender: Option<String>,
    pub age: Option<String>,
    pub recommended_fields: Option<Value>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New search log entry.
#[derive(Debug, Clone)]
pub struct NewSearchLog {
    pub user_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: i32,
    pub symptoms: String,
    pub gender: Option<String>,
    pub age: Option<String>,
    pub recommended_fields: Value,
    pub comment: String,
}

/// Latest known location for a user.
#[derive(Debug, Clone, FromRow)]
pub struct UserLocation {
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub location_text: Option<String>,
    pub updated_at: DateTime<Utc>,
}
