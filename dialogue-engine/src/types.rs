//! Core dialogue data types: states, accumulated session data, extraction
//! records and the terminal search payload.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Dialogue protocol state. `Init` behaves as `CollectBasicInfo` on entry;
/// nothing transitions out of `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DialogueState {
    Init,
    CollectBasicInfo,
    CheckHistory,
    CheckLocation,
    Confirm,
    Done,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Init => "INIT",
            DialogueState::CollectBasicInfo => "COLLECT_BASIC_INFO",
            DialogueState::CheckHistory => "CHECK_HISTORY",
            DialogueState::CheckLocation => "CHECK_LOCATION",
            DialogueState::Confirm => "CONFIRM",
            DialogueState::Done => "DONE",
        }
    }

    pub fn parse(value: &str) -> Option<DialogueState> {
        match value {
            "INIT" => Some(DialogueState::Init),
            "COLLECT_BASIC_INFO" => Some(DialogueState::CollectBasicInfo),
            "CHECK_HISTORY" => Some(DialogueState::CheckHistory),
            "CHECK_LOCATION" => Some(DialogueState::CheckLocation),
            "CONFIRM" => Some(DialogueState::Confirm),
            "DONE" => Some(DialogueState::Done),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DialogueState::Done)
    }
}

/// Which inference backend answered the latest extraction, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provenance {
    Cpu,
    Gpu,
    None,
    Error,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Cpu => "CPU",
            Provenance::Gpu => "GPU",
            Provenance::None => "NONE",
            Provenance::Error => "ERROR",
        }
    }
}

/// Best-effort structured record extracted from one utterance. Transient:
/// merged into [`CollectedData`], never stored directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedRecord {
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub is_self: Option<bool>,
    #[serde(default)]
    pub history: Option<String>,
    #[serde(default)]
    pub special_note: Option<String>,
}

impl ExtractedRecord {
    pub fn is_empty(&self) -> bool {
        self.age.is_none()
            && self.gender.is_none()
            && self.symptoms.is_empty()
            && self.is_self.is_none()
            && self.history.is_none()
            && self.special_note.is_none()
    }
}

/// Session-accumulated intake data. Fields are only added or overwritten,
/// never deleted; symptoms grow by set union.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedData {
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub symptoms: BTreeSet<String>,
    #[serde(default)]
    pub is_self: Option<bool>,
    #[serde(default)]
    pub history: Option<String>,
    #[serde(default)]
    pub special_note: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
}

impl CollectedData {
    pub fn has_symptoms(&self) -> bool {
        !self.symptoms.is_empty()
    }

    pub fn set_location(&mut self, point: &GeoPoint) {
        self.latitude = Some(point.latitude);
        self.longitude = Some(point.longitude);
        self.location = Some(point.label.clone().unwrap_or_else(|| "설정된 위치".to_string()));
    }
}

/// A point with an optional human-readable label, used both for explicit
/// location pushes and for the owner's stored location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub label: Option<String>,
}

/// One audit-log turn of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// Normalized gender code carried in the terminal payload. Ambiguous or
/// missing input maps to `U` rather than silently defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenderCode {
    Male,
    Female,
    Unknown,
}

impl GenderCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderCode::Male => "M",
            GenderCode::Female => "F",
            GenderCode::Unknown => "U",
        }
    }
}

/// Normalize a raw extracted gender token.
pub fn normalize_gender(raw: Option<&str>) -> GenderCode {
    let Some(raw) = raw else {
        return GenderCode::Unknown;
    };
    let token = raw.trim();
    if ["남성", "남", "남자"].contains(&token) || token.eq_ignore_ascii_case("m") || token.eq_ignore_ascii_case("male") {
        GenderCode::Male
    } else if ["여성", "여", "여자"].contains(&token) || token.eq_ignore_ascii_case("f") || token.eq_ignore_ascii_case("female") {
        GenderCode::Female
    } else {
        GenderCode::Unknown
    }
}

/// Canonicalize an age expression to the bucketed range form (`"30-40"`).
/// Accepts an existing bucket, a Korean decade (`"30대"`) or a bare number
/// (`"34"`); anything else passes through trimmed.
pub fn normalize_age_bucket(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some((low, high)) = trimmed.split_once('-') {
        if !low.is_empty()
            && !high.is_empty()
            && low.chars().all(|c| c.is_ascii_digit())
            && high.chars().all(|c| c.is_ascii_digit())
        {
            return trimmed.to_string();
        }
    }

    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    let is_decade = trimmed.ends_with('대');
    let is_bare_number = digits.chars().count() == trimmed.chars().count();
    if !digits.is_empty() && (is_decade || is_bare_number) {
        if let Ok(n) = digits.parse::<u32>() {
            let lower = if is_decade { n } else { n / 10 * 10 };
            return format!("{}-{}", lower, lower + 10);
        }
    }

    trimmed.to_string()
}

/// The search-ready object emitted once the dialogue reaches `DONE`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinalPayload {
    pub symptom: Vec<String>,
    /// `M`, `F` or `U`.
    pub gender: String,
    pub age: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_self: bool,
    pub history: Option<String>,
    pub special_note: Option<String>,
}

impl FinalPayload {
    pub fn from_collected(collected: &CollectedData) -> Self {
        Self {
            symptom: collected.symptoms.iter().cloned().collect(),
            gender: normalize_gender(collected.gender.as_deref()).as_str().to_string(),
            age: collected.age.as_deref().map(normalize_age_bucket),
            latitude: collected.latitude,
            longitude: collected.longitude,
            is_self: collected.is_self.unwrap_or(true),
            history: collected.history.clone(),
            special_note: collected.special_note.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_strings() {
        for state in [
            DialogueState::Init,
            DialogueState::CollectBasicInfo,
            DialogueState::CheckHistory,
            DialogueState::CheckLocation,
            DialogueState::Confirm,
            DialogueState::Done,
        ] {
            assert_eq!(DialogueState::parse(state.as_str()), Some(state));
        }
        assert_eq!(DialogueState::parse("NO_SUCH_STATE"), None);
    }

    #[test]
    fn gender_normalization_defaults_to_unknown() {
        assert_eq!(normalize_gender(Some("남성")), GenderCode::Male);
        assert_eq!(normalize_gender(Some("male")), GenderCode::Male);
        assert_eq!(normalize_gender(Some("여자")), GenderCode::Female);
        assert_eq!(normalize_gender(Some("모름")), GenderCode::Unknown);
        assert_eq!(normalize_gender(None), GenderCode::Unknown);
    }

    #[test]
    fn age_bucket_canonicalization() {
        assert_eq!(normalize_age_bucket("30-40"), "30-40");
        assert_eq!(normalize_age_bucket("30대"), "30-40");
        assert_eq!(normalize_age_bucket("34"), "30-40");
        assert_eq!(normalize_age_bucket(" 67 "), "60-70");
        assert_eq!(normalize_age_bucket("갓난아기"), "갓난아기");
    }

    #[test]
    fn collected_data_survives_json_round_trip() {
        let mut collected = CollectedData::default();
        collected.age = Some("30-40".to_string());
        collected.symptoms.insert("두통".to_string());
        let value = serde_json::to_value(&collected).unwrap();
        let back: CollectedData = serde_json::from_value(value).unwrap();
        assert_eq!(back, collected);
    }
}
