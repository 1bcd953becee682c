//! Field-specific merge rules for folding a fresh extraction into the
//! session's accumulated data.

use crate::types::{CollectedData, ExtractedRecord};

/// Sentinel the extractor emits when it saw the history question answered
/// with "nothing notable"; never worth overwriting real history with.
pub const NO_FINDINGS: &str = "특이사항 없음";

/// Merge `extracted` into `collected`.
///
/// Rules per field: age / gender / is_self / special_note overwrite only
/// when the new value is present; history additionally skips the
/// no-findings sentinel; symptoms are a set union and are never replaced
/// wholesale. Idempotent under duplicate extractions.
pub fn merge_extracted(collected: &mut CollectedData, extracted: &ExtractedRecord) {
    if let Some(age) = &extracted.age {
        if !age.trim().is_empty() {
            collected.age = Some(age.clone());
        }
    }
    if let Some(gender) = &extracted.gender {
        if !gender.trim().is_empty() {
            collected.gender = Some(gender.clone());
        }
    }
    for symptom in &extracted.symptoms {
        if !symptom.trim().is_empty() {
            collected.symptoms.insert(symptom.clone());
        }
    }
    if let Some(is_self) = extracted.is_self {
        collected.is_self = Some(is_self);
    }
    if let Some(history) = &extracted.history {
        if !history.trim().is_empty() && history != NO_FINDINGS {
            collected.history = Some(history.clone());
        }
    }
    if let Some(note) = &extracted.special_note {
        if !note.trim().is_empty() {
            collected.special_note = Some(note.clone());
        }
    }
}
