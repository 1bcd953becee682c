//! Raw score computation for one hospital's capacity snapshot.

use hospital_data::CapacityRecord;

use crate::recommend::FieldRecommendation;
use crate::vocabulary::describe;

/// Fixed offset added once any general ER bed is available.
pub const BED_BASE_SCORE: i64 = 40;
/// Per-available-bed bonus on top of the offset.
pub const BED_UNIT_SCORE: i64 = 5;

/// Compute the raw relevance score and its human-readable breakdown.
///
/// Baseline: zero when no general ER beds are free, otherwise
/// `BED_BASE_SCORE + BED_UNIT_SCORE × beds`. Each recommended field that
/// exists on the record and is available adds its weight. Ranking with an
/// empty recommendation therefore degrades to bed-count-only.
pub fn score_capacity(
    capacity: &CapacityRecord,
    recommendation: &FieldRecommendation,
) -> (i64, Vec<String>) {
    let mut score: i64 = 0;
    let mut reasons = Vec::new();

    if capacity.hvec > 0 {
        let bed_score = BED_BASE_SCORE + BED_UNIT_SCORE * i64::from(capacity.hvec);
        score += bed_score;
        reasons.push(format!("응급실 일반 병상 {}개 (+{}점)", capacity.hvec, bed_score));
    } else {
        reasons.push("응급실 일반 병상 없음 (0점)".to_string());
    }

    for (field, weight) in &recommendation.fields {
        let Some(value) = capacity.field(field) else {
            continue;
        };
        if value.is_available() {
            score += i64::from(*weight);
            reasons.push(format!("추천 장비/시설: {} 보유 (+{}점)", describe(field), weight));
        }
    }

    (score, reasons)
}

/// Normalize a raw score to the 0–100 integer scale relative to the batch
/// maximum. A zero maximum maps everything to zero.
pub fn normalize_score(raw: i64, max: i64) -> i32 {
    if max <= 0 {
        return 0;
    }
    ((raw as f64 / max as f64) * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    fn capacity(hvec: i32) -> CapacityRecord {
        CapacityRecord {
            hpid: "A0000001".to_string(),
            hvec,
            hvoc: 0,
            hvgc: 0,
            hvicc: 0,
            hvcc: 0,
            hvccc: 0,
            hvncc: 0,
            hvctayn: None,
            hvmriayn: None,
            hvangioayn: None,
            hvventiayn: None,
            hvventisoayn: None,
            hvecmoayn: None,
            hvcrrtayn: None,
            hvoxyayn: None,
            hvhypoayn: None,
            hvincuayn: None,
            hvamyn: None,
            hvs01: 0,
            hvs02: 0,
            hvs03: 0,
            hvs04: 0,
            hvs05: 0,
            hvs06: 0,
            hvs07: 0,
            hvs08: 0,
            hvidate: None,
            last_updated: Utc::now(),
        }
    }

    fn recommendation(fields: &[(&str, i32)]) -> FieldRecommendation {
        FieldRecommendation {
            fields: fields
                .iter()
                .map(|(name, weight)| ((*name).to_string(), *weight))
                .collect::<BTreeMap<_, _>>(),
            comment: String::new(),
        }
    }

    #[test]
    fn no_beds_scores_zero_baseline() {
        let (score, reasons) = score_capacity(&capacity(0), &FieldRecommendation::default());
        assert_eq!(score, 0);
        assert_eq!(reasons, vec!["응급실 일반 병상 없음 (0점)".to_string()]);
    }

    #[test]
    fn bed_baseline_is_offset_plus_per_bed_bonus() {
        let (score, _) = score_capacity(&capacity(3), &FieldRecommendation::default());
        assert_eq!(score, 40 + 3 * 5);
    }

    #[test]
    fn available_recommended_fields_add_their_weight() {
        let mut record = capacity(1);
        record.hvctayn = Some("Y".to_string());
        record.hvmriayn = Some("N".to_string());
        let rec = recommendation(&[("hvctayn", 30), ("hvmriayn", 28), ("hvicc", 20)]);

        let (score, reasons) = score_capacity(&record, &rec);
        // beds: 45; CT available: +30; MRI flagged N and empty ICU add nothing.
        assert_eq!(score, 45 + 30);
        assert!(reasons.iter().any(|r| r.contains("CT")));
        assert!(!reasons.iter().any(|r| r.contains("MRI")));
    }

    #[test]
    fn unknown_recommended_fields_are_skipped() {
        let rec = recommendation(&[("made_up_field", 30)]);
        let (score, _) = score_capacity(&capacity(1), &rec);
        assert_eq!(score, 45);
    }

    #[test]
    fn normalization_handles_zero_max() {
        assert_eq!(normalize_score(0, 0), 0);
        assert_eq!(normalize_score(50, 0), 0);
    }

    #[test]
    fn normalization_pins_the_max_at_100() {
        assert_eq!(normalize_score(85, 85), 100);
        assert_eq!(normalize_score(42, 85), 49);
    }
}
