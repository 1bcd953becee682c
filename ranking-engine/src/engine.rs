//! Candidate assembly and the two sorted ranking views.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use hospital_data::{CapacityRecord, HospitalEngagement, NearbyHospital, SevereMessage};

use crate::recommend::FieldRecommendation;
use crate::score::{normalize_score, score_capacity};

/// Fixed search radius; not caller-configurable.
pub const SEARCH_RADIUS_KM: f64 = 50.0;

/// Never return fewer than this many hospitals when any exist at all.
pub const MIN_RESULTS: usize = 5;

/// One hospital entering the ranking: nearby-query row plus its live
/// capacity and per-hospital extras.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub hospital: NearbyHospital,
    pub capacity: CapacityRecord,
    pub severe_messages: Vec<SevereMessage>,
    pub engagement: Option<HospitalEngagement>,
}

/// One scored result entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RankedHospital {
    pub hpid: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub er_phone: Option<String>,
    pub distance: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Available general ER beds, surfaced as a headline number.
    pub hvec: i32,
    /// Standard ER bed baseline for the same headline.
    pub hvs01: i32,
    pub hvctayn: Option<String>,
    pub description: Option<String>,
    pub raw_score: i64,
    /// 0–100, relative to the best raw score in this batch.
    pub score: i32,
    /// Raw capacity values for every recommended field.
    pub ai_matches: BTreeMap<String, Value>,
    pub matched_reasons: Vec<String>,
    pub severe_messages: Vec<SevereMessage>,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub is_bookmarked: bool,
}

/// The two views every search returns.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RankedResults {
    pub by_distance: Vec<RankedHospital>,
    pub by_score: Vec<RankedHospital>,
}

/// Radius cut with graceful degradation: keep the strictly-within-radius
/// set when it is large enough, otherwise the `MIN_RESULTS` nearest
/// regardless of radius. Input must already be distance-sorted.
pub fn filter_by_radius(hospitals: Vec<NearbyHospital>, radius_km: f64) -> Vec<NearbyHospital> {
    let within: Vec<NearbyHospital> = hospitals
        .iter()
        .filter(|h| h.distance_km <= radius_km)
        .cloned()
        .collect();
    if within.len() >= MIN_RESULTS {
        within
    } else {
        hospitals.into_iter().take(MIN_RESULTS).collect()
    }
}

/// Score every candidate, normalize against the batch maximum and build
/// both sorted views.
pub fn rank(candidates: Vec<Candidate>, recommendation: &FieldRecommendation) -> RankedResults {
    let mut scored: Vec<RankedHospital> = Vec::with_capacity(candidates.len());
    let mut max_raw: i64 = 0;

    for candidate in candidates {
        let (raw_score, matched_reasons) = score_capacity(&candidate.capacity, recommendation);
        max_raw = max_raw.max(raw_score);

        let mut ai_matches = BTreeMap::new();
        for field in recommendation.fields.keys() {
            let value = candidate
                .capacity
                .field(field)
                .map_or(Value::from(0), |v| v.to_json());
            ai_matches.insert(field.clone(), value);
        }

        let (average_rating, review_count, is_bookmarked) = match &candidate.engagement {
            Some(engagement) => (
                engagement.average_rating,
                engagement.review_count,
                engagement.is_bookmarked,
            ),
            None => (None, 0, false),
        };

        scored.push(RankedHospital {
            hpid: candidate.hospital.hpid,
            name: candidate.hospital.name,
            address: candidate.hospital.address,
            phone: candidate.hospital.main_phone,
            er_phone: candidate.hospital.emergency_phone,
            distance: candidate.hospital.distance_km,
            latitude: candidate.hospital.latitude,
            longitude: candidate.hospital.longitude,
            hvec: candidate.capacity.hvec,
            hvs01: candidate.capacity.hvs01,
            hvctayn: candidate.capacity.hvctayn.clone(),
            description: candidate.hospital.description,
            raw_score,
            score: 0,
            ai_matches,
            matched_reasons,
            severe_messages: candidate.severe_messages,
            average_rating,
            review_count,
            is_bookmarked,
        });
    }

    for entry in &mut scored {
        entry.score = normalize_score(entry.raw_score, max_raw);
    }

    let mut by_distance = scored.clone();
    by_distance.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut by_score = scored;
    by_score.sort_by(|a, b| b.score.cmp(&a.score));

    RankedResults { by_distance, by_score }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn nearby(hpid: &str, distance_km: f64) -> NearbyHospital {
        NearbyHospital {
            hpid: hpid.to_string(),
            name: format!("{hpid} 병원"),
            address: None,
            main_phone: None,
            emergency_phone: None,
            latitude: 37.5,
            longitude: 127.0,
            description: None,
            distance_km,
        }
    }

    fn capacity(hpid: &str, hvec: i32) -> CapacityRecord {
        CapacityRecord {
            hpid: hpid.to_string(),
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

    fn candidate(hpid: &str, distance_km: f64, hvec: i32) -> Candidate {
        Candidate {
            hospital: nearby(hpid, distance_km),
            capacity: capacity(hpid, hvec),
            severe_messages: Vec::new(),
            engagement: None,
        }
    }

    #[test]
    fn radius_fallback_keeps_at_least_five() {
        // 3 within 50 km, 10 total: expect the 5 nearest overall.
        let hospitals: Vec<NearbyHospital> = (0..10)
            .map(|i| nearby(&format!("H{i}"), 10.0 + 20.0 * i as f64))
            .collect();
        let kept = filter_by_radius(hospitals, SEARCH_RADIUS_KM);
        assert_eq!(kept.len(), MIN_RESULTS);
        assert_eq!(kept[3].hpid, "H3");
        assert_eq!(kept[4].hpid, "H4");
    }

    #[test]
    fn enough_within_radius_keeps_them_all() {
        let hospitals: Vec<NearbyHospital> =
            (0..8).map(|i| nearby(&format!("H{i}"), 2.0 * (i + 1) as f64)).collect();
        let kept = filter_by_radius(hospitals, SEARCH_RADIUS_KM);
        assert_eq!(kept.len(), 8);
    }

    #[test]
    fn all_zero_scores_normalize_to_zero() {
        let results = rank(
            vec![candidate("A", 1.0, 0), candidate("B", 2.0, 0)],
            &FieldRecommendation::default(),
        );
        assert!(results.by_score.iter().all(|h| h.score == 0));
        assert!(results.by_score.iter().all(|h| h.raw_score == 0));
    }

    #[test]
    fn unique_maximum_normalizes_to_exactly_100() {
        let results = rank(
            vec![candidate("A", 1.0, 1), candidate("B", 2.0, 4), candidate("C", 3.0, 2)],
            &FieldRecommendation::default(),
        );
        assert_eq!(results.by_score[0].hpid, "B");
        assert_eq!(results.by_score[0].score, 100);
        assert!(results.by_score[1].score < 100);
    }

    #[test]
    fn views_are_sorted_each_their_own_way() {
        let results = rank(
            vec![candidate("FAR", 30.0, 9), candidate("NEAR", 1.0, 1)],
            &FieldRecommendation::default(),
        );
        assert_eq!(results.by_distance[0].hpid, "NEAR");
        assert_eq!(results.by_score[0].hpid, "FAR");
    }

    #[test]
    fn ai_matches_carry_raw_values_for_recommended_fields() {
        let mut rec = FieldRecommendation::default();
        rec.fields.insert("hvctayn".to_string(), 30);
        rec.fields.insert("hvicc".to_string(), 20);

        let mut one = candidate("A", 1.0, 2);
        one.capacity.hvctayn = Some("Y".to_string());
        one.capacity.hvicc = 3;

        let results = rank(vec![one], &rec);
        let entry = &results.by_score[0];
        assert_eq!(entry.ai_matches.get("hvctayn"), Some(&Value::from("Y")));
        assert_eq!(entry.ai_matches.get("hvicc"), Some(&Value::from(3)));
    }
}
