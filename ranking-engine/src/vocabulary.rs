//! The documented vocabulary of capacity-record fields the recommender is
//! allowed to pick from. Field names match the national feed columns;
//! descriptions are what both the recommender prompt and matched-reason
//! strings show to humans.

use serde_json::{Map, Value};

pub const FIELD_DESCRIPTIONS: &[(&str, &str)] = &[
    ("hvec", "응급실 일반 병상"),
    ("hvoc", "수술실"),
    ("hvgc", "일반 입원실"),
    ("hvicc", "일반 중환자실"),
    ("hvcc", "신경과 중환자실"),
    ("hvccc", "흉부외과 중환자실"),
    ("hvncc", "신생아 중환자실"),
    ("hvctayn", "CT 촬영 가능"),
    ("hvmriayn", "MRI 촬영 가능"),
    ("hvangioayn", "혈관촬영기 사용 가능"),
    ("hvventiayn", "인공호흡기 보유"),
    ("hvventisoayn", "소아용 인공호흡기 보유"),
    ("hvecmoayn", "ECMO(체외막산소공급) 가능"),
    ("hvcrrtayn", "CRRT(지속적신대체요법) 가능"),
    ("hvoxyayn", "고압산소치료기 보유"),
    ("hvhypoayn", "저체온치료 가능"),
    ("hvincuayn", "인큐베이터 보유"),
    ("hvamyn", "구급차 가용"),
    ("hvs01", "응급실 기준 병상"),
    ("hvs02", "응급실 음압 격리 병상"),
    ("hvs03", "응급실 일반 격리 병상"),
    ("hvs04", "소아 응급 전용 병상"),
    ("hvs05", "소아 음압 격리 병상"),
    ("hvs06", "소아 일반 격리 병상"),
    ("hvs07", "외상 소생실"),
    ("hvs08", "응급 전용 수술실"),
];

/// Human description for a field, falling back to the raw name for
/// anything outside the vocabulary.
pub fn describe(field: &str) -> &str {
    FIELD_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == field)
        .map_or(field, |(_, description)| *description)
}

/// The vocabulary as a JSON object, in the shape the recommender prompt
/// embeds.
pub fn vocabulary_json() -> Value {
    let mut map = Map::new();
    for (name, description) in FIELD_DESCRIPTIONS {
        map.insert((*name).to_string(), Value::from(*description));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_known_and_unknown_fields() {
        assert_eq!(describe("hvec"), "응급실 일반 병상");
        assert_eq!(describe("hv_does_not_exist"), "hv_does_not_exist");
    }

    #[test]
    fn vocabulary_json_covers_all_fields() {
        let json = vocabulary_json();
        assert_eq!(
            json.as_object().map(|o| o.len()),
            Some(FIELD_DESCRIPTIONS.len())
        );
    }
}
