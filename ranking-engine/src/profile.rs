use serde::{Deserialize, Serialize};

/// Symptom/demographic profile a search ranks against. The signature is
/// the recommender cache key, so symptom ordering must not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProfile {
    pub symptoms: Vec<String>,
    pub gender: Option<String>,
    pub age: Option<String>,
}

impl SearchProfile {
    pub fn new(symptoms: Vec<String>, gender: Option<String>, age: Option<String>) -> Self {
        Self { symptoms, gender, age }
    }

    /// Order-stable symptom component of the cache signature.
    pub fn symptom_signature(&self) -> String {
        let mut sorted: Vec<&str> = self.symptoms.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_stable_under_reordering() {
        let a = SearchProfile::new(
            vec!["두통".to_string(), "복통".to_string()],
            Some("M".to_string()),
            Some("30-40".to_string()),
        );
        let b = SearchProfile::new(
            vec!["복통".to_string(), "두통".to_string()],
            Some("M".to_string()),
            Some("30-40".to_string()),
        );
        assert_eq!(a.symptom_signature(), b.symptom_signature());
    }

    #[test]
    fn empty_profile_has_empty_signature() {
        assert_eq!(SearchProfile::default().symptom_signature(), "");
    }
}
