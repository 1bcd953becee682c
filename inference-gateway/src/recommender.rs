//! Capacity-field recommendation via an OpenAI-compatible
//! chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use ranking_engine::{
    vocabulary_json, FieldRecommendation, FieldRecommender, RecommendError, SearchProfile,
    MAX_RECOMMENDED_FIELDS, WEIGHT_CEILING, WEIGHT_FLOOR,
};

const RECOMMEND_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Models that ignore "JSON only" wrap the payload in a markdown code
/// fence anyway; unwrap it before parsing.
fn strip_code_fences(content: &str) -> &str {
    if let Some(rest) = content.split("```json").nth(1) {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some(rest) = content.split("```").nth(1) {
        rest
    } else {
        content
    }
}

/// Client over the external reasoning model. One instance per process,
/// shared behind an `Arc`.
pub struct OpenAiRecommender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiRecommender {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    fn build_prompt(&self, profile: &SearchProfile) -> String {
        let mut user_info = format!("User info: Symptoms='{}'", profile.symptom_signature());
        if let Some(gender) = &profile.gender {
            user_info.push_str(&format!(", Gender='{gender}'"));
        }
        if let Some(age) = &profile.age {
            user_info.push_str(&format!(", Age='{age}'"));
        }

        format!(
            "{user_info}\n\n\
             Available Hospital Resource Fields (JSON):\n{fields}\n\n\
             Task:\n\
             1. Select TOP {top} fields relevant to the condition.\n\
             2. Assign scores ({ceiling} down to {floor}).\n\
             3. Provide a short reasoning comment (Korean) explaining why these fields are prioritized based on age, gender, and symptoms.\n\n\
             Output Format (JSON only):\n\
             {{\n\
                 \"fields\": {{\"hvec\": 30, \"hvctayn\": 28, ...}},\n\
                 \"comment\": \"환자는 30대 남성으로 심한 두통을 호소하므로 뇌출혈 등을 확인하기 위해 CT, MRI 가용 여부를 최우선으로 고려했습니다.\"\n\
             }}",
            fields = vocabulary_json(),
            top = MAX_RECOMMENDED_FIELDS,
            ceiling = WEIGHT_CEILING,
            floor = WEIGHT_FLOOR,
        )
    }
}

#[async_trait]
impl FieldRecommender for OpenAiRecommender {
    async fn recommend(
        &self,
        profile: &SearchProfile,
    ) -> Result<FieldRecommendation, RecommendError> {
        if self.api_key.is_empty() {
            return Err(RecommendError::Config("API key not set".to_string()));
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                json!({
                    "role": "developer",
                    "content": "You are a medical assistant. Return only JSON.",
                }),
                json!({ "role": "user", "content": self.build_prompt(profile) }),
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(RECOMMEND_TIMEOUT)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RecommendError::Timeout
                } else {
                    RecommendError::Http(err.to_string())
                }
            })?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| RecommendError::InvalidResponse(err.to_string()))?;

        let content = body
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| RecommendError::InvalidResponse("empty choices".to_string()))?;

        debug!(raw = %content, "Recommender response");

        let cleaned = strip_code_fences(content).trim();
        serde_json::from_str::<FieldRecommendation>(cleaned).map_err(|err| {
            warn!(error = %err, raw = %content, "Unparsable recommendation payload");
            RecommendError::InvalidResponse(err.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_is_unwrapped() {
        let fenced = "```json\n{\"fields\": {\"hvec\": 30}, \"comment\": \"ok\"}\n```";
        let parsed: FieldRecommendation =
            serde_json::from_str(strip_code_fences(fenced).trim()).unwrap();
        assert_eq!(parsed.fields.get("hvec"), Some(&30));
    }

    #[test]
    fn bare_fences_are_unwrapped_too() {
        let fenced = "```\n{\"fields\": {}, \"comment\": \"없음\"}\n```";
        let parsed: FieldRecommendation =
            serde_json::from_str(strip_code_fences(fenced).trim()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn unfenced_json_passes_through() {
        let raw = "{\"fields\": {\"hvicc\": 20}, \"comment\": \"중환자실 우선\"}";
        assert_eq!(strip_code_fences(raw), raw);
    }

    #[test]
    fn prompt_carries_profile_and_vocabulary() {
        let recommender =
            OpenAiRecommender::new("http://localhost/v1".to_string(), "key".to_string());
        let profile = SearchProfile {
            symptoms: vec!["두통".to_string()],
            gender: Some("M".to_string()),
            age: Some("30-40".to_string()),
        };
        let prompt = recommender.build_prompt(&profile);
        assert!(prompt.contains("Symptoms='두통'"));
        assert!(prompt.contains("Gender='M'"));
        assert!(prompt.contains("hvec"));
        assert!(prompt.contains("TOP 10"));
    }
}
