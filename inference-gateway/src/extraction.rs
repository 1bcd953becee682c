//! Structured-information extraction over llama.cpp `/completion`
//! servers, with an optional spot-instance failover tier.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dialogue_engine::{ExtractedRecord, InfoExtractor, Provenance};

use crate::error::{InferenceError, InferenceResult};
use crate::grammar::EXTRACTION_GRAMMAR;

/// Short messages containing any of these are answered without an
/// inference round-trip. Cuts cost and avoids hallucinated extractions
/// on contentless openers.
const GREETINGS: &[&str] = &[
    "안녕", "하이", "ㅎㅇ", "반가워", "누구", "시작", "test", "테스트", "hello", "hi",
];

const GREETING_MAX_CHARS: usize = 10;

const SYSTEM_PROMPT: &str = "당신은 응급 의료 AI입니다. 문장에서 필수 정보 {age, gender, symptoms}를 우선적으로 추출하고, 선택 정보 {is_self, history, special_note}는 확인되는 경우에만 추출하세요.";

const PRIMARY_TIMEOUT: Duration = Duration::from_secs(20);
const SECONDARY_TIMEOUT: Duration = Duration::from_secs(10);
const HYBRID_TIMEOUT: Duration = Duration::from_secs(5);

/// Which inference tiers serve extraction requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    /// Local CPU server only, generous timeout.
    PrimaryOnly,
    /// GPU server only.
    SecondaryOnly,
    /// Try the local server with a tight timeout, fail over to the GPU
    /// spot instance when it is down or busy.
    Hybrid,
}

impl ServiceMode {
    /// Unknown values fall back to the primary tier.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "ONLY_GPU" => ServiceMode::SecondaryOnly,
            "HYBRID_SPOT" => ServiceMode::Hybrid,
            _ => ServiceMode::PrimaryOnly,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    temperature: f64,
    n_predict: u32,
    stream: bool,
    stop: &'a [&'a str],
    grammar: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: String,
}

/// Only appends `/completion` when the configured URL does not already
/// point at the endpoint.
fn completion_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/completion") {
        base.to_string()
    } else {
        format!("{base}/completion")
    }
}

fn is_greeting(text: &str) -> bool {
    text.trim().chars().count() < GREETING_MAX_CHARS
        && GREETINGS.iter().any(|word| text.contains(word))
}

/// Long-lived client over one or two llama.cpp servers. Construct once
/// at startup and share behind an `Arc`.
pub struct InferenceEngine {
    client: reqwest::Client,
    primary_url: String,
    secondary_url: Option<String>,
    mode: ServiceMode,
}

impl InferenceEngine {
    pub fn new(primary_url: String, secondary_url: Option<String>, mode: ServiceMode) -> Self {
        Self {
            client: reqwest::Client::new(),
            primary_url,
            secondary_url,
            mode,
        }
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode
    }

    async fn post_completion(
        &self,
        url: &str,
        request: &CompletionRequest<'_>,
        timeout: Duration,
        reject_busy: bool,
    ) -> InferenceResult<String> {
        let response = self
            .client
            .post(url)
            .json(request)
            .timeout(timeout)
            .send()
            .await?;
        if reject_busy && response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(InferenceError::Busy);
        }
        let response = response.error_for_status()?;
        let body: CompletionResponse = response.json().await?;
        Ok(body.content)
    }

    /// Runs one completion according to the configured mode and reports
    /// which tier produced the answer.
    async fn complete(&self, prompt: &str) -> (InferenceResult<String>, Provenance) {
        let request = CompletionRequest {
            prompt,
            temperature: 0.1,
            n_predict: 256,
            stream: false,
            stop: &["<|im_end|>", "###"],
            grammar: EXTRACTION_GRAMMAR,
        };

        match self.mode {
            ServiceMode::PrimaryOnly => {
                let url = completion_url(&self.primary_url);
                let result = self
                    .post_completion(&url, &request, PRIMARY_TIMEOUT, false)
                    .await;
                (result, Provenance::Cpu)
            }
            ServiceMode::SecondaryOnly => {
                let Some(secondary) = &self.secondary_url else {
                    return (
                        Err(InferenceError::Config("secondary URL not set".into())),
                        Provenance::Error,
                    );
                };
                let url = completion_url(secondary);
                let result = self
                    .post_completion(&url, &request, SECONDARY_TIMEOUT, false)
                    .await;
                (result, Provenance::Gpu)
            }
            ServiceMode::Hybrid => {
                let url = completion_url(&self.primary_url);
                match self
                    .post_completion(&url, &request, HYBRID_TIMEOUT, true)
                    .await
                {
                    Ok(content) => (Ok(content), Provenance::Cpu),
                    Err(primary_err) => {
                        let Some(secondary) = &self.secondary_url else {
                            return (Err(primary_err), Provenance::Error);
                        };
                        warn!(error = %primary_err, "Primary inference tier unavailable, failing over");
                        // The spot tier is the last resort here, so it
                        // gets the full secondary budget rather than the
                        // tight window used on the local server.
                        let url = completion_url(secondary);
                        let result = self
                            .post_completion(&url, &request, SECONDARY_TIMEOUT, false)
                            .await;
                        (result, Provenance::Gpu)
                    }
                }
            }
        }
    }
}

#[async_trait]
impl InfoExtractor for InferenceEngine {
    async fn extract(&self, text: &str) -> (ExtractedRecord, Provenance) {
        if is_greeting(text) {
            debug!(message = text, "Greeting detected, skipping extraction");
            return (ExtractedRecord::default(), Provenance::None);
        }

        let prompt = format!(
            "<|im_start|>system\n{SYSTEM_PROMPT}<|im_end|>\n<|im_start|>user\n{text}<|im_end|>\n<|im_start|>assistant\n"
        );

        let (result, provenance) = self.complete(&prompt).await;
        let content = match result {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, "Extraction request failed");
                return (ExtractedRecord::default(), Provenance::Error);
            }
        };

        debug!(raw = %content, provenance = provenance.as_str(), "Extraction response");

        // The grammar guarantees well-formed JSON from a healthy
        // backend; anything else is treated as an empty extraction.
        match serde_json::from_str::<ExtractedRecord>(content.trim()) {
            Ok(record) => (record, provenance),
            Err(err) => {
                warn!(error = %err, raw = %content, "Unparsable extraction payload");
                (ExtractedRecord::default(), provenance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP stub answering every request with a fixed status
    /// and body. Returns the base URL to point the engine at.
    async fn spawn_backend(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 16 * 1024];
                    let mut seen = Vec::new();
                    loop {
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        seen.extend_from_slice(&buf[..n]);
                        if request_complete(&seen) {
                            break;
                        }
                    }
                    let response = format!(
                        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{addr}")
    }

    fn request_complete(raw: &[u8]) -> bool {
        let Some(split) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&raw[..split]);
        let content_length = headers
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        raw.len() - (split + 4) >= content_length
    }

    fn extraction_body() -> String {
        let content = r#"{"age": "30대", "gender": "남성", "symptoms": ["복통"], "is_self": true, "history": null, "special_note": null}"#;
        serde_json::json!({ "content": content }).to_string()
    }

    #[test]
    fn mode_parsing_defaults_to_primary() {
        assert_eq!(ServiceMode::parse("ONLY_CPU"), ServiceMode::PrimaryOnly);
        assert_eq!(ServiceMode::parse("only_gpu"), ServiceMode::SecondaryOnly);
        assert_eq!(ServiceMode::parse("HYBRID_SPOT"), ServiceMode::Hybrid);
        assert_eq!(ServiceMode::parse("whatever"), ServiceMode::PrimaryOnly);
    }

    #[test]
    fn completion_url_is_appended_once() {
        assert_eq!(
            completion_url("http://ai_server:8080"),
            "http://ai_server:8080/completion"
        );
        assert_eq!(
            completion_url("http://gpu:9000/completion/"),
            "http://gpu:9000/completion"
        );
    }

    #[test]
    fn short_greetings_are_filtered() {
        assert!(is_greeting("안녕"));
        assert!(is_greeting("하이~"));
        assert!(!is_greeting("안녕하세요 배가 너무 아파서 연락드려요"));
        assert!(!is_greeting("배가 아파요"));
    }

    #[tokio::test]
    async fn greeting_short_circuits_without_a_backend() {
        let engine = InferenceEngine::new(
            "http://127.0.0.1:1".to_string(),
            None,
            ServiceMode::PrimaryOnly,
        );
        let (record, provenance) = engine.extract("안녕").await;
        assert!(record.is_empty());
        assert_eq!(provenance, Provenance::None);
    }

    #[tokio::test]
    async fn unreachable_backend_yields_error_provenance() {
        let engine = InferenceEngine::new(
            "http://127.0.0.1:1".to_string(),
            None,
            ServiceMode::PrimaryOnly,
        );
        let (record, provenance) = engine.extract("30대 남성이고 배가 아파요").await;
        assert!(record.is_empty());
        assert_eq!(provenance, Provenance::Error);
    }

    #[test]
    fn failover_budget_exceeds_the_hybrid_window() {
        assert!(SECONDARY_TIMEOUT > HYBRID_TIMEOUT);
    }

    #[tokio::test]
    async fn hybrid_mode_fails_over_when_the_primary_is_down() {
        let secondary = spawn_backend("200 OK", extraction_body()).await;
        let engine = InferenceEngine::new(
            "http://127.0.0.1:1".to_string(),
            Some(secondary),
            ServiceMode::Hybrid,
        );

        let (record, provenance) = engine.extract("30대 남성이고 배가 아파요").await;
        assert_eq!(provenance, Provenance::Gpu);
        assert_eq!(record.age.as_deref(), Some("30대"));
        assert_eq!(record.symptoms, vec!["복통".to_string()]);
    }

    #[tokio::test]
    async fn hybrid_mode_treats_busy_primary_as_a_failure() {
        let primary = spawn_backend("503 Service Unavailable", "{}".to_string()).await;
        let secondary = spawn_backend("200 OK", extraction_body()).await;
        let engine = InferenceEngine::new(primary, Some(secondary), ServiceMode::Hybrid);

        let (record, provenance) = engine.extract("30대 남성이고 배가 아파요").await;
        assert_eq!(provenance, Provenance::Gpu);
        assert!(!record.is_empty());
    }
}
