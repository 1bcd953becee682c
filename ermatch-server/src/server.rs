use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::{Pool, Postgres};

use dialogue_engine::DialogueStateMachine;
use hospital_data::{
    HospitalRepository, SearchLogRepository, SessionRepository, UserRepository,
};
use inference_gateway::{InferenceEngine, OpenAiRecommender, ServiceMode};
use ranking_engine::FieldRecommender;

/// Main ER-Match server state
#[derive(Clone)]
pub struct ErMatchServer {
    pub config: ServerConfig,
    pub db_pool: Pool<Postgres>,
    pub hospitals: HospitalRepository,
    pub sessions: SessionRepository,
    pub search_logs: SearchLogRepository,
    pub users: UserRepository,
    /// Dialogue state machine over the configured extraction backends.
    pub machine: Arc<DialogueStateMachine>,
    /// External field recommender for symptom searches.
    pub recommender: Arc<dyn FieldRecommender>,
}

/// Server configuration, loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub max_db_connections: u32,
    /// llama.cpp completion server (CPU tier)
    pub ai_server_url: String,
    /// Optional GPU spot-instance tier
    pub gpu_ai_server_url: Option<String>,
    pub ai_service_mode: ServiceMode,
    /// OpenAI-compatible chat-completions endpoint
    pub openai_api_url: String,
    pub openai_api_key: String,
    /// Idle minutes before an active session is expired on reuse
    pub session_idle_minutes: i64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_db_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let ai_server_url =
            env::var("AI_SERVER_URL").unwrap_or_else(|_| "http://ai_server:8080".to_string());
        let gpu_ai_server_url = env::var("GPU_AI_SERVER_URL").ok();
        let ai_service_mode = ServiceMode::parse(
            &env::var("AI_SERVICE_MODE").unwrap_or_else(|_| "ONLY_CPU".to_string()),
        );
        let openai_api_url = env::var("OPENAI_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        let openai_api_key = env::var("OPENAI_KEY").unwrap_or_default();
        let session_idle_minutes = env::var("SESSION_IDLE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            max_db_connections,
            ai_server_url,
            gpu_ai_server_url,
            ai_service_mode,
            openai_api_url,
            openai_api_key,
            session_idle_minutes,
        })
    }
}

impl ErMatchServer {
    /// Create a new server instance: connect the pool and build the
    /// long-lived inference clients once.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let db_pool = hospital_data::connect(&config.database_url, config.max_db_connections)
            .await
            .context("failed to connect to database")?;

        let extractor = Arc::new(InferenceEngine::new(
            config.ai_server_url.clone(),
            config.gpu_ai_server_url.clone(),
            config.ai_service_mode,
        ));
        let machine = Arc::new(DialogueStateMachine::new(extractor));

        let recommender: Arc<dyn FieldRecommender> = Arc::new(OpenAiRecommender::new(
            config.openai_api_url.clone(),
            config.openai_api_key.clone(),
        ));

        Ok(Self {
            hospitals: HospitalRepository::new(db_pool.clone()),
            sessions: SessionRepository::new(db_pool.clone()),
            search_logs: SearchLogRepository::new(db_pool.clone()),
            users: UserRepository::new(db_pool.clone()),
            machine,
            recommender,
            db_pool,
            config,
        })
    }
}
