use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};
use crate::models::ChatSessionRow;

/// Repository for dialogue sessions.
///
/// Turn updates are guarded by the `version` counter: the state machine is
/// read-modify-write over shared session state, so a concurrent turn for
/// the same session surfaces as [`DatabaseError::VersionConflict`] instead
/// of silently losing a transition.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: Pool<Postgres>,
}

const SESSION_COLUMNS: &str = "session_id, user_id, state, collected, history, \
                               ai_model_used, version, created_at, updated_at";

impl SessionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, session_id: Uuid) -> DatabaseResult<Option<ChatSessionRow>> {
        let session = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Fetch a session only when it belongs to the given user.
    pub async fn get_owned(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> DatabaseResult<Option<ChatSessionRow>> {
        let session = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE session_id = $1 AND user_id = $2"
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Most recently touched non-terminal session for a user.
    pub async fn latest_active_for_user(
        &self,
        user_id: Uuid,
    ) -> DatabaseResult<Option<ChatSessionRow>> {
        let session = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE user_id = $1 AND state <> 'DONE' \
             ORDER BY updated_at DESC \
             LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn create(&self, user_id: Option<Uuid>) -> DatabaseResult<ChatSessionRow> {
        let session = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "INSERT INTO chat_sessions (session_id, user_id, state, collected, history, ai_model_used, version) \
             VALUES ($1, $2, 'INIT', '{{}}'::jsonb, '[]'::jsonb, 'NONE', 0) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    /// Bind an anonymous session to a user on first authenticated message.
    pub async fn bind_user(&self, session_id: Uuid, user_id: Uuid) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE chat_sessions SET user_id = $2, updated_at = NOW() \
             WHERE session_id = $1 AND user_id IS NULL",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist the outcome of a turn, requiring the version observed at
    /// read time. Zero rows affected means either a concurrent writer won
    /// or the session vanished.
    pub async fn update_turn(
        &self,
        session_id: Uuid,
        expected_version: i64,
        state: &str,
        collected: &Value,
        history: &Value,
        ai_model_used: &str,
    ) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE chat_sessions \
             SET state = $3, collected = $4, history = $5, ai_model_used = $6, \
                 version = version + 1, updated_at = NOW() \
             WHERE session_id = $1 AND version = $2",
        )
        .bind(session_id)
        .bind(expected_version)
        .bind(state)
        .bind(collected)
        .bind(history)
        .bind(ai_model_used)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(session_id).await? {
                Some(_) => Err(DatabaseError::VersionConflict(session_id)),
                None => Err(DatabaseError::SessionNotFound),
            };
        }
        Ok(())
    }

    /// Force a session to the terminal state, bypassing the version check
    /// (used for idle-timeout expiry and the explicit finish endpoint).
    pub async fn mark_done(&self, session_id: Uuid) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET state = 'DONE', version = version + 1, updated_at = NOW() \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::SessionNotFound);
        }
        Ok(())
    }

    /// Whether the session's last update is older than the given cutoff.
    pub fn is_idle_since(session: &ChatSessionRow, cutoff: DateTime<Utc>) -> bool {
        session.updated_at < cutoff
    }
}
