//! Session policy and turn orchestration around the dialogue engine.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use dialogue_engine::{
    machine::messages, ChatTurn, CollectedData, DialogueState, FinalPayload, GeoPoint, Provenance,
    TurnContext,
};
use hospital_data::{ChatSessionRow, SessionRepository};

use crate::error::ApiError;
use crate::server::ErMatchServer;

/// One chat turn reply, also embedded in the location-push response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurnResponse {
    pub session_id: Uuid,
    pub message: String,
    pub state: String,
    pub is_finished: bool,
    pub find_loc: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_data: Option<FinalPayload>,
    pub ai_model: String,
}

pub struct ChatService<'a> {
    server: &'a ErMatchServer,
}

impl<'a> ChatService<'a> {
    pub fn new(server: &'a ErMatchServer) -> Self {
        Self { server }
    }

    /// Process one user turn: resolve or create the session, advance the
    /// state machine, persist collected data and history under the
    /// session's version guard.
    pub async fn process_turn(
        &self,
        session_id: Option<Uuid>,
        message: String,
        user_id: Option<Uuid>,
    ) -> Result<ChatTurnResponse, ApiError> {
        let session = self.resolve_session(session_id, user_id).await?;

        let state = DialogueState::parse(&session.state)
            .ok_or_else(|| ApiError::internal(format!("unknown session state {}", session.state)))?;

        let mut collected: CollectedData = serde_json::from_value(session.collected.clone())
            .map_err(|e| ApiError::internal(format!("corrupt session data: {e}")))?;
        let mut history: Vec<ChatTurn> = serde_json::from_value(session.history.clone())
            .map_err(|e| ApiError::internal(format!("corrupt session history: {e}")))?;

        let user_location = match user_id {
            Some(user_id) => self
                .server
                .users
                .latest_location(user_id)
                .await?
                .map(|loc| GeoPoint {
                    latitude: loc.latitude,
                    longitude: loc.longitude,
                    label: loc.location_text,
                }),
            None => None,
        };

        let ctx = TurnContext {
            message: message.clone(),
            location_override: None,
            user_location,
        };

        let outcome = self.server.machine.advance(state, &mut collected, &ctx).await;

        history.push(ChatTurn::user(message));
        history.push(ChatTurn::assistant(outcome.reply.clone()));

        let ai_model = if outcome.provenance != Provenance::None {
            outcome.provenance.as_str().to_string()
        } else {
            session.ai_model_used.clone()
        };

        self.server
            .sessions
            .update_turn(
                session.session_id,
                session.version,
                outcome.next_state.as_str(),
                &serde_json::to_value(&collected)
                    .map_err(|e| ApiError::internal(e.to_string()))?,
                &serde_json::to_value(&history).map_err(|e| ApiError::internal(e.to_string()))?,
                &ai_model,
            )
            .await
            .map_err(|e| match e {
                hospital_data::DatabaseError::VersionConflict(_) => {
                    ApiError::conflict("another turn for this session is in flight")
                }
                other => other.into(),
            })?;

        Ok(ChatTurnResponse {
            session_id: session.session_id,
            message: outcome.reply,
            state: outcome.next_state.as_str().to_string(),
            is_finished: outcome.finished,
            find_loc: outcome.find_loc,
            final_data: outcome.final_payload,
            ai_model,
        })
    }

    /// Explicit session close. Not-found when the session is missing or
    /// belongs to another user; no partial mutation either way.
    pub async fn finish(&self, session_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        let session = self
            .server
            .sessions
            .get_owned(session_id, user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("session"))?;

        self.server.sessions.mark_done(session.session_id).await?;
        info!(session_id = %session_id, "session finished");
        Ok(())
    }

    /// Push a freshly stored user location into the user's active session,
    /// moving it to the location-confirmation step and returning the
    /// prompt the assistant just emitted.
    pub async fn push_location(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
        location_text: Option<&str>,
    ) -> Result<Option<ChatTurnResponse>, ApiError> {
        let Some(session) = self.server.sessions.latest_active_for_user(user_id).await? else {
            return Ok(None);
        };

        let mut collected: CollectedData = serde_json::from_value(session.collected.clone())
            .map_err(|e| ApiError::internal(format!("corrupt session data: {e}")))?;
        let mut history: Vec<ChatTurn> = serde_json::from_value(session.history.clone())
            .map_err(|e| ApiError::internal(format!("corrupt session history: {e}")))?;

        collected.set_location(&GeoPoint {
            latitude,
            longitude,
            label: location_text.map(str::to_string),
        });

        let reply = messages::confirm_location(collected.location.as_deref());
        history.push(ChatTurn::assistant(reply.clone()));

        self.server
            .sessions
            .update_turn(
                session.session_id,
                session.version,
                DialogueState::CheckLocation.as_str(),
                &serde_json::to_value(&collected)
                    .map_err(|e| ApiError::internal(e.to_string()))?,
                &serde_json::to_value(&history).map_err(|e| ApiError::internal(e.to_string()))?,
                &session.ai_model_used,
            )
            .await?;

        Ok(Some(ChatTurnResponse {
            session_id: session.session_id,
            message: reply,
            state: DialogueState::CheckLocation.as_str().to_string(),
            is_finished: false,
            find_loc: false,
            final_data: None,
            ai_model: session.ai_model_used,
        }))
    }

    /// Session reuse policy: an explicit id wins (with an ownership
    /// check); otherwise the user's latest active session is reused unless
    /// it has idled out, in which case it is expired and replaced.
    async fn resolve_session(
        &self,
        session_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<ChatSessionRow, ApiError> {
        if let Some(session_id) = session_id {
            let session = self.server.sessions.get(session_id).await?;
            let (session, needs_bind) = claim_referenced(session, user_id)?;
            if needs_bind {
                if let Some(caller) = user_id {
                    self.server.sessions.bind_user(session.session_id, caller).await?;
                }
            }
            return Ok(session);
        }

        if let Some(user_id) = user_id {
            if let Some(session) = self.server.sessions.latest_active_for_user(user_id).await? {
                let cutoff = Utc::now() - Duration::minutes(self.server.config.session_idle_minutes);
                if SessionRepository::is_idle_since(&session, cutoff) {
                    self.server.sessions.mark_done(session.session_id).await?;
                    info!(session_id = %session.session_id, "idle session expired");
                } else {
                    return Ok(session);
                }
            }
        }

        Ok(self.server.sessions.create(user_id).await?)
    }
}

/// Ownership check for an explicitly referenced session. An id the store
/// does not know, or one owned by someone else, is a plain not-found so
/// callers cannot distinguish foreign sessions from absent ones. Returns
/// the row and whether an anonymous session must be bound to the caller.
fn claim_referenced(
    session: Option<ChatSessionRow>,
    caller: Option<Uuid>,
) -> Result<(ChatSessionRow, bool), ApiError> {
    let Some(session) = session else {
        return Err(ApiError::not_found("session"));
    };
    match (session.user_id, caller) {
        (Some(owner), Some(caller)) if owner != caller => Err(ApiError::not_found("session")),
        (Some(_), None) => Err(ApiError::not_found("session")),
        (None, Some(_)) => Ok((session, true)),
        _ => Ok((session, false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn session_row(user_id: Option<Uuid>) -> ChatSessionRow {
        ChatSessionRow {
            session_id: Uuid::new_v4(),
            user_id,
            state: "INIT".to_string(),
            collected: json!({}),
            history: json!([]),
            ai_model_used: "none".to_string(),
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unknown_session_id_is_not_found() {
        let err = claim_referenced(None, Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = claim_referenced(None, None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn foreign_sessions_are_indistinguishable_from_absent_ones() {
        let owned = session_row(Some(Uuid::new_v4()));
        let err = claim_referenced(Some(owned.clone()), Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = claim_referenced(Some(owned), None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn anonymous_sessions_are_bound_to_the_caller() {
        let caller = Uuid::new_v4();
        let (session, needs_bind) =
            claim_referenced(Some(session_row(None)), Some(caller)).unwrap();
        assert!(needs_bind);
        assert!(session.user_id.is_none());

        let owner = Uuid::new_v4();
        let (_, needs_bind) =
            claim_referenced(Some(session_row(Some(owner))), Some(owner)).unwrap();
        assert!(!needs_bind);
    }
}
