//! REST API endpoint handlers.
//!
//! Every session endpoint goes through the session's lock, so a turn posted
//! here and a turn sent over the session's WebSocket are serialised.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::warn;
use tutor_rs::error::TutorError;
use uuid::Uuid;

use crate::session::{SessionStore, SharedSession};
use crate::snapshot::{ConfigSnapshot, SessionSnapshot};

/// The bundled chat page.
const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
}

impl AppState {
    pub fn session(&self, id: Uuid) -> Result<SharedSession, ApiError> {
        self.store.get(id).ok_or(ApiError::SessionNotFound(id))
    }
}

/// Error response: a status code and a JSON `{"error": "..."}` body.
#[derive(Debug)]
pub enum ApiError {
    SessionNotFound(Uuid),
    Tutor(TutorError),
}

impl From<TutorError> for ApiError {
    fn from(e: TutorError) -> Self {
        Self::Tutor(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Tutor(TutorError::Provider(_)) => StatusCode::BAD_GATEWAY,
            Self::Tutor(
                TutorError::EmptyInput
                | TutorError::UnknownPreferenceCategory(_)
                | TutorError::UnknownPreferenceOption { .. },
            ) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::SessionNotFound(id) => format!("session not found: {id}"),
            Self::Tutor(e) => e.to_string(),
        };
        if status == StatusCode::BAD_GATEWAY {
            warn!("Tutor turn failed: {message}");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// GET /: The bundled chat page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /api/config: Stages and preference categories.
pub async fn get_config(State(app): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = ConfigSnapshot::from_config(app.store.config());
    Json(serde_json::to_value(snapshot).unwrap_or_default())
}

/// POST /api/sessions: Create a session and greet the student.
///
/// Returns 201 with the snapshot. If the greeting fails the session is
/// discarded and the provider error is returned.
pub async fn create_session(
    State(app): State<AppState>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let shared = app.store.create();
    let mut session = shared.lock().await;
    if let Err(e) = session.greet().await {
        app.store.remove(session.id());
        return Err(e.into());
    }
    Ok((StatusCode::CREATED, Json(session.snapshot())))
}

/// GET /api/sessions/{id}: Session snapshot.
pub async fn get_session(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let shared = app.session(id)?;
    let session = shared.lock().await;
    Ok(Json(session.snapshot()))
}

/// DELETE /api/sessions/{id}: End a session. Returns 204.
pub async fn delete_session(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if app.store.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

/// Request body for PUT /api/sessions/{id}/preferences.
#[derive(Deserialize)]
pub struct SelectRequest {
    pub category: String,
    pub option: String,
}

/// PUT /api/sessions/{id}/preferences: Select one option of a category.
pub async fn put_preference(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let shared = app.session(id)?;
    let mut session = shared.lock().await;
    session.select(&body.category, &body.option)?;
    Ok(Json(session.snapshot()))
}

/// Request body for POST /api/sessions/{id}/chat.
#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Response body for POST /api/sessions/{id}/chat.
#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub snapshot: SessionSnapshot,
}

/// POST /api/sessions/{id}/chat: Send a student message and get the reply.
pub async fn post_chat(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let shared = app.session(id)?;
    let mut session = shared.lock().await;
    let reply = session.chat(&body.message).await?;
    Ok(Json(ChatResponse {
        reply,
        snapshot: session.snapshot(),
    }))
}

/// POST /api/sessions/{id}/reset: Reseed the conversation and greet again.
pub async fn post_reset(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let shared = app.session(id)?;
    let mut session = shared.lock().await;
    session.reset().await?;
    Ok(Json(session.snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_rs::error::ProviderError;

    #[test]
    fn select_request_deserializes() {
        let json = r#"{"category":"tone_style","option":"Friendly"}"#;
        let req: SelectRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.category, "tone_style");
        assert_eq!(req.option, "Friendly");
    }

    #[test]
    fn error_status_mapping() {
        let status = |e: ApiError| e.status();
        assert_eq!(status(ApiError::SessionNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(
            status(TutorError::EmptyInput.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(TutorError::UnknownPreferenceCategory("x".into()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(TutorError::Provider(ProviderError::EmptyResponse).into()),
            StatusCode::BAD_GATEWAY
        );
    }
}
