//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs the session id and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog;
use crate::logic::handle_intent;
use crate::navigation::NavError;
use crate::protocol::*;
use crate::state::AppState;

/// Errors a handler can answer with. Generation failures are not here: they come
/// back inside the snapshot as `notice`.
#[derive(Debug)]
pub enum ApiError {
  UnknownSession(Uuid),
  Rejected(NavError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error) = match self {
      ApiError::UnknownSession(id) => (StatusCode::NOT_FOUND, format!("unknown session {id}")),
      ApiError::Rejected(e) => (StatusCode::CONFLICT, e.to_string()),
    };
    (status, Json(ErrorOut { error })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generation: state.generator.model_name().is_some() })
}

#[instrument(level = "info")]
pub async fn http_catalog() -> impl IntoResponse {
  Json(catalog::snapshot())
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let session = state.create_session().await;
  let out = to_out(&*session.lock().await);
  info!(target: "navigation", session = %out.id, "HTTP session created");
  (StatusCode::CREATED, Json(out))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionOut>, ApiError> {
  let session = state.get_session(id).await.ok_or(ApiError::UnknownSession(id))?;
  let out = to_out(&*session.lock().await);
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if state.remove_session(id).await {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::UnknownSession(id))
  }
}

/// Apply one intent. When it triggers a generation the response waits for it.
#[instrument(level = "info", skip(state, intent), fields(%id, generates = intent.generates()))]
pub async fn http_post_intent(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(intent): Json<Intent>,
) -> Result<Json<SessionOut>, ApiError> {
  let session = state.get_session(id).await.ok_or(ApiError::UnknownSession(id))?;
  if let Err(e) = handle_intent(&state.generator, &session, intent).await {
    warn!(target: "navigation", session = %id, error = %e, "HTTP intent rejected");
    return Err(ApiError::Rejected(e));
  }
  let out = to_out(&*session.lock().await);
  info!(target: "navigation", session = %id, view = ?out.view, notice = out.notice.is_some(), "HTTP intent applied");
  Ok(Json(out))
}
