//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, Query, State}, Json};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{HistoryItem, Locale, MaterialKind, Preferences, Topic};
use crate::error::{StudyError, StudyResult};
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> Json<HealthOut> {
  Json(HealthOut { ok: true, generator: state.generator().map(|g| g.model()) })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_topics(State(state): State<Arc<AppState>>) -> Json<Vec<Topic>> {
  Json(state.topics.clone())
}

#[instrument(level = "info", skip(state, body), fields(client_id = %body.client_id, topic = %body.topic, kind = %body.kind))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> StudyResult<Json<GenerateOut>> {
  let kind: MaterialKind = body.kind.parse()?;
  let locale = Locale::from_code(body.locale.as_deref());
  let out = logic::generate(&state, &body.client_id, &body.topic, kind, locale).await?;
  info!(target: "generation", id = %out.id, %kind, "HTTP generate served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(topic = %q.topic, kind = %q.kind))]
pub async fn http_get_share(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ShareQuery>,
) -> StudyResult<Json<GenerateOut>> {
  let locale = Locale::from_code(q.locale.as_deref());
  let out = logic::generate_shared(&state, &q.client_id, &q.topic, &q.kind, locale).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(topic = %q.topic, kind = %q.kind))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  Query(q): Query<HistoryQuery>,
) -> StudyResult<Json<Vec<HistoryItem>>> {
  let client_id = logic::client_key(&q.client_id)?;
  let kind: MaterialKind = q.kind.parse()?;
  Ok(Json(state.history.list(client_id, q.topic.trim(), kind).await))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_history_item(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Query(q): Query<ClientQuery>,
) -> StudyResult<Json<HistoryItem>> {
  let client_id = logic::client_key(&q.client_id)?;
  state
    .history
    .get(client_id, id)
    .await
    .map(Json)
    .ok_or_else(|| StudyError::NotFound(format!("history item {id}")))
}

#[instrument(level = "info", skip(state, body), fields(topic = %body.topic, history_len = body.history.len()))]
pub async fn http_post_chat(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ChatIn>,
) -> StudyResult<Json<ChatOut>> {
  let locale = Locale::from_code(body.locale.as_deref());
  let out = logic::chat(&state, &body.topic, locale, body.history, &body.message).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(body), fields(questions = body.questions.len()))]
pub async fn http_post_score(Json(body): Json<ScoreIn>) -> Json<ScoreOut> {
  Json(logic::score(&body.questions, &body.answers))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_preferences(
  State(state): State<Arc<AppState>>,
  Path(client_id): Path<String>,
) -> Json<Preferences> {
  Json(state.preferences.load(&client_id).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_put_preferences(
  State(state): State<Arc<AppState>>,
  Path(client_id): Path<String>,
  Json(prefs): Json<Preferences>,
) -> Json<Preferences> {
  state.preferences.save(&client_id, prefs).await;
  info!(target: "sirahpidea", %client_id, theme = ?prefs.theme, locale = ?prefs.locale, "Preferences saved");
  Json(prefs)
}
