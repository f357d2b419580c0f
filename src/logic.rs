//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Generating study material (build, call, resolve, record in history)
//!   - Resolving share links back to a catalog topic
//!   - Stateless chat for HTTP (the transcript travels with the request)
//!   - Quiz scoring

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use crate::chat::ChatSession;
use crate::domain::{score_quiz, ChatTurn, Locale, MaterialKind, QuizQuestion, QuizScore, Topic};
use crate::error::{ServiceError, StudyError, StudyResult};
use crate::gemini::GenerationCall;
use crate::prompt;
use crate::protocol::{ChatOut, GenerateOut};
use crate::resolve::resolve;
use crate::share::ShareLink;
use crate::state::AppState;

/// Trimmed client id, or `MissingClientId` when blank. History is private to it.
pub fn client_key(client_id: &str) -> StudyResult<&str> {
  let key = client_id.trim();
  if key.is_empty() { Err(StudyError::MissingClientId) } else { Ok(key) }
}

/// One full generation round trip. Successful results are appended to the
/// client's history; a topic matching a catalog title also gets a share link.
#[instrument(level = "info", skip(state))]
pub async fn generate(
  state: &AppState,
  client_id: &str,
  topic: &str,
  kind: MaterialKind,
  locale: Locale,
) -> StudyResult<GenerateOut> {
  let client_id = client_key(client_id)?;
  let topic = topic.trim();
  if topic.is_empty() {
    return Err(StudyError::EmptyTopic);
  }
  let generator = state.generator().ok_or(ServiceError::NotConfigured)?;

  let instruction = prompt::build(&state.prompts, topic, kind, locale.language_name());
  let call = GenerationCall::from_instruction(&instruction);
  let raw = generator.generate(&call).await?;

  let content = resolve(&raw, kind)?;
  for warning in content.contract_warnings() {
    warn!(target: "generation", %topic, %kind, %warning, "Generated content breaks the requested shape");
  }
  info!(target: "generation", %topic, %kind, items = content.item_count(), "Content generated");

  let item = state.history.append(client_id, topic, content).await;
  let share = state.topic_by_title(topic).map(|t| ShareLink::new(t.key.clone(), kind));
  Ok(GenerateOut::from_history(item, share))
}

/// Map `?topic=<key>&type=<Kind>` back onto the catalog.
pub fn resolve_share(state: &AppState, topic_key: &str, kind_name: &str) -> StudyResult<(Topic, MaterialKind)> {
  let topic = state
    .topic_by_key(topic_key.trim())
    .cloned()
    .ok_or_else(|| StudyError::UnknownTopic(topic_key.to_string()))?;
  let kind: MaterialKind = kind_name.parse()?;
  Ok((topic, kind))
}

/// Open a share link: same as `generate` for the catalog topic's title.
#[instrument(level = "info", skip(state))]
pub async fn generate_shared(
  state: &AppState,
  client_id: &str,
  topic_key: &str,
  kind_name: &str,
  locale: Locale,
) -> StudyResult<GenerateOut> {
  let (topic, kind) = resolve_share(state, topic_key, kind_name)?;
  generate(state, client_id, &topic.title, kind, locale).await
}

/// HTTP chat: the client sends the transcript so far and gets it back grown
/// by the new user turn and the reply (or the fallback reply).
#[instrument(level = "info", skip(state, history, message), fields(history_len = history.len(), msg_len = message.len()))]
pub async fn chat(
  state: &AppState,
  topic: &str,
  locale: Locale,
  history: Vec<ChatTurn>,
  message: &str,
) -> StudyResult<ChatOut> {
  let topic = topic.trim();
  if topic.is_empty() {
    return Err(StudyError::EmptyTopic);
  }

  let mut session = ChatSession::with_turns(topic, history);
  let reply = session
    .send(state.generator(), &state.prompts, locale.language_name(), message)
    .await?
    .text
    .clone();
  Ok(ChatOut { reply, history: session.into_turns() })
}

pub fn score(questions: &[QuizQuestion], answers: &HashMap<usize, String>) -> QuizScore {
  let result = score_quiz(questions, answers);
  info!(target: "quiz", correct = result.correct, total = result.total, answered = answers.len(), "Quiz scored");
  result
}
