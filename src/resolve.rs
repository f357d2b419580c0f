//! Response resolver: raw model text → typed `GeneratedContent`.
//!
//! Summaries pass through untouched. Structured kinds get one outer code fence
//! stripped (models sometimes wrap JSON in ```json … ```), then a strict decode
//! into the shape for that kind. No repair or partial salvage.

use serde::de::DeserializeOwned;

use crate::domain::{Flashcard, GeneratedContent, MaterialKind, QuizQuestion, TimelineEvent};
use crate::error::{StudyError, StudyResult};

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

pub fn resolve(raw_text: &str, kind: MaterialKind) -> StudyResult<GeneratedContent> {
  match kind {
    MaterialKind::Summary => Ok(GeneratedContent::Text(raw_text.to_string())),
    MaterialKind::Quiz => decode::<QuizQuestion>(raw_text).map(GeneratedContent::QuestionList),
    MaterialKind::Timeline => decode::<TimelineEvent>(raw_text).map(GeneratedContent::EventList),
    MaterialKind::Flashcards => decode::<Flashcard>(raw_text).map(GeneratedContent::TermList),
  }
}

/// Trim and drop a single outer fence. A `json` language tag is checked first,
/// then a bare fence. The closing fence is removed only if present.
pub fn strip_code_fence(raw_text: &str) -> &str {
  let trimmed = raw_text.trim();
  let inner = match trimmed
    .strip_prefix(JSON_FENCE)
    .or_else(|| trimmed.strip_prefix(FENCE))
  {
    Some(rest) => rest,
    None => return trimmed,
  };
  inner.strip_suffix(FENCE).unwrap_or(inner).trim()
}

fn decode<T: DeserializeOwned>(raw_text: &str) -> StudyResult<Vec<T>> {
  let cleaned = strip_code_fence(raw_text);
  serde_json::from_str::<Vec<T>>(cleaned).map_err(|e| StudyError::MalformedResponse {
    original: raw_text.to_string(),
    cleaned: cleaned.to_string(),
    reason: e.to_string(),
  })
}
