//! Domain models: material kinds, the typed generated content, chat turns,
//! locales, history items and user preferences.

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StudyError;

pub const QUIZ_QUESTION_COUNT: usize = 20;
pub const QUIZ_OPTION_COUNT: usize = 4;
pub const TIMELINE_MIN_EVENTS: usize = 5;
pub const FLASHCARD_COUNT: usize = 8;

/// Which study material the user asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialKind {
  Summary,
  Quiz,
  Timeline,
  Flashcards,
}

impl MaterialKind {
  pub const ALL: [MaterialKind; 4] = [
    MaterialKind::Summary,
    MaterialKind::Quiz,
    MaterialKind::Timeline,
    MaterialKind::Flashcards,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      MaterialKind::Summary => "Summary",
      MaterialKind::Quiz => "Quiz",
      MaterialKind::Timeline => "Timeline",
      MaterialKind::Flashcards => "Flashcards",
    }
  }

  /// Everything except Summary comes back as a JSON array.
  pub fn is_structured(&self) -> bool {
    !matches!(self, MaterialKind::Summary)
  }
}

impl fmt::Display for MaterialKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for MaterialKind {
  type Err = StudyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    MaterialKind::ALL
      .into_iter()
      .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| StudyError::InvalidMaterialKind(s.to_string()))
  }
}

/// UI locale. Only affects the language name fed into prompts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
  Ms,
  #[default]
  En,
  Ar,
}

impl Locale {
  /// Lenient lookup: unknown codes fall back to English.
  pub fn from_code(code: Option<&str>) -> Self {
    match code.map(|c| c.trim().to_ascii_lowercase()).as_deref() {
      Some("ms") => Locale::Ms,
      Some("ar") => Locale::Ar,
      _ => Locale::En,
    }
  }

  pub fn language_name(&self) -> &'static str {
    match self {
      Locale::Ms => "Malay",
      Locale::En => "English",
      Locale::Ar => "Arabic",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
  pub question: String,
  pub options: Vec<String>,
  #[serde(rename = "correctAnswer")]
  pub correct_answer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
  pub date: String,
  pub event: String,
  pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
  pub term: String,
  pub definition: String,
}

/// Typed result of one generation. Exactly one payload shape per kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum GeneratedContent {
  #[serde(rename = "Summary")]
  Text(String),
  #[serde(rename = "Quiz")]
  QuestionList(Vec<QuizQuestion>),
  #[serde(rename = "Timeline")]
  EventList(Vec<TimelineEvent>),
  #[serde(rename = "Flashcards")]
  TermList(Vec<Flashcard>),
}

impl GeneratedContent {
  pub fn kind(&self) -> MaterialKind {
    match self {
      GeneratedContent::Text(_) => MaterialKind::Summary,
      GeneratedContent::QuestionList(_) => MaterialKind::Quiz,
      GeneratedContent::EventList(_) => MaterialKind::Timeline,
      GeneratedContent::TermList(_) => MaterialKind::Flashcards,
    }
  }

  /// Number of items (questions/events/cards); summaries count as one.
  pub fn item_count(&self) -> usize {
    match self {
      GeneratedContent::Text(_) => 1,
      GeneratedContent::QuestionList(q) => q.len(),
      GeneratedContent::EventList(e) => e.len(),
      GeneratedContent::TermList(t) => t.len(),
    }
  }

  /// Deviations from what the prompt asked for. Advisory only: the content
  /// is still served, callers log these.
  pub fn contract_warnings(&self) -> Vec<String> {
    let mut out = vec![];
    match self {
      GeneratedContent::Text(_) => {}
      GeneratedContent::QuestionList(questions) => {
        if questions.len() != QUIZ_QUESTION_COUNT {
          out.push(format!("expected {} questions, got {}", QUIZ_QUESTION_COUNT, questions.len()));
        }
        for (i, q) in questions.iter().enumerate() {
          if q.options.len() != QUIZ_OPTION_COUNT {
            out.push(format!("question {} has {} options", i, q.options.len()));
          }
          if !q.options.contains(&q.correct_answer) {
            out.push(format!("question {} correctAnswer is not one of its options", i));
          }
        }
      }
      GeneratedContent::EventList(events) => {
        if events.len() < TIMELINE_MIN_EVENTS {
          out.push(format!("expected at least {} events, got {}", TIMELINE_MIN_EVENTS, events.len()));
        }
      }
      GeneratedContent::TermList(cards) => {
        if cards.len() != FLASHCARD_COUNT {
          out.push(format!("expected {} flashcards, got {}", FLASHCARD_COUNT, cards.len()));
        }
      }
    }
    out
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
  #[serde(rename = "user")]
  User,
  // Gemini calls the assistant side "model".
  #[serde(rename = "model", alias = "assistant")]
  Assistant,
}

impl ChatRole {
  pub fn as_wire(&self) -> &'static str {
    match self {
      ChatRole::User => "user",
      ChatRole::Assistant => "model",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
  pub role: ChatRole,
  pub text: String,
}

impl ChatTurn {
  pub fn user(text: impl Into<String>) -> Self {
    Self { role: ChatRole::User, text: text.into() }
  }

  pub fn assistant(text: impl Into<String>) -> Self {
    Self { role: ChatRole::Assistant, text: text.into() }
  }
}

/// One past generation, selectable back into the live display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryItem {
  pub id: Uuid,
  pub topic: String,
  pub content: GeneratedContent,
  pub timestamp: DateTime<Utc>,
}

impl HistoryItem {
  pub fn new(topic: &str, content: GeneratedContent) -> Self {
    Self { id: Uuid::new_v4(), topic: topic.to_string(), content, timestamp: Utc::now() }
  }
}

/// Catalog entry; `key` is what share links carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
  pub key: String,
  pub title: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  #[default]
  Light,
  Dark,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
  #[serde(default)] pub theme: Theme,
  #[serde(default)] pub locale: Locale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct QuizScore {
  pub correct: usize,
  pub total: usize,
}

/// Count answers whose chosen option equals the question's correct answer.
/// Indices past the end of `questions` are ignored.
pub fn score_quiz(questions: &[QuizQuestion], answers: &HashMap<usize, String>) -> QuizScore {
  let correct = answers
    .iter()
    .filter(|(idx, chosen)| {
      questions
        .get(**idx)
        .is_some_and(|q| q.correct_answer == **chosen)
    })
    .count();
  QuizScore { correct, total: questions.len() }
}
