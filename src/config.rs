//! Loading study configuration (prompt templates + extra catalog topics) from TOML.
//!
//! See `StudyConfig` and `Prompts` for expected schema. Every field is optional;
//! anything missing keeps the built-in default.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Topic;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StudyConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub topics: Vec<TopicCfg>,
}

/// Catalog entry accepted in TOML. `key` defaults to a slug of the title.
#[derive(Clone, Debug, Deserialize)]
pub struct TopicCfg {
  #[serde(default)] pub key: Option<String>,
  pub title: String,
}

impl TopicCfg {
  pub fn to_topic(&self) -> Option<Topic> {
    let title = self.title.trim();
    if title.is_empty() {
      return None;
    }
    let key = match &self.key {
      Some(k) if !k.trim().is_empty() => k.trim().to_string(),
      _ => slugify(title),
    };
    Some(Topic { key, title: title.to_string() })
  }
}

/// Prompt templates. Placeholders: `{topic}`, `{language}`, `{count}`, `{options}`.
/// `structured_prefix` is prepended to the quiz/timeline/flashcard templates.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub summary: String,
  pub structured_prefix: String,
  pub quiz: String,
  pub timeline: String,
  pub flashcards: String,
  pub chat_system: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      summary: "Provide a concise, easy-to-understand summary for the topic: \"{topic}\". Structure it in well-formed paragraphs. The output must be in {language}.".into(),
      structured_prefix: "Based on the topic \"{topic}\", please generate the following content in {language}.".into(),
      quiz: "Generate a {count}-question multiple-choice quiz with exactly {options} options for each question. Ensure exactly one option is clearly correct, and set correctAnswer to the exact text of that option.".into(),
      timeline: "Generate a timeline of at least {count} key events in chronological order. Give each event a date, a short title and a one-sentence description.".into(),
      flashcards: "Generate exactly {count} flashcards with key terms and their concise definitions.".into(),
      chat_system: "You are a helpful and friendly study assistant for 'Sirahpidea'.\nYou will answer questions about the topic: \"{topic}\".\nYour knowledge is strictly limited to this topic.\nIf the user asks about anything else, politely state that you can only discuss the selected topic and guide them back.\nKeep your answers concise and easy for a student to understand.\nYou must answer in {language}.".into(),
    }
  }
}

/// Attempt to load `StudyConfig` from STUDY_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_study_config_from_env() -> Option<StudyConfig> {
  let path = std::env::var("STUDY_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_study_config(&s) {
      Ok(cfg) => {
        info!(target: "sirahpidea", %path, topics = cfg.topics.len(), "Loaded study config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "sirahpidea", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "sirahpidea", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_study_config(s: &str) -> Result<StudyConfig, toml::de::Error> {
  toml::from_str::<StudyConfig>(s)
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(title: &str) -> String {
  let mut out = String::with_capacity(title.len());
  for ch in title.chars() {
    if ch.is_ascii_alphanumeric() {
      out.push(ch.to_ascii_lowercase());
    } else if !out.is_empty() && !out.ends_with('-') {
      out.push('-');
    }
  }
  out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_prompt_override_keeps_other_defaults() {
    let cfg = parse_study_config(
      r#"
        [prompts]
        flashcards = "Make {count} cards about {topic}."

        [[topics]]
        title = "Battle of Uhud"

        [[topics]]
        key = "treaty"
        title = "Treaty of Hudaybiyyah"
      "#,
    )
    .expect("config");

    assert_eq!(cfg.prompts.flashcards, "Make {count} cards about {topic}.");
    assert_eq!(cfg.prompts.quiz, Prompts::default().quiz);
    let topics: Vec<Topic> = cfg.topics.iter().filter_map(TopicCfg::to_topic).collect();
    assert_eq!(topics[0].key, "battle-of-uhud");
    assert_eq!(topics[1].key, "treaty");
  }

  #[test]
  fn empty_config_is_all_defaults() {
    let cfg = parse_study_config("").expect("config");
    assert!(cfg.topics.is_empty());
    assert_eq!(cfg.prompts.summary, Prompts::default().summary);
  }

  #[test]
  fn slugify_collapses_punctuation() {
    assert_eq!(slugify("Hijrah of the Prophet SAW to Madinah"), "hijrah-of-the-prophet-saw-to-madinah");
    assert_eq!(slugify("  Isra' & Mi'raj!  "), "isra-mi-raj");
  }

  #[test]
  fn blank_topic_titles_are_skipped() {
    let cfg = TopicCfg { key: Some("x".into()), title: "   ".into() };
    assert!(cfg.to_topic().is_none());
  }
}
