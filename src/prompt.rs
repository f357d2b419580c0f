//! Request builder: turns (topic, kind, language) into the prompt text and the
//! structured-output schema sent to the model.
//!
//! Schemas use Gemini's OpenAPI subset (`ARRAY` / `OBJECT` / `STRING`). They pin
//! the shape only; item counts, `correctAnswer` membership and output language
//! are asked for in the prompt text.

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Prompts;
use crate::domain::{MaterialKind, FLASHCARD_COUNT, QUIZ_OPTION_COUNT, QUIZ_QUESTION_COUNT, TIMELINE_MIN_EVENTS};
use crate::util::fill_template;

pub const JSON_MIME_TYPE: &str = "application/json";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationInstruction {
  pub prompt_text: String,
  pub output_schema: Option<Value>,
}

impl GenerationInstruction {
  pub fn response_mime_type(&self) -> Option<&'static str> {
    self.output_schema.as_ref().map(|_| JSON_MIME_TYPE)
  }
}

/// Build the instruction for one generation. Pure; the caller has already
/// rejected blank topics.
pub fn build(prompts: &Prompts, topic: &str, kind: MaterialKind, language_name: &str) -> GenerationInstruction {
  let (template, count, schema) = match kind {
    MaterialKind::Summary => (&prompts.summary, 0, None),
    MaterialKind::Quiz => (&prompts.quiz, QUIZ_QUESTION_COUNT, Some(quiz_schema())),
    MaterialKind::Timeline => (&prompts.timeline, TIMELINE_MIN_EVENTS, Some(timeline_schema())),
    MaterialKind::Flashcards => (&prompts.flashcards, FLASHCARD_COUNT, Some(flashcard_schema())),
  };

  let count = count.to_string();
  let options = QUIZ_OPTION_COUNT.to_string();
  let pairs = [
    ("topic", topic),
    ("language", language_name),
    ("count", count.as_str()),
    ("options", options.as_str()),
  ];

  let body = fill_template(template, &pairs);
  let prompt_text = if kind.is_structured() {
    format!("{} {}", fill_template(&prompts.structured_prefix, &pairs), body)
  } else {
    body
  };

  GenerationInstruction { prompt_text, output_schema: schema }
}

fn string_field(description: Option<&str>) -> Value {
  match description {
    Some(d) => json!({ "type": "STRING", "description": d }),
    None => json!({ "type": "STRING" }),
  }
}

fn array_of_objects(properties: Value, required: &[&str]) -> Value {
  json!({
    "type": "ARRAY",
    "items": {
      "type": "OBJECT",
      "properties": properties,
      "required": required,
    }
  })
}

pub fn quiz_schema() -> Value {
  array_of_objects(
    json!({
      "question": string_field(None),
      "options": { "type": "ARRAY", "items": string_field(None) },
      "correctAnswer": string_field(None),
    }),
    &["question", "options", "correctAnswer"],
  )
}

pub fn timeline_schema() -> Value {
  array_of_objects(
    json!({
      "date": string_field(Some("The year or specific date of the event.")),
      "event": string_field(Some("A short title for the event.")),
      "description": string_field(Some("A brief one-sentence description of the event.")),
    }),
    &["date", "event", "description"],
  )
}

pub fn flashcard_schema() -> Value {
  array_of_objects(
    json!({
      "term": string_field(Some("The key term or name.")),
      "definition": string_field(Some("A concise definition of the term.")),
    }),
    &["term", "definition"],
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn required_fields(schema: &Value) -> Vec<String> {
    schema["items"]["required"]
      .as_array()
      .expect("required array")
      .iter()
      .map(|v| v.as_str().expect("string").to_string())
      .collect()
  }

  #[test]
  fn every_prompt_contains_the_topic() {
    let prompts = Prompts::default();
    for kind in MaterialKind::ALL {
      let inst = build(&prompts, "The Battle of Badr", kind, "Malay");
      assert!(!inst.prompt_text.is_empty());
      assert!(inst.prompt_text.contains("The Battle of Badr"), "{kind}: {}", inst.prompt_text);
      assert!(inst.prompt_text.contains("Malay"), "{kind}: {}", inst.prompt_text);
    }
  }

  #[test]
  fn summary_has_no_schema() {
    let inst = build(&Prompts::default(), "Hijrah", MaterialKind::Summary, "English");
    assert!(inst.output_schema.is_none());
    assert!(inst.response_mime_type().is_none());
    assert!(inst.prompt_text.contains("paragraphs"));
  }

  #[test]
  fn structured_schemas_declare_exact_required_fields() {
    let prompts = Prompts::default();
    let cases = [
      (MaterialKind::Quiz, vec!["question", "options", "correctAnswer"]),
      (MaterialKind::Timeline, vec!["date", "event", "description"]),
      (MaterialKind::Flashcards, vec!["term", "definition"]),
    ];
    for (kind, expected) in cases {
      let inst = build(&prompts, "Hijrah", kind, "Arabic");
      let schema = inst.output_schema.as_ref().expect("schema");
      assert_eq!(schema["type"], "ARRAY");
      assert_eq!(schema["items"]["type"], "OBJECT");
      assert_eq!(required_fields(schema), expected);
      assert_eq!(inst.response_mime_type(), Some(JSON_MIME_TYPE));
    }
  }

  #[test]
  fn quiz_prompt_asks_for_twenty_questions_with_four_options() {
    let inst = build(&Prompts::default(), "Hijrah", MaterialKind::Quiz, "English");
    assert!(inst.prompt_text.contains("20-question"));
    assert!(inst.prompt_text.contains("exactly 4 options"));
    assert_eq!(inst.output_schema.expect("schema")["items"]["properties"]["options"]["type"], "ARRAY");
  }

  #[test]
  fn flashcard_prompt_asks_for_eight_cards() {
    let inst = build(&Prompts::default(), "Hijrah", MaterialKind::Flashcards, "English");
    assert!(inst.prompt_text.contains("exactly 8 flashcards"));
  }

  #[test]
  fn build_is_deterministic() {
    let prompts = Prompts::default();
    assert_eq!(
      build(&prompts, "Uhud", MaterialKind::Timeline, "Malay"),
      build(&prompts, "Uhud", MaterialKind::Timeline, "Malay")
    );
  }
}
