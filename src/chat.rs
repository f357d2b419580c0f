//! Topic-scoped follow-up chat.
//!
//! `converse` is the single round trip; `ChatSession` owns the transcript for
//! one topic and keeps it consistent when the service fails.

use tracing::{info, instrument, warn};

use crate::config::Prompts;
use crate::domain::ChatTurn;
use crate::error::{ServiceError, StudyError, StudyResult};
use crate::gemini::{GenerationCall, TextGenerator};
use crate::util::fill_template;

pub const CHAT_FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

pub fn system_instruction(prompts: &Prompts, topic: &str, language_name: &str) -> String {
  fill_template(&prompts.chat_system, &[("topic", topic), ("language", language_name)])
}

/// Send the prior transcript plus `new_message` and return the reply verbatim.
#[instrument(level = "info", skip(generator, prompts, history, new_message), fields(%topic, %language_name, history_len = history.len(), msg_len = new_message.len()))]
pub async fn converse(
  generator: &dyn TextGenerator,
  prompts: &Prompts,
  topic: &str,
  language_name: &str,
  history: &[ChatTurn],
  new_message: &str,
) -> StudyResult<String> {
  let mut turns = history.to_vec();
  turns.push(ChatTurn::user(new_message));
  let call = GenerationCall::chat(system_instruction(prompts, topic, language_name), turns);
  let reply = generator.generate(&call).await?;
  Ok(reply)
}

/// Transcript for the active topic. Cleared whenever the topic changes.
#[derive(Clone, Debug, Default)]
pub struct ChatSession {
  topic: String,
  turns: Vec<ChatTurn>,
}

impl ChatSession {
  pub fn new(topic: impl Into<String>) -> Self {
    Self { topic: topic.into(), turns: vec![] }
  }

  /// Resume a transcript carried by the client (stateless HTTP chat).
  pub fn with_turns(topic: impl Into<String>, turns: Vec<ChatTurn>) -> Self {
    Self { topic: topic.into(), turns }
  }

  pub fn into_turns(self) -> Vec<ChatTurn> {
    self.turns
  }

  pub fn topic(&self) -> &str {
    &self.topic
  }

  pub fn turns(&self) -> &[ChatTurn] {
    &self.turns
  }

  /// Switch topic; the transcript is dropped only if the topic actually changed.
  pub fn set_topic(&mut self, topic: &str) {
    if self.topic != topic {
      self.topic = topic.to_string();
      self.turns.clear();
    }
  }

  pub fn reset(&mut self) {
    self.turns.clear();
  }

  /// Append the user turn and the assistant reply. On service failure the
  /// fixed fallback is appended instead, so the transcript always grows by two.
  /// Blank messages are rejected and leave the transcript untouched.
  pub async fn send(
    &mut self,
    generator: Option<&dyn TextGenerator>,
    prompts: &Prompts,
    language_name: &str,
    message: &str,
  ) -> StudyResult<&ChatTurn> {
    if message.trim().is_empty() {
      return Err(StudyError::EmptyMessage);
    }

    let result = match generator {
      Some(g) => converse(g, prompts, &self.topic, language_name, &self.turns, message).await,
      None => Err(StudyError::ServiceFailure(ServiceError::NotConfigured)),
    };

    self.turns.push(ChatTurn::user(message));
    let reply = match result {
      Ok(text) => {
        info!(target: "chat", topic = %self.topic, reply_len = text.len(), "Chat reply received");
        text
      }
      Err(e) => {
        warn!(target: "chat", topic = %self.topic, error = %e, "Chat call failed; using fallback reply");
        CHAT_FALLBACK_REPLY.to_string()
      }
    };
    self.turns.push(ChatTurn::assistant(reply));

    Ok(&self.turns[self.turns.len() - 1])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ChatRole;
  use crate::gemini::MockTextGenerator;

  #[test]
  fn system_instruction_scopes_topic_and_language() {
    let s = system_instruction(&Prompts::default(), "The Battle of Badr", "Arabic");
    assert!(s.contains("\"The Battle of Badr\""));
    assert!(s.contains("strictly limited to this topic"));
    assert!(s.contains("You must answer in Arabic."));
  }

  #[tokio::test]
  async fn converse_sends_history_then_new_message() {
    let mut mock = MockTextGenerator::new();
    mock
      .expect_generate()
      .withf(|call| {
        call.turns.len() == 3
          && call.turns[2] == ChatTurn::user("And after?")
          && call.system_instruction.as_deref().is_some_and(|s| s.contains("Hijrah"))
          && call.response_schema.is_none()
      })
      .times(1)
      .returning(|_| Ok("They reached Quba.".into()));

    let history = vec![ChatTurn::user("Who left first?"), ChatTurn::assistant("The companions.")];
    let reply = converse(&mock, &Prompts::default(), "Hijrah", "English", &history, "And after?")
      .await
      .expect("reply");
    assert_eq!(reply, "They reached Quba.");
  }

  #[tokio::test]
  async fn send_grows_transcript_by_two_on_success_and_failure() {
    let mut mock = MockTextGenerator::new();
    let mut calls = 0;
    mock.expect_generate().times(2).returning(move |_| {
      calls += 1;
      if calls == 1 { Ok("Madinah.".into()) } else { Err(ServiceError::EmptyResponse) }
    });

    let prompts = Prompts::default();
    let mut session = ChatSession::new("Hijrah");

    session.send(Some(&mock as &dyn TextGenerator), &prompts, "English", "Where to?").await.expect("first");
    assert_eq!(session.turns().len(), 2);
    assert_eq!(session.turns()[1], ChatTurn::assistant("Madinah."));

    let reply = session.send(Some(&mock as &dyn TextGenerator), &prompts, "English", "When?").await.expect("second");
    assert_eq!(reply.role, ChatRole::Assistant);
    assert_eq!(reply.text, CHAT_FALLBACK_REPLY);
    assert_eq!(session.turns().len(), 4);
    assert_eq!(session.turns()[2], ChatTurn::user("When?"));
  }

  #[tokio::test]
  async fn send_without_generator_still_appends_fallback() {
    let mut session = ChatSession::new("Badr");
    session.send(None, &Prompts::default(), "Malay", "Hello").await.expect("fallback");
    assert_eq!(session.turns().len(), 2);
    assert_eq!(session.turns()[1].text, CHAT_FALLBACK_REPLY);
  }

  #[tokio::test]
  async fn blank_message_is_rejected_without_calling_service() {
    let mut mock = MockTextGenerator::new();
    mock.expect_generate().never();
    let mut session = ChatSession::new("Badr");
    let err = session.send(Some(&mock as &dyn TextGenerator), &Prompts::default(), "English", "   ").await.unwrap_err();
    assert!(matches!(err, StudyError::EmptyMessage));
    assert!(session.turns().is_empty());
  }

  #[test]
  fn topic_change_clears_transcript_only_when_different() {
    let mut session = ChatSession::new("Badr");
    session.turns.push(ChatTurn::user("q"));
    session.turns.push(ChatTurn::assistant("a"));

    session.set_topic("Badr");
    assert_eq!(session.turns().len(), 2);

    session.set_topic("Uhud");
    assert_eq!(session.topic(), "Uhud");
    assert!(session.turns().is_empty());
  }
}
