//! Generation service port and the Gemini REST client behind it.
//!
//! We only call `models/{model}:generateContent`, either for plain text or with a
//! response schema for JSON output. Calls are instrumented and log the model,
//! latency and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::domain::ChatTurn;
use crate::error::ServiceError;
use crate::prompt::GenerationInstruction;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Everything the service needs for one round trip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationCall {
  pub system_instruction: Option<String>,
  pub turns: Vec<ChatTurn>,
  pub response_mime_type: Option<String>,
  pub response_schema: Option<Value>,
}

impl GenerationCall {
  /// Single user turn carrying the prompt, plus the schema if any.
  pub fn from_instruction(inst: &GenerationInstruction) -> Self {
    Self {
      system_instruction: None,
      turns: vec![ChatTurn::user(inst.prompt_text.clone())],
      response_mime_type: inst.response_mime_type().map(str::to_string),
      response_schema: inst.output_schema.clone(),
    }
  }

  pub fn chat(system_instruction: String, turns: Vec<ChatTurn>) -> Self {
    Self { system_instruction: Some(system_instruction), turns, ..Default::default() }
  }
}

/// The seam between core logic and whatever model backs it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
  /// Model identifier, for logs and health output.
  fn model(&self) -> String;

  /// One blocking round trip; returns the raw reply text.
  async fn generate(&self, call: &GenerationCall) -> Result<String, ServiceError>;
}

#[derive(Clone)]
pub struct GeminiClient {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl GeminiClient {
  /// Construct the client if we find GEMINI_API_KEY (or API_KEY); otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY")
      .or_else(|_| std::env::var("API_KEY"))
      .ok()
      .filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let timeout = std::env::var("GEMINI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let client = match reqwest::Client::builder().timeout(Duration::from_secs(timeout)).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "sirahpidea", error = %e, "Failed to build HTTP client; generation disabled");
        return None;
      }
    };

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  fn endpoint(&self) -> String {
    format!("{}/models/{}:generateContent", self.base_url, self.model)
  }
}

#[async_trait]
impl TextGenerator for GeminiClient {
  fn model(&self) -> String {
    self.model.clone()
  }

  #[instrument(level = "info", skip(self, call), fields(model = %self.model, turns = call.turns.len(), structured = call.response_schema.is_some()))]
  async fn generate(&self, call: &GenerationCall) -> Result<String, ServiceError> {
    let req = GenerateContentRequest::from_call(call);
    let start = Instant::now();

    let res = self.client.post(self.endpoint())
      .header(USER_AGENT, "sirahpidea-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_gemini_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), status = status.as_u16(), "Gemini call failed");
      return Err(ServiceError::Http { status: status.as_u16(), message });
    }

    let body: GenerateContentResponse = res.json().await?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }

    let text = body.first_text().ok_or(ServiceError::EmptyResponse)?;
    info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Model response received");
    Ok(text)
  }
}

// --- generateContent DTOs ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
  fn from_call(call: &GenerationCall) -> Self {
    let contents = call
      .turns
      .iter()
      .map(|t| Content { role: Some(t.role.as_wire().to_string()), parts: vec![Part { text: t.text.clone() }] })
      .collect();
    let system_instruction = call
      .system_instruction
      .as_ref()
      .map(|s| Content { role: None, parts: vec![Part { text: s.clone() }] });
    let generation_config = if call.response_mime_type.is_some() || call.response_schema.is_some() {
      Some(GenerationConfig {
        response_mime_type: call.response_mime_type.clone(),
        response_schema: call.response_schema.clone(),
      })
    } else {
      None
    };
    Self { contents, system_instruction, generation_config }
  }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
  #[serde(default)]
  text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  response_mime_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(default)]
  usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
  /// Concatenated text parts of the first candidate. An empty string is a valid
  /// reply; None means there was no candidate content at all.
  fn first_text(&self) -> Option<String> {
    let content = self.candidates.first()?.content.as_ref()?;
    Some(content.parts.iter().map(|p| p.text.as_str()).collect())
  }
}

#[derive(Debug, Deserialize)]
struct Candidate {
  #[serde(default)]
  content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
