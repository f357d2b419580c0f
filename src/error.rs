//! Error types for the generation pipeline and their HTTP mapping.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::util::trunc_for_log;

pub const MALFORMED_RESPONSE_MESSAGE: &str =
  "The AI returned an invalid response format. Please try regenerating.";

/// Failures talking to the generation service itself.
#[derive(Debug, Error)]
pub enum ServiceError {
  #[error("generation service is not configured (set GEMINI_API_KEY)")]
  NotConfigured,

  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("Gemini HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("empty response from model")]
  EmptyResponse,
}

#[derive(Debug, Error)]
pub enum StudyError {
  #[error("Please enter a topic.")]
  EmptyTopic,

  #[error("Missing client id.")]
  MissingClientId,

  #[error("Please enter a message.")]
  EmptyMessage,

  #[error("Invalid study material type: {0}")]
  InvalidMaterialKind(String),

  #[error("Unknown topic: {0}")]
  UnknownTopic(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Failed to generate content: {0}")]
  ServiceFailure(#[from] ServiceError),

  /// `original` and `cleaned` are kept for diagnostics and never sent to clients.
  #[error("malformed model response: {reason}")]
  MalformedResponse {
    original: String,
    cleaned: String,
    reason: String,
  },
}

impl StudyError {
  fn error_code(&self) -> &'static str {
    match self {
      StudyError::EmptyTopic => "EMPTY_TOPIC",
      StudyError::MissingClientId => "MISSING_CLIENT_ID",
      StudyError::EmptyMessage => "EMPTY_MESSAGE",
      StudyError::InvalidMaterialKind(_) => "INVALID_MATERIAL_KIND",
      StudyError::UnknownTopic(_) => "UNKNOWN_TOPIC",
      StudyError::NotFound(_) => "NOT_FOUND",
      StudyError::ServiceFailure(_) => "SERVICE_FAILURE",
      StudyError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
    }
  }

  pub fn status_code(&self) -> StatusCode {
    match self {
      StudyError::EmptyTopic
      | StudyError::MissingClientId
      | StudyError::EmptyMessage
      | StudyError::InvalidMaterialKind(_) => {
        StatusCode::BAD_REQUEST
      }
      StudyError::UnknownTopic(_) | StudyError::NotFound(_) => StatusCode::NOT_FOUND,
      StudyError::ServiceFailure(_) | StudyError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
    }
  }

  /// Text safe to show an end user.
  pub fn user_message(&self) -> String {
    match self {
      StudyError::MalformedResponse { .. } => MALFORMED_RESPONSE_MESSAGE.to_string(),
      other => other.to_string(),
    }
  }

  /// Log diagnostics at the boundary, before the error is turned into a reply.
  pub fn log(&self) {
    match self {
      StudyError::MalformedResponse { original, cleaned, reason } => {
        error!(
          target: "generation",
          %reason,
          original = %trunc_for_log(original, 400),
          cleaned = %trunc_for_log(cleaned, 400),
          "Failed to parse JSON from model response"
        );
      }
      StudyError::ServiceFailure(e) => {
        error!(target: "generation", error = %e, "Generation service call failed");
      }
      _ => {}
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  pub code: &'static str,
}

impl IntoResponse for StudyError {
  fn into_response(self) -> Response {
    self.log();
    let body = ErrorResponse { error: self.user_message(), code: self.error_code() };
    (self.status_code(), Json(body)).into_response()
  }
}

pub type StudyResult<T> = Result<T, StudyError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes_follow_error_kind() {
    assert_eq!(StudyError::EmptyTopic.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(StudyError::MissingClientId.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(StudyError::InvalidMaterialKind("x".into()).status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(StudyError::UnknownTopic("x".into()).status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
      StudyError::ServiceFailure(ServiceError::EmptyResponse).status_code(),
      StatusCode::BAD_GATEWAY
    );
  }

  #[test]
  fn malformed_response_hides_raw_text_from_users() {
    let err = StudyError::MalformedResponse {
      original: "```json\nnope".into(),
      cleaned: "nope".into(),
      reason: "expected value".into(),
    };
    assert_eq!(err.user_message(), MALFORMED_RESPONSE_MESSAGE);
    assert!(!err.user_message().contains("nope"));
  }

  #[test]
  fn service_failure_message_is_prefixed() {
    let err = StudyError::from(ServiceError::Http { status: 429, message: "quota".into() });
    assert_eq!(err.to_string(), "Failed to generate content: Gemini HTTP 429: quota");
  }
}
