//! Shareable links: `?topic=<catalog key>&type=<Kind>`.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::domain::MaterialKind;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
  pub topic: String,
  #[serde(rename = "type")]
  pub kind: MaterialKind,
}

impl ShareLink {
  pub fn new(topic_key: impl Into<String>, kind: MaterialKind) -> Self {
    Self { topic: topic_key.into(), kind }
  }

  /// Absolute link under `base`; None if `base` is not a valid URL.
  pub fn url(&self, base: &str) -> Option<Url> {
    Url::parse_with_params(base, &[("topic", self.topic.as_str()), ("type", self.kind.as_str())]).ok()
  }

  /// Root-relative form, e.g. `/?topic=hijrah&type=Quiz`.
  pub fn relative(&self) -> String {
    self
      .url("http://localhost/")
      .map(|u| format!("{}?{}", u.path(), u.query().unwrap_or_default()))
      .unwrap_or_default()
  }
}
