//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::{ChatTurn, GeneratedContent, HistoryItem, Locale, MaterialKind, QuizQuestion, QuizScore, Theme};
use crate::share::ShareLink;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// `clientId` defaults to the connection's own id.
    Generate {
        topic: String,
        kind: String,
        #[serde(default)]
        locale: Option<String>,
        #[serde(default, rename = "clientId")]
        client_id: Option<String>,
    },
    Chat {
        topic: String,
        text: String,
        #[serde(default)]
        locale: Option<String>,
    },
    ChatReset,
    Score {
        questions: Vec<QuizQuestion>,
        #[serde(default, deserialize_with = "answers_by_index")]
        answers: HashMap<usize, String>,
    },
    SaveSettings {
        #[serde(rename = "clientId")]
        client_id: String,
        #[serde(default)]
        theme: Theme,
        #[serde(default)]
        locale: Option<String>,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Generated {
        result: GenerateOut,
    },
    ChatReply {
        text: String,
        #[serde(rename = "transcriptLen")]
        transcript_len: usize,
    },
    Score {
        correct: usize,
        total: usize,
    },
    Settings {
        theme: Theme,
        locale: Locale,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub topic: String,
    pub kind: String,
    #[serde(default)]
    pub locale: Option<String>,
}

/// One generation result, as delivered to the display layer.
#[derive(Debug, Serialize)]
pub struct GenerateOut {
    pub id: Uuid,
    pub topic: String,
    pub kind: MaterialKind,
    pub content: GeneratedContent,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareOut>,
}

impl GenerateOut {
    pub fn from_history(item: HistoryItem, share: Option<ShareLink>) -> Self {
        Self {
            id: item.id,
            topic: item.topic,
            kind: item.content.kind(),
            content: item.content,
            timestamp: item.timestamp,
            share: share.map(ShareOut::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShareOut {
    pub link: ShareLink,
    pub path: String,
}

impl From<ShareLink> for ShareOut {
    fn from(link: ShareLink) -> Self {
        let path = link.relative();
        Self { link, path }
    }
}

/// `?topic=<key>&type=<Kind>&clientId=<id>[&locale=ms]`
#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub topic: String,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct ClientQuery {
    #[serde(rename = "clientId")]
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatIn {
    pub topic: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatOut {
    pub reply: String,
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreIn {
    pub questions: Vec<QuizQuestion>,
    #[serde(default, deserialize_with = "answers_by_index")]
    pub answers: HashMap<usize, String>,
}

/// Object keys arrive as strings (also inside tagged enums); parse them as
/// question indices.
fn answers_by_index<'de, D: Deserializer<'de>>(d: D) -> Result<HashMap<usize, String>, D::Error> {
    HashMap::<String, String>::deserialize(d)?
        .into_iter()
        .map(|(k, v)| k.trim().parse::<usize>().map(|i| (i, v)).map_err(serde::de::Error::custom))
        .collect()
}

pub type ScoreOut = QuizScore;

/// `generator` is the model name, or null when no API key is configured.
#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generator: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"generate","topic":"Hijrah","kind":"Quiz","locale":"ms"}"#)
                .expect("generate");
        assert!(matches!(msg, ClientWsMessage::Generate { ref kind, .. } if kind == "Quiz"));

        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"score","questions":[],"answers":{"0":"a","3":"b"}}"#).expect("score");
        match msg {
            ClientWsMessage::Score { answers, .. } => assert_eq!(answers.get(&3).map(String::as_str), Some("b")),
            other => panic!("unexpected {other:?}"),
        }

        let err = serde_json::from_str::<ClientWsMessage>(r#"{"type":"score","questions":[],"answers":{"x":"a"}}"#);
        assert!(err.is_err());

        let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"chat_reset"}"#).expect("reset");
        assert!(matches!(msg, ClientWsMessage::ChatReset));
    }

    #[test]
    fn server_messages_are_tagged() {
        let json = serde_json::to_value(ServerWsMessage::ChatReply { text: "ok".into(), transcript_len: 2 }).expect("json");
        assert_eq!(json["type"], "chat_reply");
        assert_eq!(json["transcriptLen"], 2);
    }

    #[test]
    fn chat_in_defaults_history() {
        let body: ChatIn = serde_json::from_str(r#"{"topic":"Badr","message":"When?"}"#).expect("chat");
        assert!(body.history.is_empty());
        assert!(body.locale.is_none());
    }
}
