//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//!
//! Each connection owns one `ChatSession`; a chat message for a different topic
//! starts a fresh transcript. Generations are recorded under the message's
//! `clientId`, or under a per-connection id when it is absent.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::chat::ChatSession;
use crate::domain::{Locale, MaterialKind, Preferences};
use crate::error::StudyError;
use crate::logic;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "sirahpidea", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let mut conn = Connection::new();
  info!(target: "sirahpidea", connection_id = %conn.id, "WebSocket connected");

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "sirahpidea", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut conn).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "sirahpidea", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "sirahpidea", connection_id = %conn.id, turns = conn.chat.turns().len(), "WebSocket disconnected");
}

/// Per-socket state.
struct Connection {
  id: String,
  chat: ChatSession,
}

impl Connection {
  fn new() -> Self {
    Self { id: Uuid::new_v4().to_string(), chat: ChatSession::default() }
  }
}

fn error_reply(e: StudyError) -> ServerWsMessage {
  e.log();
  ServerWsMessage::Error { message: e.user_message() }
}

#[instrument(level = "info", skip(state, conn))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, conn: &mut Connection) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Generate { topic, kind, locale, client_id } => {
      let locale = Locale::from_code(locale.as_deref());
      let client_id = client_id.unwrap_or_else(|| conn.id.clone());
      let result = match kind.parse::<MaterialKind>() {
        Ok(kind) => logic::generate(state, &client_id, &topic, kind, locale).await,
        Err(e) => Err(e),
      };
      match result {
        Ok(result) => {
          info!(target: "generation", id = %result.id, kind = %result.kind, "WS generate served");
          ServerWsMessage::Generated { result }
        }
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::Chat { topic, text, locale } => {
      let topic = topic.trim();
      if topic.is_empty() {
        return error_reply(StudyError::EmptyTopic);
      }
      conn.chat.set_topic(topic);
      let locale = Locale::from_code(locale.as_deref());
      let reply = conn
        .chat
        .send(state.generator(), &state.prompts, locale.language_name(), &text)
        .await
        .map(|turn| turn.text.clone());
      match reply {
        Ok(text) => ServerWsMessage::ChatReply { text, transcript_len: conn.chat.turns().len() },
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::ChatReset => {
      conn.chat.reset();
      ServerWsMessage::ChatReply { text: String::new(), transcript_len: 0 }
    }

    ClientWsMessage::Score { questions, answers } => {
      let score = logic::score(&questions, &answers);
      ServerWsMessage::Score { correct: score.correct, total: score.total }
    }

    ClientWsMessage::SaveSettings { client_id, theme, locale } => {
      let prefs = Preferences { theme, locale: Locale::from_code(locale.as_deref()) };
      state.preferences.save(&client_id, prefs).await;
      ServerWsMessage::Settings { theme: prefs.theme, locale: prefs.locale }
    }
  }
}
