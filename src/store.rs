//! In-memory stores: generation history and per-client preferences.
//!
//! Both are keyed by the client id the frontend keeps in local storage, so one
//! browser never sees another's generations. Both are bounded; the least
//! recently active client is dropped first.
//!
//! Preferences sit behind the `PreferenceStore` port so a persistent backend can
//! replace the in-memory one without touching handlers.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{GeneratedContent, HistoryItem, MaterialKind, Preferences};

/// Entries kept per (topic, kind); the oldest is evicted past this.
pub const HISTORY_LIMIT: usize = 20;
/// Distinct (topic, kind) slots kept per client. Free-text topics each open a slot.
pub const HISTORY_SLOTS_PER_CLIENT: usize = 64;
/// Clients tracked by either store.
pub const CLIENT_LIMIT: usize = 10_000;

type Slot = (String, MaterialKind);

/// A write counter orders activity; wall-clock timestamps can tie.
#[derive(Default)]
struct Tracked<V> {
  entries: HashMap<String, (V, u64)>,
  tick: u64,
}

impl<V: Default> Tracked<V> {
  /// Entry for `key`, marked as most recent. When the map is full and `key` is
  /// new, the least recently touched entry is dropped first.
  fn touch(&mut self, key: &str, limit: usize) -> &mut V {
    self.tick += 1;
    if !self.entries.contains_key(key) && self.entries.len() >= limit {
      let stale = self.entries.iter().min_by_key(|(_, (_, t))| *t).map(|(k, _)| k.clone());
      if let Some(stale) = stale {
        self.entries.remove(&stale);
        debug!(target: "history", key = %stale, "Least recent entry evicted");
      }
    }
    let entry = self.entries.entry(key.to_string()).or_default();
    entry.1 = self.tick;
    &mut entry.0
  }

  fn get(&self, key: &str) -> Option<&V> {
    self.entries.get(key).map(|(v, _)| v)
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.entries.len()
  }
}

/// One client's history, one slot per (topic, kind).
#[derive(Default)]
struct ClientHistory {
  slots: HashMap<Slot, (Vec<HistoryItem>, u64)>,
  tick: u64,
}

impl ClientHistory {
  fn push(&mut self, slot: Slot, item: HistoryItem, slot_limit: usize) {
    self.tick += 1;
    if !self.slots.contains_key(&slot) && self.slots.len() >= slot_limit {
      let stale = self.slots.iter().min_by_key(|(_, (_, t))| *t).map(|(k, _)| k.clone());
      if let Some(stale) = stale {
        self.slots.remove(&stale);
        debug!(target: "history", topic = %stale.0, kind = %stale.1, "History slot evicted");
      }
    }

    let (items, touched) = self.slots.entry(slot).or_default();
    *touched = self.tick;
    items.push(item);
    if items.len() > HISTORY_LIMIT {
      let excess = items.len() - HISTORY_LIMIT;
      items.drain(..excess);
      debug!(target: "history", evicted = excess, "History slot trimmed");
    }
  }

  fn slot(&self, topic: &str, kind: MaterialKind) -> Option<&Vec<HistoryItem>> {
    self.slots.get(&(topic.to_string(), kind)).map(|(items, _)| items)
  }
}

#[derive(Clone)]
pub struct HistoryStore {
  clients: Arc<RwLock<Tracked<ClientHistory>>>,
  client_limit: usize,
  slot_limit: usize,
}

impl Default for HistoryStore {
  fn default() -> Self {
    Self::with_limits(CLIENT_LIMIT, HISTORY_SLOTS_PER_CLIENT)
  }
}

impl HistoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_limits(client_limit: usize, slot_limit: usize) -> Self {
    Self { clients: Arc::default(), client_limit: client_limit.max(1), slot_limit: slot_limit.max(1) }
  }

  /// Record one successful generation for `client_id` and return the stored item.
  #[instrument(level = "debug", skip(self, content), fields(kind = %content.kind()))]
  pub async fn append(&self, client_id: &str, topic: &str, content: GeneratedContent) -> HistoryItem {
    let item = HistoryItem::new(topic, content);
    let slot = (topic.to_string(), item.content.kind());

    let mut clients = self.clients.write().await;
    clients.touch(client_id, self.client_limit).push(slot, item.clone(), self.slot_limit);
    item
  }

  /// Newest first.
  pub async fn list(&self, client_id: &str, topic: &str, kind: MaterialKind) -> Vec<HistoryItem> {
    let clients = self.clients.read().await;
    clients
      .get(client_id)
      .and_then(|c| c.slot(topic, kind))
      .map(|items| items.iter().rev().cloned().collect())
      .unwrap_or_default()
  }

  pub async fn get(&self, client_id: &str, id: Uuid) -> Option<HistoryItem> {
    let clients = self.clients.read().await;
    clients
      .get(client_id)?
      .slots
      .values()
      .flat_map(|(items, _)| items)
      .find(|item| item.id == id)
      .cloned()
  }
}

/// Read/write port for user preferences (theme, locale).
#[async_trait]
pub trait PreferenceStore: Send + Sync {
  async fn load(&self, client_id: &str) -> Preferences;
  async fn save(&self, client_id: &str, prefs: Preferences);
}

/// Bounded map; past `limit` clients the least recently saved one is dropped
/// and falls back to defaults on its next load.
pub struct InMemoryPreferenceStore {
  by_client: RwLock<Tracked<Preferences>>,
  limit: usize,
}

impl Default for InMemoryPreferenceStore {
  fn default() -> Self {
    Self::with_limit(CLIENT_LIMIT)
  }
}

impl InMemoryPreferenceStore {
  pub fn with_limit(limit: usize) -> Self {
    Self { by_client: RwLock::default(), limit: limit.max(1) }
  }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
  async fn load(&self, client_id: &str) -> Preferences {
    self.by_client.read().await.get(client_id).copied().unwrap_or_default()
  }

  async fn save(&self, client_id: &str, prefs: Preferences) {
    *self.by_client.write().await.touch(client_id, self.limit) = prefs;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Flashcard, Locale, Theme};

  fn cards(n: usize) -> GeneratedContent {
    GeneratedContent::TermList(
      (0..n).map(|i| Flashcard { term: format!("t{i}"), definition: "d".into() }).collect(),
    )
  }

  #[tokio::test]
  async fn history_lists_newest_first_per_slot() {
    let store = HistoryStore::new();
    let first = store.append("c1", "Hijrah", cards(1)).await;
    let second = store.append("c1", "Hijrah", cards(2)).await;
    store.append("c1", "Hijrah", GeneratedContent::Text("summary".into())).await;
    store.append("c1", "Badr", cards(3)).await;

    let items = store.list("c1", "Hijrah", MaterialKind::Flashcards).await;
    let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(store.list("c1", "Hijrah", MaterialKind::Summary).await.len(), 1);
    assert!(store.list("c1", "Uhud", MaterialKind::Quiz).await.is_empty());
  }

  #[tokio::test]
  async fn history_is_private_to_each_client() {
    let store = HistoryStore::new();
    let mine = store.append("client-a", "Badr", GeneratedContent::Text("private summary".into())).await;

    assert!(store.list("client-b", "Badr", MaterialKind::Summary).await.is_empty());
    assert!(store.get("client-b", mine.id).await.is_none());
    assert_eq!(store.list("client-a", "Badr", MaterialKind::Summary).await.len(), 1);
    assert_eq!(store.get("client-a", mine.id).await.map(|i| i.id), Some(mine.id));
  }

  #[tokio::test]
  async fn history_evicts_oldest_past_limit() {
    let store = HistoryStore::new();
    let oldest = store.append("c1", "Badr", cards(0)).await;
    for i in 1..=HISTORY_LIMIT {
      store.append("c1", "Badr", cards(i)).await;
    }
    let items = store.list("c1", "Badr", MaterialKind::Flashcards).await;
    assert_eq!(items.len(), HISTORY_LIMIT);
    assert!(store.get("c1", oldest.id).await.is_none());
    assert_eq!(items[0].content.item_count(), HISTORY_LIMIT);
  }

  #[tokio::test]
  async fn history_bounds_slots_and_clients() {
    let store = HistoryStore::with_limits(2, 2);
    store.append("c1", "topic one", cards(1)).await;
    store.append("c1", "topic two", cards(1)).await;
    store.append("c1", "topic three", cards(1)).await;
    assert!(store.list("c1", "topic one", MaterialKind::Flashcards).await.is_empty());
    assert_eq!(store.list("c1", "topic three", MaterialKind::Flashcards).await.len(), 1);

    store.append("c2", "Badr", cards(1)).await;
    store.append("c3", "Badr", cards(1)).await;
    assert!(store.list("c1", "topic three", MaterialKind::Flashcards).await.is_empty());
    assert_eq!(store.list("c3", "Badr", MaterialKind::Flashcards).await.len(), 1);
  }

  #[tokio::test]
  async fn history_get_by_id() {
    let store = HistoryStore::new();
    let item = store.append("c1", "Uhud", cards(2)).await;
    assert_eq!(store.get("c1", item.id).await.map(|i| i.topic), Some("Uhud".to_string()));
    assert!(store.get("c1", Uuid::new_v4()).await.is_none());
  }

  #[tokio::test]
  async fn preferences_default_then_persist() {
    let store = InMemoryPreferenceStore::default();
    assert_eq!(store.load("abc").await, Preferences::default());

    let prefs = Preferences { theme: Theme::Dark, locale: Locale::Ar };
    store.save("abc", prefs).await;
    assert_eq!(store.load("abc").await, prefs);
    assert_eq!(store.load("other").await.theme, Theme::Light);
  }

  #[tokio::test]
  async fn preferences_drop_least_recent_client_past_limit() {
    let store = InMemoryPreferenceStore::with_limit(2);
    let dark = Preferences { theme: Theme::Dark, locale: Locale::Ms };
    store.save("a", dark).await;
    store.save("b", dark).await;
    store.save("a", dark).await;
    store.save("c", dark).await;

    assert_eq!(store.load("a").await, dark);
    assert_eq!(store.load("c").await, dark);
    assert_eq!(store.load("b").await, Preferences::default());
    assert_eq!(store.by_client.read().await.len(), 2);
  }
}
