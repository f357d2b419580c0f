//! Application state: prompts, topic catalog, generation service, stores.
//!
//! This module owns:
//!   - the prompts struct (from TOML or defaults)
//!   - the topic catalog (built-in seeds, overridden/extended by TOML)
//!   - the optional generation service (absent without an API key)
//!   - the history and preference stores

use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument, warn};

use crate::config::{load_study_config_from_env, Prompts, StudyConfig, TopicCfg};
use crate::domain::Topic;
use crate::gemini::{GeminiClient, TextGenerator};
use crate::seeds::seed_topics;
use crate::store::{HistoryStore, InMemoryPreferenceStore, PreferenceStore};

#[derive(Clone)]
pub struct AppState {
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub prompts: Prompts,
    pub topics: Vec<Topic>,
    pub history: HistoryStore,
    pub preferences: Arc<dyn PreferenceStore>,
}

impl AppState {
    /// Build state from env: load config, merge the catalog, init Gemini.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_study_config_from_env().unwrap_or_default();

        let generator: Option<Arc<dyn TextGenerator>> = match GeminiClient::from_env() {
            Some(client) => {
                info!(target: "sirahpidea", base_url = %client.base_url, model = %client.model, "Gemini enabled.");
                Some(Arc::new(client))
            }
            None => {
                warn!(target: "sirahpidea", "Gemini disabled (no GEMINI_API_KEY). Generation requests will fail.");
                None
            }
        };

        Self::new(cfg, generator)
    }

    pub fn new(cfg: StudyConfig, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        let topics = merge_topics(seed_topics(), &cfg.topics);
        info!(target: "sirahpidea", topics = topics.len(), "Topic catalog ready");

        Self {
            generator,
            prompts: cfg.prompts,
            topics,
            history: HistoryStore::new(),
            preferences: Arc::new(InMemoryPreferenceStore::default()),
        }
    }

    pub fn generator(&self) -> Option<&dyn TextGenerator> {
        self.generator.as_deref()
    }

    pub fn topic_by_key(&self, key: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.key == key)
    }

    /// Exact (trimmed, case-insensitive) title match, used to attach share links.
    pub fn topic_by_title(&self, title: &str) -> Option<&Topic> {
        let title = title.trim();
        self.topics.iter().find(|t| t.title.eq_ignore_ascii_case(title))
    }
}

/// Seeds first, in order; config entries replace seeds with the same key and
/// append otherwise.
fn merge_topics(seeds: Vec<Topic>, extra: &[TopicCfg]) -> Vec<Topic> {
    let mut topics = seeds;
    let mut index: HashMap<String, usize> = topics
        .iter()
        .enumerate()
        .map(|(i, t)| (t.key.clone(), i))
        .collect();

    for topic in extra.iter().filter_map(TopicCfg::to_topic) {
        match index.get(&topic.key) {
            Some(&i) => topics[i] = topic,
            None => {
                index.insert(topic.key.clone(), topics.len());
                topics.push(topic);
            }
        }
    }
    topics
}
