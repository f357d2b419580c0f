//! Built-in topic catalog so share links and the topic picker work without
//! external config.

use crate::domain::Topic;

/// Sirah topics shipped with the app. TOML `[[topics]]` entries with the same
/// key replace these.
pub fn seed_topics() -> Vec<Topic> {
  [
    ("early-life", "The early life of Prophet Muhammad SAW in Mecca"),
    ("first-revelation", "The first revelation in the Cave of Hira"),
    ("isra-miraj", "Isra' and Mi'raj"),
    ("hijrah", "Hijrah of the Prophet SAW to Madinah"),
    ("battle-of-badr", "The Battle of Badr"),
    ("battle-of-uhud", "The Battle of Uhud"),
    ("treaty-of-hudaybiyyah", "The Treaty of Hudaybiyyah"),
    ("conquest-of-mecca", "The Conquest of Mecca"),
    ("farewell-pilgrimage", "The Farewell Pilgrimage"),
  ]
  .into_iter()
  .map(|(key, title)| Topic { key: key.into(), title: title.into() })
  .collect()
}
