//! Episode store
//!
//! The catalogue is read once at startup and never mutated afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::{Error, Result};

/// One line of episode text, sent as its own message bubble
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Line {
    pub text: String,
}

/// A single episode of the story
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Episode {
    #[serde(rename = "episode")]
    pub id: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl Episode {
    /// Heading bubble, e.g. `第3話「再会」`. Falls back to the subtitle.
    pub fn heading(&self) -> Option<String> {
        self.title
            .as_deref()
            .or(self.subtitle.as_deref())
            .map(|title| format!("第{}話「{}」", self.id, title))
    }

    /// Heading (if any) followed by every line, in file order
    pub fn to_messages(&self) -> Vec<String> {
        self.heading()
            .into_iter()
            .chain(self.lines.iter().map(|line| line.text.clone()))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct EpisodeFile {
    #[serde(default)]
    episodes: Vec<Episode>,
}

/// Read-only mapping from the decimal id string to its episode
#[derive(Debug, Clone)]
pub struct EpisodeStore {
    episodes: HashMap<String, Episode>,
    max_id: u32,
}

impl EpisodeStore {
    /// Load the catalogue from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Catalog(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let store = Self::from_json(&content)?;
        info!("Loaded {} episodes from {}", store.len(), path.display());
        Ok(store)
    }

    /// Build the catalogue from a JSON document of the form `{"episodes": [...]}`
    pub fn from_json(content: &str) -> Result<Self> {
        let file: EpisodeFile = serde_json::from_str(content)?;
        Self::from_episodes(file.episodes)
    }

    /// Build the catalogue from already-parsed episodes
    pub fn from_episodes(episodes: Vec<Episode>) -> Result<Self> {
        if episodes.is_empty() {
            return Err(Error::Catalog("No episodes found".to_string()));
        }

        let mut map = HashMap::with_capacity(episodes.len());
        let mut max_id = 0;
        for episode in episodes {
            let id = episode.id;
            if map.insert(id.to_string(), episode).is_some() {
                return Err(Error::Catalog(format!("Duplicate episode {}", id)));
            }
            max_id = max_id.max(id);
        }

        Ok(Self {
            episodes: map,
            max_id,
        })
    }

    /// Look up an episode by its id string. `"03"` does not match episode 3.
    pub fn lookup(&self, id: &str) -> Option<&Episode> {
        self.episodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Highest episode number in the catalogue
    pub fn max_id(&self) -> u32 {
        self.max_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "episodes": [
            {"episode": 1, "title": "出会い", "lines": [{"text": "a"}, {"text": "b"}]},
            {"episode": 2, "subtitle": "雨の日", "lines": [{"text": "c"}]},
            {"episode": 3, "lines": []}
        ]
    }"#;

    #[test]
    fn test_from_json_and_lookup() {
        let store = EpisodeStore::from_json(SAMPLE).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.max_id(), 3);

        let ep = store.lookup("1").unwrap();
        assert_eq!(ep.title.as_deref(), Some("出会い"));
        assert_eq!(ep.lines.len(), 2);

        assert!(store.lookup("4").is_none());
        assert!(store.lookup("01").is_none());
        assert!(store.lookup("").is_none());
    }

    #[test]
    fn test_heading_fallback() {
        let store = EpisodeStore::from_json(SAMPLE).unwrap();
        assert_eq!(
            store.lookup("1").unwrap().heading().as_deref(),
            Some("第1話「出会い」")
        );
        assert_eq!(
            store.lookup("2").unwrap().heading().as_deref(),
            Some("第2話「雨の日」")
        );
        assert!(store.lookup("3").unwrap().heading().is_none());
    }

    #[test]
    fn test_to_messages_preserves_order() {
        let store = EpisodeStore::from_json(SAMPLE).unwrap();
        assert_eq!(
            store.lookup("1").unwrap().to_messages(),
            vec!["第1話「出会い」", "a", "b"]
        );
        assert!(store.lookup("3").unwrap().to_messages().is_empty());
    }

    #[test]
    fn test_empty_catalogue_rejected() {
        assert!(EpisodeStore::from_json(r#"{"episodes": []}"#).is_err());
        assert!(EpisodeStore::from_json("{}").is_err());
    }

    #[test]
    fn test_duplicate_rejected() {
        let json = r#"{"episodes": [{"episode": 1, "lines": []}, {"episode": 1, "lines": []}]}"#;
        let err = EpisodeStore::from_json(json).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!(
            EpisodeStore::from_json("not json"),
            Err(Error::Json(_))
        ));
        assert!(EpisodeStore::from_json(r#"{"episodes": [{"title": "no id"}]}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = EpisodeStore::load(file.path()).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EpisodeStore::load("/nonexistent/episodes.json").unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }
}
