//! The story-source seam: where passage text comes from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Read-only queries the engine needs from a loaded story.
pub trait StorySource {
    fn passage_source(&self, name: &str) -> Option<&str>;
    fn passage_tags(&self, name: &str) -> &[String];
    fn passage_names(&self) -> Vec<&str>;
    fn start_passage(&self) -> &str;
}

/// A story held fully in memory, used by tests and the CLI manifest loader.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStory {
    start: String,
    passages: BTreeMap<String, Passage>,
}

#[derive(Debug, Clone, Default)]
struct Passage {
    source: String,
    tags: Vec<String>,
}

impl InMemoryStory {
    pub fn new(start: impl Into<String>) -> Self {
        InMemoryStory {
            start: start.into(),
            passages: BTreeMap::new(),
        }
    }

    pub fn add_passage(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.passages.insert(
            name.into(),
            Passage {
                source: source.into(),
                tags: Vec::new(),
            },
        );
    }

    pub fn add_tagged_passage(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
        tags: Vec<String>,
    ) {
        self.passages.insert(
            name.into(),
            Passage {
                source: source.into(),
                tags,
            },
        );
    }

    /// Convenience for a one-passage story named `Start`.
    pub fn single(source: impl Into<String>) -> Self {
        let mut story = InMemoryStory::new("Start");
        story.add_passage("Start", source);
        story
    }
}

impl StorySource for InMemoryStory {
    fn passage_source(&self, name: &str) -> Option<&str> {
        self.passages.get(name).map(|p| p.source.as_str())
    }

    fn passage_tags(&self, name: &str) -> &[String] {
        static EMPTY: [String; 0] = [];
        self.passages.get(name).map_or(&EMPTY, |p| p.tags.as_slice())
    }

    fn passage_names(&self) -> Vec<&str> {
        self.passages.keys().map(String::as_str).collect()
    }

    fn start_passage(&self) -> &str {
        &self.start
    }
}

/// The on-disk story format the CLI loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryManifest {
    pub start: String,
    pub passages: BTreeMap<String, PassageManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageManifest {
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<StoryManifest> for InMemoryStory {
    fn from(manifest: StoryManifest) -> Self {
        let mut story = InMemoryStory::new(manifest.start);
        for (name, passage) in manifest.passages {
            story.add_tagged_passage(name, passage.source, passage.tags);
        }
        story
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_round_trips_into_a_story() {
        let json = r#"{
            "start": "Start",
            "passages": {
                "Start": { "source": "Hello" },
                "Attic": { "source": "Dusty", "tags": ["dark"] }
            }
        }"#;
        let manifest: StoryManifest = serde_json::from_str(json).unwrap();
        let story: InMemoryStory = manifest.into();
        assert_eq!(story.start_passage(), "Start");
        assert_eq!(story.passage_source("Start"), Some("Hello"));
        assert_eq!(story.passage_tags("Attic"), ["dark".to_string()]);
        assert_eq!(story.passage_names(), vec!["Attic", "Start"]);
    }
}
