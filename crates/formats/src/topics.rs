use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Topic id → member dois, as served next to the embedding document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct TopicIndex {
    topics: BTreeMap<String, Vec<String>>,
}

#[derive(Debug)]
pub enum TopicIndexError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for TopicIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicIndexError::Io(err) => write!(f, "I/O error: {err}"),
            TopicIndexError::Parse(err) => write!(f, "topic index parse error: {err}"),
        }
    }
}

impl std::error::Error for TopicIndexError {}

impl TopicIndex {
    pub fn from_json_str(payload: &str) -> Result<Self, TopicIndexError> {
        serde_json::from_str(payload).map_err(TopicIndexError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TopicIndexError> {
        let payload = fs::read_to_string(path).map_err(TopicIndexError::Io)?;
        Self::from_json_str(&payload)
    }

    pub fn insert(&mut self, topic: impl Into<String>, dois: Vec<String>) {
        self.topics.insert(topic.into(), dois);
    }

    pub fn get(&self, topic: &str) -> Option<&[String]> {
        self.topics.get(topic).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Topic ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.topics.keys().map(String::as_str)
    }
}
