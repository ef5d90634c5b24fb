//! Data structures for the playlist ledger

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One fully processed video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub id: String,
    pub title: String,

    /// Hand-added fields, kept as they were
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VideoEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            extra: Map::new(),
        }
    }
}

/// Ledger file contents
///
/// `videos` is the only field tubequeue reads. Anything else a user put in
/// the file is carried through rewrites untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    /// Missing and `null` both read as no videos
    #[serde(default, deserialize_with = "null_as_empty")]
    pub videos: Vec<VideoEntry>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlaylistRecord {
    pub fn contains(&self, id: &str) -> bool {
        self.videos.iter().any(|v| v.id == id)
    }

    /// Append an entry unless one with the same id exists.
    ///
    /// Returns `true` when the record changed.
    pub fn insert(&mut self, id: &str, title: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.videos.push(VideoEntry::new(id, title));
        true
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<VideoEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<VideoEntry>>::deserialize(deserializer)?.unwrap_or_default())
}
