//! Data structures for playlist entries

use crate::utils::error::Result;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde::Deserialize;

/// Metadata for one playlist entry, available before its bytes are
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDescriptor {
    /// Stable identifier on the source platform
    pub id: String,
    /// Display name, not unique and not filesystem-safe
    pub title: String,
    /// File stem for the download, already filesystem-safe
    pub suggested_filename: String,
    /// Page URL used to fetch the video
    pub url: String,
}

impl VideoDescriptor {
    /// Descriptor with yt-dlp's default `title-id` file stem
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        let title = title.into();
        let suggested_filename = suggested_filename(&title, &id);
        Self {
            id,
            title,
            suggested_filename,
            url: url.into(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.suggested_filename = sanitize_filename(&filename.into());
        self
    }
}

/// Byte stream of one video body
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// Open body of one video
pub struct VideoBody {
    /// Announced size, when the source knows it
    pub content_length: Option<u64>,
    pub stream: BodyStream,
}

impl VideoBody {
    pub fn new(stream: BodyStream, content_length: Option<u64>) -> Self {
        Self {
            content_length,
            stream,
        }
    }

    /// Body served from memory in the given chunks
    pub fn from_chunks(chunks: Vec<Vec<u8>>) -> Self {
        let len = chunks.iter().map(|c| c.len() as u64).sum();
        let stream = futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c)))).boxed();
        Self::new(stream, Some(len))
    }
}

impl std::fmt::Debug for VideoBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// One line of `yt-dlp --flat-playlist --dump-json`
#[derive(Debug, Clone, Deserialize)]
pub struct FlatPlaylistEntry {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
}

impl From<FlatPlaylistEntry> for VideoDescriptor {
    fn from(entry: FlatPlaylistEntry) -> Self {
        let url = entry
            .webpage_url
            .or_else(|| entry.url.filter(|u| u.contains("://")))
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", entry.id));
        let title = entry
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| entry.id.clone());
        VideoDescriptor::new(entry.id, title, url)
    }
}

/// yt-dlp's default output stem: `<title>-<id>`
pub fn suggested_filename(title: &str, id: &str) -> String {
    sanitize_filename(&format!("{}-{}", title, id))
}

/// Replace characters that are unsafe in file names on any platform
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
        assert_eq!(sanitize_filename("  ..hidden.. "), "hidden");
        assert_eq!(sanitize_filename("..."), "video");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
    }

    #[test]
    fn test_descriptor_default_filename() {
        let d = VideoDescriptor::new("abc", "My <Song>", "https://example.com/abc");
        assert_eq!(d.suggested_filename, "My _Song_-abc");
    }

    #[test]
    fn test_flat_entry_conversion() {
        let entry: FlatPlaylistEntry = serde_json::from_str(
            r#"{"_type":"url","id":"dQw4w9WgXcQ","title":"Song","url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ","duration":212}"#,
        )
        .unwrap();
        let d = VideoDescriptor::from(entry);
        assert_eq!(d.id, "dQw4w9WgXcQ");
        assert_eq!(d.title, "Song");
        assert_eq!(d.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(d.suggested_filename, "Song-dQw4w9WgXcQ");
    }

    #[test]
    fn test_flat_entry_without_title_or_full_url() {
        let entry: FlatPlaylistEntry =
            serde_json::from_str(r#"{"id":"xyz","url":"xyz"}"#).unwrap();
        let d = VideoDescriptor::from(entry);
        assert_eq!(d.title, "xyz");
        assert_eq!(d.url, "https://www.youtube.com/watch?v=xyz");
    }

    #[tokio::test]
    async fn test_body_from_chunks() {
        let body = VideoBody::from_chunks(vec![vec![1, 2], vec![3]]);
        assert_eq!(body.content_length, Some(3));
        let chunks: Vec<_> = body.stream.collect().await;
        assert_eq!(chunks.len(), 2);
    }
}
