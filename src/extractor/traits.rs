use crate::extractor::models::{VideoBody, VideoDescriptor};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Turns a playlist URL into a forward-only sequence of entries
///
/// This trait isolates the traversal from the specific resolution method
/// (yt-dlp, a native client, an in-memory fake in tests).
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    /// Returns a unique identifier for this resolver (e.g., "ytdlp")
    fn id(&self) -> &'static str;

    /// Start producing entries for the playlist.
    ///
    /// An error here means the playlist could not be resolved at all.
    async fn resolve(&self, url: &str) -> Result<Box<dyn PlaylistCursor>>;
}

/// Lazy, non-restartable position within a resolved playlist
#[async_trait]
pub trait PlaylistCursor: Send {
    /// Next entry in playlist order.
    ///
    /// `None` ends the sequence. `Some(Err(_))` is a transport failure for
    /// one entry; the cursor may still yield further entries after it.
    async fn next_descriptor(&mut self) -> Option<Result<VideoDescriptor>>;

    /// Open the byte stream of an entry this cursor produced
    async fn open_body(&mut self, descriptor: &VideoDescriptor) -> Result<VideoBody>;
}
