//! tubequeue library
//!
//! Downloads every video of a playlist in order, remembers what was already
//! handled in `<output>/playlist.json`, and queues each finished file in an
//! external media player.

pub mod downloader;
pub mod extractor;
pub mod ledger;
pub mod player;
pub mod traversal;
pub mod utils;

// Re-export main types for easier use
pub use downloader::{FetchProgress, FetchStatus};
pub use extractor::{PlaylistCursor, PlaylistResolver, VideoBody, VideoDescriptor, YtDlpResolver};
pub use ledger::{LedgerStore, PlaylistRecord, VideoEntry};
pub use player::{ExternalPlayer, HandoffPolicy, Player};
pub use traversal::{PlaylistTraversal, TraversalReport, TraversalSettings, VideoOutcome};
pub use utils::{Configuration, Result, TubequeueError};
