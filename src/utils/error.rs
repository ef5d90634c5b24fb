//! Error handling for tubequeue

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, TubequeueError>;

/// Main error type for tubequeue
#[derive(Debug, Error)]
pub enum TubequeueError {
    /// Missing or invalid startup input
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ledger file unreadable, corrupt or unwritable
    #[error("Ledger error: {0}")]
    Storage(String),

    /// Playlist resolution or video fetch failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The player rejected the file or could not be started
    #[error("Player handoff failed: {0}")]
    Handoff(String),

    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Coarse classification used by the traversal to decide whether an error
/// ends the run or only the current video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Storage,
    Transport,
    Handoff,
}

impl TubequeueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TubequeueError::Config(_) | TubequeueError::YtDlpNotFound => ErrorKind::Config,
            TubequeueError::Storage(_)
            | TubequeueError::IoError(_)
            | TubequeueError::SerializationError(_) => ErrorKind::Storage,
            TubequeueError::Transport(_) | TubequeueError::NetworkError(_) => {
                ErrorKind::Transport
            }
            TubequeueError::Handoff(_) => ErrorKind::Handoff,
        }
    }

    /// Whether this error must stop the whole traversal
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config | ErrorKind::Storage)
    }

    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        TubequeueError::Storage(format!("{}: {}", context, err))
    }

    pub(crate) fn transport(context: &str, err: impl std::fmt::Display) -> Self {
        TubequeueError::Transport(format!("{}: {}", context, err))
    }
}
