//! Traversal states and per-video outcomes

use crate::extractor::models::VideoDescriptor;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Where a traversal currently is.
///
/// `Errored` and `Done` are terminal. Only one video is ever in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalState {
    Resolving,
    /// Descriptor received, ledger not consulted yet
    PerVideo(VideoDescriptor),
    Skipping(VideoDescriptor),
    Fetching(VideoDescriptor),
    HandingOff { video: VideoDescriptor, path: PathBuf, bytes: u64 },
    Advancing,
    Done,
    Errored,
}

impl TraversalState {
    pub fn name(&self) -> &'static str {
        match self {
            TraversalState::Resolving => "resolving",
            TraversalState::PerVideo(_) => "per-video",
            TraversalState::Skipping(_) => "skipping",
            TraversalState::Fetching(_) => "fetching",
            TraversalState::HandingOff { .. } => "handing-off",
            TraversalState::Advancing => "advancing",
            TraversalState::Done => "done",
            TraversalState::Errored => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TraversalState::Done | TraversalState::Errored)
    }

    /// Video in flight, if any
    pub fn video(&self) -> Option<&VideoDescriptor> {
        match self {
            TraversalState::PerVideo(v)
            | TraversalState::Skipping(v)
            | TraversalState::Fetching(v)
            | TraversalState::HandingOff { video: v, .. } => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for TraversalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.video() {
            Some(v) => write!(f, "{}({})", self.name(), v.id),
            None => f.write_str(self.name()),
        }
    }
}

/// What happened to one playlist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoOutcome {
    /// Already in the ledger, nothing fetched
    Skipped { id: String, title: String },
    /// Fetched, handed to the player and committed
    Queued {
        id: String,
        title: String,
        path: PathBuf,
        bytes: u64,
    },
    /// Fetch abandoned; any partial file stays on disk
    FetchFailed {
        id: String,
        title: String,
        error: String,
    },
    /// File on disk but the player refused it; not committed
    HandoffFailed {
        id: String,
        title: String,
        path: PathBuf,
        error: String,
    },
    /// The resolver reported an entry it could not describe
    Unresolved { error: String },
}

impl VideoOutcome {
    pub fn id(&self) -> Option<&str> {
        match self {
            VideoOutcome::Skipped { id, .. }
            | VideoOutcome::Queued { id, .. }
            | VideoOutcome::FetchFailed { id, .. }
            | VideoOutcome::HandoffFailed { id, .. } => Some(id),
            VideoOutcome::Unresolved { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            VideoOutcome::FetchFailed { .. }
                | VideoOutcome::HandoffFailed { .. }
                | VideoOutcome::Unresolved { .. }
        )
    }
}

/// Result of one traversal
#[derive(Debug, Clone)]
pub struct TraversalReport {
    pub playlist_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// One outcome per entry, in playlist order
    pub outcomes: Vec<VideoOutcome>,
}

impl TraversalReport {
    pub fn new(playlist_url: impl Into<String>) -> Self {
        Self {
            playlist_url: playlist_url.into(),
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: VideoOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn summary(&self) -> TraversalSummary {
        let mut summary = TraversalSummary::default();
        for outcome in &self.outcomes {
            match outcome {
                VideoOutcome::Skipped { .. } => summary.skipped += 1,
                VideoOutcome::Queued { .. } => summary.queued += 1,
                VideoOutcome::FetchFailed { .. } => summary.fetch_failed += 1,
                VideoOutcome::HandoffFailed { .. } => summary.handoff_failed += 1,
                VideoOutcome::Unresolved { .. } => summary.unresolved += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(VideoOutcome::is_failure)
    }

    /// Ids in the order they were encountered
    pub fn ids(&self) -> Vec<&str> {
        self.outcomes.iter().filter_map(VideoOutcome::id).collect()
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// Outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalSummary {
    pub queued: usize,
    pub skipped: usize,
    pub fetch_failed: usize,
    pub handoff_failed: usize,
    pub unresolved: usize,
}

impl fmt::Display for TraversalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} queued, {} skipped, {} fetch failures, {} player failures, {} unresolved",
            self.queued, self.skipped, self.fetch_failed, self.handoff_failed, self.unresolved
        )
    }
}
