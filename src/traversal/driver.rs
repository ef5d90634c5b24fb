//! Playlist traversal driver
//!
//! Walks the playlist strictly one entry at a time:
//!
//! ```text
//! Resolving -> Advancing -> PerVideo -> Skipping ----------------> Advancing
//!                                    -> Fetching -> HandingOff -> Advancing
//! Advancing -> Done (sequence exhausted)
//! Resolving | PerVideo | HandingOff -> Errored (fatal error)
//! ```
//!
//! The next descriptor is only requested once the current entry's handoff
//! has resolved. Transport and handoff failures affect one entry only; ledger
//! failures end the traversal.

use crate::downloader::{fetch_to_file, FetchProgress};
use crate::extractor::models::VideoDescriptor;
use crate::extractor::traits::{PlaylistCursor, PlaylistResolver};
use crate::ledger::LedgerStore;
use crate::player::Player;
use crate::traversal::state::{TraversalReport, TraversalState, VideoOutcome};
use crate::utils::config::Configuration;
use crate::utils::error::{Result, TubequeueError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What a traversal needs to know about its run
#[derive(Debug, Clone)]
pub struct TraversalSettings {
    pub playlist_url: String,
    pub output_dir: PathBuf,
    /// Appended to each descriptor's suggested filename
    pub file_extension: String,
}

impl From<&Configuration> for TraversalSettings {
    fn from(config: &Configuration) -> Self {
        Self {
            playlist_url: config.playlist_url.clone(),
            output_dir: config.output_dir.clone(),
            file_extension: config.file_extension().to_string(),
        }
    }
}

/// Drives one pass over a playlist
pub struct PlaylistTraversal {
    settings: TraversalSettings,
    resolver: Arc<dyn PlaylistResolver>,
    player: Arc<dyn Player>,
    ledger: LedgerStore,
    progress_tx: Option<mpsc::Sender<FetchProgress>>,
}

impl PlaylistTraversal {
    pub fn new(
        settings: TraversalSettings,
        resolver: Arc<dyn PlaylistResolver>,
        player: Arc<dyn Player>,
    ) -> Self {
        let ledger = LedgerStore::new(&settings.output_dir);
        Self {
            settings,
            resolver,
            player,
            ledger,
            progress_tx: None,
        }
    }

    /// Send fetch progress to `tx` while downloading
    pub fn with_progress(mut self, tx: mpsc::Sender<FetchProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn settings(&self) -> &TraversalSettings {
        &self.settings
    }

    /// Where a descriptor's file lands
    pub fn output_path(&self, video: &VideoDescriptor) -> PathBuf {
        self.settings.output_dir.join(format!(
            "{}.{}",
            video.suggested_filename, self.settings.file_extension
        ))
    }

    /// Run until the playlist is exhausted or a fatal error occurs
    pub async fn run(&self) -> Result<TraversalReport> {
        let mut report = TraversalReport::new(&self.settings.playlist_url);

        info!("All videos will be downloaded to {}", self.settings.output_dir.display());
        self.prepare().await?;

        debug!(state = %TraversalState::Resolving, "Traversal transition");
        info!("Analyzing playlist url {}", self.settings.playlist_url);
        let mut cursor = match self.resolver.resolve(&self.settings.playlist_url).await {
            Ok(cursor) => cursor,
            Err(e) => {
                error!("Error while resolving playlist: {}", e);
                debug!(state = %TraversalState::Errored, "Traversal transition");
                return Err(e);
            }
        };

        let mut state = TraversalState::Advancing;
        loop {
            debug!(state = %state, "Traversal transition");
            if state == TraversalState::Done {
                break;
            }

            state = match self.step(state, cursor.as_mut(), &mut report).await {
                Ok(next) => next,
                Err(e) => {
                    error!("Traversal stopped: {}", e);
                    debug!(state = %TraversalState::Errored, "Traversal transition");
                    return Err(e);
                }
            };
        }

        report.finish();
        info!(
            "Finished playlist {}: {}",
            self.settings.playlist_url,
            report.summary()
        );
        Ok(report)
    }

    /// Create the output directory and bootstrap the ledger
    async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.settings.output_dir)
            .await
            .map_err(|e| TubequeueError::storage("Failed to create output directory", e))?;
        let record = self.ledger.load().await?;
        debug!("Ledger lists {} processed videos", record.len());
        Ok(())
    }

    /// Perform one transition. Only fatal errors are returned.
    async fn step(
        &self,
        state: TraversalState,
        cursor: &mut dyn PlaylistCursor,
        report: &mut TraversalReport,
    ) -> Result<TraversalState> {
        let next = match state {
            TraversalState::Advancing => match cursor.next_descriptor().await {
                None => TraversalState::Done,
                Some(Ok(video)) => TraversalState::PerVideo(video),
                Some(Err(e)) if e.is_fatal() => return Err(e),
                Some(Err(e)) => {
                    error!("Error while reading playlist entry: {}", e);
                    report.record(VideoOutcome::Unresolved {
                        error: e.to_string(),
                    });
                    TraversalState::Advancing
                }
            },

            TraversalState::PerVideo(video) => {
                info!("Processing {} - {}", video.title, video.id);
                if self.ledger.contains(&video.id).await? {
                    TraversalState::Skipping(video)
                } else {
                    TraversalState::Fetching(video)
                }
            }

            TraversalState::Skipping(video) => {
                info!("Skipping {} because it has already been downloaded", video.title);
                report.record(VideoOutcome::Skipped {
                    id: video.id,
                    title: video.title,
                });
                TraversalState::Advancing
            }

            TraversalState::Fetching(video) => {
                let path = self.output_path(&video);
                match self.fetch(cursor, &video, &path).await {
                    Ok(bytes) => {
                        info!("Finished processing {}", video.title);
                        TraversalState::HandingOff { video, path, bytes }
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        error!("Error while downloading {}: {}", video.title, e);
                        report.record(VideoOutcome::FetchFailed {
                            id: video.id,
                            title: video.title,
                            error: e.to_string(),
                        });
                        TraversalState::Advancing
                    }
                }
            }

            TraversalState::HandingOff { video, path, bytes } => {
                info!("Adding {} to the player queue", video.title);
                match self.player.enqueue(&path).await {
                    Ok(()) => {
                        self.ledger.commit(&video.id, &video.title).await?;
                        info!("Successfully added {} to the player queue", video.title);
                        report.record(VideoOutcome::Queued {
                            id: video.id,
                            title: video.title,
                            path,
                            bytes,
                        });
                    }
                    Err(e) => {
                        warn!("Error while adding {} to the player queue: {}", video.title, e);
                        report.record(VideoOutcome::HandoffFailed {
                            id: video.id,
                            title: video.title,
                            path,
                            error: e.to_string(),
                        });
                    }
                }
                TraversalState::Advancing
            }

            TraversalState::Resolving | TraversalState::Done | TraversalState::Errored => {
                // Resolving happens before the loop; terminal states never step.
                TraversalState::Done
            }
        };
        Ok(next)
    }

    async fn fetch(
        &self,
        cursor: &mut dyn PlaylistCursor,
        video: &VideoDescriptor,
        path: &Path,
    ) -> Result<u64> {
        let body = cursor.open_body(video).await?;
        fetch_to_file(&video.id, body, path, self.progress_tx.as_ref()).await
    }
}
