//! Streams one video body into a file
//!
//! The destination ends up holding exactly the bytes the stream produced.
//! Completeness is not checked beyond the stream ending cleanly. On a
//! transport error the partial file is left where it is.

use crate::downloader::progress::FetchProgress;
use crate::extractor::models::VideoBody;
use crate::utils::error::{Result, TubequeueError};
use futures::StreamExt;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Minimum interval between two progress reports
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Write `body` to `output_path`, returning the number of bytes written.
///
/// Progress is sent best-effort on `progress_tx`; a full or closed channel
/// never slows down or fails the fetch. Every fetch ends with either a
/// `Completed` or a `Failed` update.
pub async fn fetch_to_file(
    video_id: &str,
    body: VideoBody,
    output_path: &Path,
    progress_tx: Option<&mpsc::Sender<FetchProgress>>,
) -> Result<u64> {
    debug!("Fetching {} into {:?}", video_id, output_path);

    let expected = body.content_length;
    let mut progress = FetchProgress::new(video_id, expected);
    report(progress_tx, &progress);

    let downloaded = match write_body(body, output_path, &mut progress, progress_tx).await {
        Ok(downloaded) => downloaded,
        Err(e) => {
            progress.failed(e.to_string());
            report(progress_tx, &progress);
            return Err(e);
        }
    };

    progress.complete();
    report(progress_tx, &progress);

    if let Some(expected) = expected {
        if expected != downloaded {
            warn!(
                "{}: stream ended after {} of {} announced bytes",
                video_id, downloaded, expected
            );
        }
    }

    debug!("Fetched {} bytes for {}", downloaded, video_id);
    Ok(downloaded)
}

async fn write_body(
    body: VideoBody,
    output_path: &Path,
    progress: &mut FetchProgress,
    progress_tx: Option<&mpsc::Sender<FetchProgress>>,
) -> Result<u64> {
    let mut file = File::create(output_path).await.map_err(|e| {
        TubequeueError::transport(&format!("Failed to create {}", output_path.display()), e)
    })?;

    let start_time = Instant::now();
    let mut last_report = start_time;
    let mut downloaded = 0u64;
    let mut stream = body.stream;

    while let Some(chunk_result) = stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(e) => {
                // Keep what arrived so far on disk
                let _ = file.flush().await;
                return Err(e);
            }
        };

        file.write_all(&chunk).await.map_err(|e| {
            TubequeueError::transport(&format!("Failed to write {}", output_path.display()), e)
        })?;
        downloaded += chunk.len() as u64;

        let now = Instant::now();
        if now.duration_since(last_report) >= PROGRESS_INTERVAL {
            progress.update(downloaded, speed(downloaded, start_time));
            report(progress_tx, progress);
            last_report = now;
        }
    }

    file.flush().await.map_err(|e| {
        TubequeueError::transport(&format!("Failed to flush {}", output_path.display()), e)
    })?;

    progress.update(downloaded, speed(downloaded, start_time));
    Ok(downloaded)
}

fn speed(downloaded: u64, start_time: Instant) -> f64 {
    let elapsed = start_time.elapsed().as_secs_f64();
    if elapsed > 0.0 {
        downloaded as f64 / elapsed
    } else {
        0.0
    }
}

fn report(progress_tx: Option<&mpsc::Sender<FetchProgress>>, progress: &FetchProgress) {
    if let Some(tx) = progress_tx {
        // Terminal updates matter more than intermediate ones but neither may block.
        if let Err(e) = tx.try_send(progress.clone()) {
            if progress.status.is_terminal() {
                debug!("Dropped final progress update: {}", e);
            }
        }
    }
}
