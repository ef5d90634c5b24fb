//! Progress tracking for a single fetch

use std::time::Duration;

/// Progress of one video's fetch.
///
/// Created when the fetch starts and dropped when it ends; nothing carries
/// over to the next video.
#[derive(Debug, Clone)]
pub struct FetchProgress {
    pub video_id: String,
    /// Announced size, if the source reported one
    pub total_bytes: Option<u64>,
    pub downloaded_bytes: u64,
    pub speed: f64, // bytes per second
    pub eta: Option<Duration>,
    pub status: FetchStatus,
}

impl FetchProgress {
    /// Create a new progress tracker
    pub fn new(video_id: impl Into<String>, total_bytes: Option<u64>) -> Self {
        Self {
            video_id: video_id.into(),
            total_bytes: total_bytes.filter(|t| *t > 0),
            downloaded_bytes: 0,
            speed: 0.0,
            eta: None,
            status: FetchStatus::Starting,
        }
    }

    /// Update progress with new data
    pub fn update(&mut self, downloaded_bytes: u64, speed: f64) {
        self.downloaded_bytes = downloaded_bytes;
        self.speed = speed;
        self.status = FetchStatus::Downloading;

        self.eta = match self.total_bytes {
            Some(total) if downloaded_bytes >= total => Some(Duration::from_secs(0)),
            Some(total) if speed > 0.0 => {
                let remaining = total - downloaded_bytes;
                Some(Duration::from_secs_f64(remaining as f64 / speed))
            }
            _ => None,
        };
    }

    /// Mark as completed
    pub fn complete(&mut self) {
        self.status = FetchStatus::Completed;
        self.eta = Some(Duration::from_secs(0));
    }

    /// Mark as failed
    pub fn failed(&mut self, error: String) {
        self.status = FetchStatus::Failed(error);
    }

    /// Progress percentage (0.0 to 1.0), `None` when the size is unknown
    pub fn percentage(&self) -> Option<f64> {
        self.total_bytes
            .map(|total| self.downloaded_bytes as f64 / total as f64)
    }
}

/// Fetch status
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchStatus {
    #[default]
    Starting,
    Downloading,
    Completed,
    Failed(String),
}

impl FetchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchStatus::Completed | FetchStatus::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_progress() {
        let progress = FetchProgress::new("v1", Some(1000));
        assert_eq!(progress.video_id, "v1");
        assert_eq!(progress.total_bytes, Some(1000));
        assert_eq!(progress.downloaded_bytes, 0);
        assert_eq!(progress.status, FetchStatus::Starting);
    }

    #[test]
    fn test_zero_total_is_unknown() {
        let progress = FetchProgress::new("v1", Some(0));
        assert_eq!(progress.total_bytes, None);
        assert_eq!(progress.percentage(), None);
    }

    #[test]
    fn test_update_computes_eta() {
        let mut progress = FetchProgress::new("v1", Some(1000));
        progress.update(500, 100.0);

        assert_eq!(progress.status, FetchStatus::Downloading);
        assert_eq!(progress.eta.unwrap().as_secs(), 5);
        assert!((progress.percentage().unwrap() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_update_zero_speed_has_no_eta() {
        let mut progress = FetchProgress::new("v1", Some(1000));
        progress.update(100, 0.0);
        assert_eq!(progress.eta, None);
    }

    #[test]
    fn test_update_past_total() {
        let mut progress = FetchProgress::new("v1", Some(1000));
        progress.update(1500, 100.0);
        assert_eq!(progress.eta.unwrap().as_secs(), 0);
        assert!(progress.percentage().unwrap() > 1.0);
    }

    #[test]
    fn test_unknown_size_has_no_percentage() {
        let mut progress = FetchProgress::new("v1", None);
        progress.update(4096, 1024.0);
        assert_eq!(progress.percentage(), None);
        assert_eq!(progress.eta, None);
    }

    #[test]
    fn test_terminal_states() {
        let mut progress = FetchProgress::new("v1", Some(10));
        assert!(!progress.status.is_terminal());

        progress.complete();
        assert!(progress.status.is_terminal());

        progress.failed("Connection lost".to_string());
        match &progress.status {
            FetchStatus::Failed(msg) => assert_eq!(msg, "Connection lost"),
            other => panic!("Status should be Failed, got {:?}", other),
        }
    }
}
