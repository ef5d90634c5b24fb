//! Run configuration
//!
//! Resolved once from the command line before the traversal starts and never
//! mutated afterwards.

use crate::player::HandoffPolicy;
use crate::utils::error::{Result, TubequeueError};
use crate::utils::platform;
use std::path::PathBuf;

/// Base URL used when only a playlist id is given
pub const PLAYLIST_URL_PREFIX: &str = "https://www.youtube.com/playlist?list=";

/// Default format preference, also used as the output file extension
pub const DEFAULT_FORMAT: &str = "mp4";

/// Raw startup inputs, before validation.
///
/// The binary fills this from `clap`; tests build it directly.
#[derive(Debug, Clone, Default)]
pub struct ConfigInput {
    pub playlist: Option<String>,
    pub url: Option<String>,
    pub output: Option<PathBuf>,
    pub player: Option<PathBuf>,
    pub enqueue_flag: Option<String>,
    pub format: Option<String>,
    pub ytdlp: Option<PathBuf>,
    pub handoff_policy: HandoffPolicy,
}

/// Immutable run configuration
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Directory receiving the videos and the ledger
    pub output_dir: PathBuf,

    /// Playlist to traverse
    pub playlist_url: String,

    /// Media player executable
    pub player_path: PathBuf,

    /// Argument telling the player to queue rather than play
    pub enqueue_flag: String,

    /// Format preference handed to yt-dlp
    pub format: String,

    /// Explicit yt-dlp location, discovered when absent
    pub ytdlp_path: Option<PathBuf>,

    /// How a player invocation is judged
    pub handoff_policy: HandoffPolicy,
}

impl Configuration {
    /// Validate startup inputs.
    ///
    /// `url` wins over `playlist`; a bare playlist id is expanded to a full URL.
    pub fn from_input(input: ConfigInput) -> Result<Self> {
        let output_dir = input
            .output
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| TubequeueError::Config("The --output parameter is mandatory".into()))?;

        let playlist_url = resolve_playlist_url(input.url.as_deref(), input.playlist.as_deref())
            .ok_or_else(|| {
                TubequeueError::Config(
                    "Please provide either the --playlist or the --url parameters".into(),
                )
            })?;

        let format = input
            .format
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());

        Ok(Self {
            output_dir,
            playlist_url,
            player_path: input.player.unwrap_or_else(platform::default_player_path),
            enqueue_flag: input
                .enqueue_flag
                .unwrap_or_else(|| platform::default_enqueue_flag().to_string()),
            format,
            ytdlp_path: input.ytdlp,
            handoff_policy: input.handoff_policy,
        })
    }

    /// Location of the ledger inside the output directory
    pub fn ledger_path(&self) -> PathBuf {
        crate::ledger::ledger_path(&self.output_dir)
    }

    /// Extension given to downloaded files
    pub fn file_extension(&self) -> &str {
        // Selector expressions such as "best[ext=mp4]" are not extensions.
        if self.format.chars().all(|c| c.is_ascii_alphanumeric()) {
            &self.format
        } else {
            DEFAULT_FORMAT
        }
    }
}

fn resolve_playlist_url(url: Option<&str>, playlist: Option<&str>) -> Option<String> {
    let url = url.map(str::trim).filter(|u| !u.is_empty());
    if let Some(url) = url {
        return Some(url.to_string());
    }

    playlist
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| format!("{}{}", PLAYLIST_URL_PREFIX, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    fn input() -> ConfigInput {
        ConfigInput {
            playlist: Some("PL123".to_string()),
            output: Some(PathBuf::from("/tmp/music")),
            ..Default::default()
        }
    }

    #[test]
    fn test_playlist_id_expands_to_url() {
        let config = Configuration::from_input(input()).unwrap();
        assert_eq!(
            config.playlist_url,
            "https://www.youtube.com/playlist?list=PL123"
        );
        assert_eq!(config.format, "mp4");
        assert_eq!(config.ledger_path(), PathBuf::from("/tmp/music/playlist.json"));
    }

    #[test]
    fn test_url_takes_priority_over_playlist() {
        let mut raw = input();
        raw.url = Some("https://example.com/list".to_string());
        let config = Configuration::from_input(raw).unwrap();
        assert_eq!(config.playlist_url, "https://example.com/list");
    }

    #[test]
    fn test_missing_output_is_config_error() {
        let mut raw = input();
        raw.output = None;
        let err = Configuration::from_input(raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("--output"));
    }

    #[test]
    fn test_missing_playlist_and_url_is_config_error() {
        let mut raw = input();
        raw.playlist = Some("   ".to_string());
        let err = Configuration::from_input(raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_explicit_player_and_flag() {
        let mut raw = input();
        raw.player = Some(PathBuf::from("/opt/player"));
        raw.enqueue_flag = Some("--enqueue".to_string());
        let config = Configuration::from_input(raw).unwrap();
        assert_eq!(config.player_path, PathBuf::from("/opt/player"));
        assert_eq!(config.enqueue_flag, "--enqueue");
    }

    #[test]
    fn test_file_extension_from_format() {
        let mut raw = input();
        raw.format = Some("webm".to_string());
        assert_eq!(Configuration::from_input(raw).unwrap().file_extension(), "webm");

        let mut raw = input();
        raw.format = Some("best[ext=mp4]".to_string());
        assert_eq!(Configuration::from_input(raw).unwrap().file_extension(), "mp4");
    }
}
