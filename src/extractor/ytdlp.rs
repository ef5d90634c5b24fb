//! yt-dlp wrapper for playlist resolution
//!
//! Entries are read one JSON line at a time from a running
//! `yt-dlp --flat-playlist --dump-json` process, so the playlist is consumed
//! lazily. Each body is fetched either directly over HTTP, when yt-dlp
//! reports a single media URL, or by streaming yt-dlp's own stdout.

use crate::extractor::models::{FlatPlaylistEntry, VideoBody, VideoDescriptor};
use crate::extractor::traits::{PlaylistCursor, PlaylistResolver};
use crate::utils::error::{Result, TubequeueError};
use crate::utils::platform;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdout, Command as AsyncCommand};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

/// Playlist resolver backed by the yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    ytdlp_path: PathBuf,
    format: String,
    client: Client,
}

impl YtDlpResolver {
    /// Use `explicit` when given, otherwise search the usual locations
    pub fn new(explicit: Option<PathBuf>, format: &str) -> Result<Self> {
        let ytdlp_path = match explicit {
            Some(path) => path,
            None => platform::find_ytdlp().ok_or(TubequeueError::YtDlpNotFound)?,
        };
        info!("Using yt-dlp at: {}", ytdlp_path.display());

        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36")
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            ytdlp_path,
            format: format.to_string(),
            client,
        })
    }

    /// Get the path to yt-dlp being used
    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }
}

#[async_trait]
impl PlaylistResolver for YtDlpResolver {
    fn id(&self) -> &'static str {
        "ytdlp"
    }

    async fn resolve(&self, url: &str) -> Result<Box<dyn PlaylistCursor>> {
        debug!("Resolving playlist with yt-dlp: {}", url);

        let mut child = AsyncCommand::new(&self.ytdlp_path)
            .arg("--flat-playlist")
            .arg("--dump-json")
            .arg("--no-warnings")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TubequeueError::transport("Failed to start yt-dlp", e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TubequeueError::Transport("yt-dlp stdout unavailable".into()))?;
        let stderr = collect_stderr(child.stderr.take());

        let mut cursor = YtDlpCursor {
            child,
            lines: BufReader::new(stdout).lines(),
            stderr: Some(stderr),
            pending: None,
            finished: false,
            ytdlp_path: self.ytdlp_path.clone(),
            format: self.format.clone(),
            client: self.client.clone(),
        };
        cursor.prime().await?;
        Ok(Box::new(cursor))
    }
}

/// Position within a running `--flat-playlist` listing
pub struct YtDlpCursor {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
    /// First entry, read while resolving
    pending: Option<String>,
    finished: bool,
    ytdlp_path: PathBuf,
    format: String,
    client: Client,
}

impl YtDlpCursor {
    /// Wait for the first entry so a listing that fails outright (unknown or
    /// private playlist) is a resolution error rather than a bad entry.
    async fn prime(&mut self) -> Result<()> {
        match self.next_line().await? {
            Some(line) => self.pending = Some(line),
            None => {
                self.finished = true;
                self.finish().await?;
                debug!("Playlist listing is empty");
            }
        }
        Ok(())
    }

    /// Next non-blank line of the listing
    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(line) => return Ok(line),
                Err(e) => return Err(TubequeueError::transport("Failed to read yt-dlp output", e)),
            }
        }
    }

    /// Reap the listing process once stdout is exhausted
    async fn finish(&mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| TubequeueError::transport("Failed to wait for yt-dlp", e))?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            Ok(())
        } else {
            error!("yt-dlp playlist listing failed: {}", stderr.trim());
            Err(TubequeueError::Transport(format!(
                "yt-dlp exited with {}: {}",
                status,
                stderr.trim()
            )))
        }
    }

    /// Ask yt-dlp for the media URL(s) of the preferred format
    async fn direct_urls(&self, page_url: &str) -> Result<Vec<String>> {
        debug!("Getting direct URL for format {} from {}", self.format, page_url);

        let output = AsyncCommand::new(&self.ytdlp_path)
            .arg("-f")
            .arg(&self.format)
            .arg("-g")
            .arg("--no-warnings")
            .arg(page_url)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TubequeueError::transport("Failed to start yt-dlp", e))?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("Failed to get direct URL: {}", error_msg.trim());
            return Err(TubequeueError::Transport(error_msg.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn http_body(&self, media_url: &str) -> Result<VideoBody> {
        debug!("Streaming body over HTTP");
        let response = self.client.get(media_url).send().await?;

        if !response.status().is_success() {
            return Err(TubequeueError::Transport(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let content_length = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TubequeueError::from))
            .boxed();
        Ok(VideoBody::new(stream, content_length))
    }

    /// Let yt-dlp download and mux, reading the result from its stdout
    fn piped_body(&self, page_url: &str) -> Result<VideoBody> {
        debug!("Streaming body through yt-dlp stdout");
        let mut child = AsyncCommand::new(&self.ytdlp_path)
            .arg("-f")
            .arg(&self.format)
            .arg("-o")
            .arg("-")
            .arg("--no-warnings")
            .arg("--quiet")
            .arg(page_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TubequeueError::transport("Failed to start yt-dlp", e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TubequeueError::Transport("yt-dlp stdout unavailable".into()))?;
        let stderr = collect_stderr(child.stderr.take());

        let exit = stream::once(async move {
            let outcome: Option<Result<Bytes>> = match child.wait().await {
                Err(e) => Some(Err(TubequeueError::transport("Failed to wait for yt-dlp", e))),
                Ok(status) if status.success() => None,
                Ok(status) => {
                    let stderr = stderr.await.unwrap_or_default();
                    Some(Err(TubequeueError::Transport(format!(
                        "yt-dlp exited with {}: {}",
                        status,
                        stderr.trim()
                    ))))
                }
            };
            outcome
        })
        .filter_map(futures::future::ready);

        let body = ReaderStream::new(stdout)
            .map(|chunk| chunk.map_err(|e| TubequeueError::transport("Failed to read yt-dlp output", e)))
            .chain(exit)
            .boxed();

        Ok(VideoBody::new(body, None))
    }
}

#[async_trait]
impl PlaylistCursor for YtDlpCursor {
    async fn next_descriptor(&mut self) -> Option<Result<VideoDescriptor>> {
        if let Some(line) = self.pending.take() {
            return Some(parse_descriptor(&line));
        }
        if self.finished {
            return None;
        }

        match self.next_line().await {
            Ok(Some(line)) => Some(parse_descriptor(&line)),
            Ok(None) => {
                self.finished = true;
                self.finish().await.err().map(Err)
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    async fn open_body(&mut self, descriptor: &VideoDescriptor) -> Result<VideoBody> {
        let urls = self.direct_urls(&descriptor.url).await?;
        match urls.as_slice() {
            [single] => self.http_body(single).await,
            _ => {
                if urls.len() > 1 {
                    debug!("Format {} has {} streams, letting yt-dlp merge", self.format, urls.len());
                } else {
                    warn!("yt-dlp returned no direct URL for {}", descriptor.id);
                }
                self.piped_body(&descriptor.url)
            }
        }
    }
}

fn parse_descriptor(line: &str) -> Result<VideoDescriptor> {
    serde_json::from_str::<FlatPlaylistEntry>(line)
        .map(VideoDescriptor::from)
        .map_err(|e| {
            error!("Failed to parse playlist entry: {}", e);
            TubequeueError::transport("Failed to parse playlist entry", e)
        })
}

/// Drain a child's stderr in the background so it can never fill the pipe
fn collect_stderr(stderr: Option<ChildStderr>) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(mut stderr) = stderr {
            if let Err(e) = stderr.read_to_string(&mut buf).await {
                warn!("Failed to read yt-dlp stderr: {}", e);
            }
        }
        buf
    })
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor() {
        let d = parse_descriptor(r#"{"id":"a1","title":"First","url":"https://www.youtube.com/watch?v=a1"}"#)
            .unwrap();
        assert_eq!(d.id, "a1");
        assert_eq!(d.suggested_filename, "First-a1");
    }

    #[test]
    fn test_parse_descriptor_rejects_garbage() {
        let err = parse_descriptor("not json").unwrap_err();
        assert_eq!(err.kind(), crate::utils::error::ErrorKind::Transport);
    }

    #[test]
    fn test_missing_explicit_binary_is_accepted_until_used() {
        let resolver = YtDlpResolver::new(Some(PathBuf::from("/nonexistent/yt-dlp")), "mp4").unwrap();
        assert_eq!(resolver.ytdlp_path(), Path::new("/nonexistent/yt-dlp"));
        assert_eq!(resolver.id(), "ytdlp");
    }

    #[tokio::test]
    async fn test_resolve_with_missing_binary_is_transport_error() {
        let resolver = YtDlpResolver::new(Some(PathBuf::from("/nonexistent/yt-dlp")), "mp4").unwrap();
        let err = resolver.resolve("https://example.com/list").await.err().unwrap();
        assert_eq!(err.kind(), crate::utils::error::ErrorKind::Transport);
    }

    #[cfg(unix)]
    mod fake_binary {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn fake_ytdlp(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("yt-dlp");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        const PLAYLIST_SCRIPT: &str = r#"case "$*" in
  *--flat-playlist*)
    echo '{"id":"a","title":"Alpha","url":"https://www.youtube.com/watch?v=a"}'
    echo ''
    echo '{"id":"b","title":"Beta","url":"https://www.youtube.com/watch?v=b"}'
    ;;
  *" -g "*)
    echo 'https://cdn.example.com/video'
    echo 'https://cdn.example.com/audio'
    ;;
  *"-o -"*)
    printf 'muxed-bytes'
    ;;
esac"#;

        #[tokio::test]
        async fn test_cursor_yields_entries_in_order() {
            let dir = TempDir::new().unwrap();
            let resolver = YtDlpResolver::new(Some(fake_ytdlp(&dir, PLAYLIST_SCRIPT)), "mp4").unwrap();

            let mut cursor = resolver.resolve("https://example.com/list").await.unwrap();
            let first = cursor.next_descriptor().await.unwrap().unwrap();
            let second = cursor.next_descriptor().await.unwrap().unwrap();
            assert_eq!(first.id, "a");
            assert_eq!(second.id, "b");
            assert!(cursor.next_descriptor().await.is_none());
            assert!(cursor.next_descriptor().await.is_none());
        }

        #[tokio::test]
        async fn test_merged_format_streams_through_ytdlp() {
            let dir = TempDir::new().unwrap();
            let resolver = YtDlpResolver::new(Some(fake_ytdlp(&dir, PLAYLIST_SCRIPT)), "mp4").unwrap();

            let mut cursor = resolver.resolve("https://example.com/list").await.unwrap();
            let first = cursor.next_descriptor().await.unwrap().unwrap();
            let body = cursor.open_body(&first).await.unwrap();
            assert_eq!(body.content_length, None);

            let mut bytes = Vec::new();
            let mut stream = body.stream;
            while let Some(chunk) = stream.next().await {
                bytes.extend_from_slice(&chunk.unwrap());
            }
            assert_eq!(bytes, b"muxed-bytes");
        }

        #[tokio::test]
        async fn test_failed_listing_fails_resolution() {
            let dir = TempDir::new().unwrap();
            let script = "echo 'ERROR: playlist does not exist' >&2\nexit 1";
            let resolver = YtDlpResolver::new(Some(fake_ytdlp(&dir, script)), "mp4").unwrap();

            let err = resolver.resolve("https://example.com/list").await.err().unwrap();
            assert_eq!(err.kind(), crate::utils::error::ErrorKind::Transport);
            assert!(err.to_string().contains("playlist does not exist"));
        }

        #[tokio::test]
        async fn test_listing_failing_after_entries_is_reported_last() {
            let dir = TempDir::new().unwrap();
            let script = r#"echo '{"id":"a","title":"Alpha"}'
echo 'ERROR: rate limited' >&2
exit 1"#;
            let resolver = YtDlpResolver::new(Some(fake_ytdlp(&dir, script)), "mp4").unwrap();

            let mut cursor = resolver.resolve("https://example.com/list").await.unwrap();
            assert_eq!(cursor.next_descriptor().await.unwrap().unwrap().id, "a");
            let err = cursor.next_descriptor().await.unwrap().unwrap_err();
            assert!(err.to_string().contains("rate limited"));
            assert!(cursor.next_descriptor().await.is_none());
        }

        #[tokio::test]
        async fn test_empty_listing_resolves_to_empty_cursor() {
            let dir = TempDir::new().unwrap();
            let resolver = YtDlpResolver::new(Some(fake_ytdlp(&dir, "exit 0")), "mp4").unwrap();

            let mut cursor = resolver.resolve("https://example.com/list").await.unwrap();
            assert!(cursor.next_descriptor().await.is_none());
        }

        #[tokio::test]
        async fn test_failed_pipe_ends_stream_with_error() {
            let dir = TempDir::new().unwrap();
            let script = r#"case "$*" in
  *--flat-playlist*) echo '{"id":"a","title":"Alpha"}' ;;
  *" -g "*) exit 0 ;;
  *) printf 'part'; echo 'ERROR: connection reset' >&2; exit 1 ;;
esac"#;
            let resolver = YtDlpResolver::new(Some(fake_ytdlp(&dir, script)), "mp4").unwrap();

            let mut cursor = resolver.resolve("https://example.com/list").await.unwrap();
            let first = cursor.next_descriptor().await.unwrap().unwrap();
            let body = cursor.open_body(&first).await.unwrap();
            let chunks: Vec<_> = body.stream.collect().await;

            assert!(chunks.first().unwrap().is_ok());
            let last = chunks.last().unwrap().as_ref().unwrap_err();
            assert!(last.to_string().contains("connection reset"));
        }
    }
}
