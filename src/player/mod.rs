//! Handoff stage: register a downloaded file with the media player's queue

use crate::utils::error::{Result, TubequeueError};
use async_trait::async_trait;
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info};

/// How a player invocation is judged successful
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HandoffPolicy {
    /// Clean exit status and nothing on stderr
    #[default]
    Strict,
    /// Clean exit status only
    ExitCode,
    /// Nothing on stderr, whatever the exit status
    Stderr,
}

impl HandoffPolicy {
    /// Decide on the outcome of a finished player process
    pub fn accepts(&self, exit_success: bool, stderr: &str) -> bool {
        let quiet = stderr.trim().is_empty();
        match self {
            HandoffPolicy::Strict => exit_success && quiet,
            HandoffPolicy::ExitCode => exit_success,
            HandoffPolicy::Stderr => quiet,
        }
    }
}

/// Something that can queue a finished file for playback
#[async_trait]
pub trait Player: Send + Sync {
    /// Queue `file`. An error leaves the video uncommitted.
    async fn enqueue(&self, file: &Path) -> Result<()>;
}

/// Media player reached by running its executable
#[derive(Debug, Clone)]
pub struct ExternalPlayer {
    executable: PathBuf,
    enqueue_flag: String,
    policy: HandoffPolicy,
}

impl ExternalPlayer {
    pub fn new(executable: impl Into<PathBuf>, enqueue_flag: impl Into<String>, policy: HandoffPolicy) -> Self {
        Self {
            executable: executable.into(),
            enqueue_flag: enqueue_flag.into(),
            policy,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl Player for ExternalPlayer {
    async fn enqueue(&self, file: &Path) -> Result<()> {
        let absolute = file
            .absolutize()
            .map_err(|e| TubequeueError::Handoff(format!("Invalid path {}: {}", file.display(), e)))?
            .into_owned();

        debug!(
            "Running {:?} {} {:?}",
            self.executable, self.enqueue_flag, absolute
        );

        // Arguments go straight to the process, no shell quoting involved.
        let output = AsyncCommand::new(&self.executable)
            .arg(&self.enqueue_flag)
            .arg(&absolute)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                TubequeueError::Handoff(format!(
                    "Failed to start {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stdout.trim().is_empty() {
            info!("Player stdout: {}", stdout.trim());
        }

        if self.policy.accepts(output.status.success(), &stderr) {
            Ok(())
        } else {
            let detail = if stderr.trim().is_empty() {
                format!("player exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            Err(TubequeueError::Handoff(detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_matrix() {
        assert!(HandoffPolicy::Strict.accepts(true, ""));
        assert!(HandoffPolicy::Strict.accepts(true, "  \n"));
        assert!(!HandoffPolicy::Strict.accepts(true, "warning"));
        assert!(!HandoffPolicy::Strict.accepts(false, ""));

        assert!(HandoffPolicy::ExitCode.accepts(true, "warning"));
        assert!(!HandoffPolicy::ExitCode.accepts(false, ""));

        assert!(HandoffPolicy::Stderr.accepts(false, ""));
        assert!(!HandoffPolicy::Stderr.accepts(true, "boom"));
    }

    #[test]
    fn test_default_policy_is_strict() {
        assert_eq!(HandoffPolicy::default(), HandoffPolicy::Strict);
    }

    #[tokio::test]
    async fn test_missing_executable_is_handoff_error() {
        let player = ExternalPlayer::new("/nonexistent/player", "--enqueue", HandoffPolicy::Strict);
        let err = player.enqueue(Path::new("song.mp4")).await.unwrap_err();
        assert_eq!(err.kind(), crate::utils::error::ErrorKind::Handoff);
    }

    #[cfg(unix)]
    mod fake_binary {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn fake_player(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("player");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_player_receives_flag_and_absolute_path() {
            let dir = TempDir::new().unwrap();
            let record = dir.path().join("args.txt");
            let script = format!("printf '%s\\n' \"$@\" > '{}'", record.display());
            let player = ExternalPlayer::new(fake_player(&dir, &script), "/ADD", HandoffPolicy::Strict);

            player.enqueue(Path::new("some dir/song.mp4")).await.unwrap();

            let args = std::fs::read_to_string(&record).unwrap();
            let lines: Vec<_> = args.lines().collect();
            assert_eq!(lines.len(), 2);
            assert_eq!(lines[0], "/ADD");
            assert!(Path::new(lines[1]).is_absolute());
            assert!(lines[1].ends_with("some dir/song.mp4"));
        }

        #[tokio::test]
        async fn test_stderr_output_fails_strict_policy() {
            let dir = TempDir::new().unwrap();
            let player = ExternalPlayer::new(
                fake_player(&dir, "echo 'cannot open queue' >&2"),
                "--enqueue",
                HandoffPolicy::Strict,
            );

            let err = player.enqueue(Path::new("/tmp/song.mp4")).await.unwrap_err();
            assert!(err.to_string().contains("cannot open queue"));
        }

        #[tokio::test]
        async fn test_exit_code_policy_tolerates_stderr() {
            let dir = TempDir::new().unwrap();
            let player = ExternalPlayer::new(
                fake_player(&dir, "echo 'harmless warning' >&2"),
                "--enqueue",
                HandoffPolicy::ExitCode,
            );

            player.enqueue(Path::new("/tmp/song.mp4")).await.unwrap();
        }

        #[tokio::test]
        async fn test_non_zero_exit_fails_strict_policy() {
            let dir = TempDir::new().unwrap();
            let player = ExternalPlayer::new(fake_player(&dir, "exit 3"), "--enqueue", HandoffPolicy::Strict);

            let err = player.enqueue(Path::new("/tmp/song.mp4")).await.unwrap_err();
            assert!(err.to_string().contains("exited with"));
        }
    }
}
