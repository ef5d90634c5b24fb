//! Platform-specific defaults for tubequeue
//!
//! This module provides:
//! - The default media player install location and its "add to queue" flag
//! - yt-dlp discovery next to the executable, on PATH and in common locations

use std::path::PathBuf;
use tracing::{debug, warn};

/// Returns the default media player executable
/// - Windows: Winamp under Program Files (x86)
/// - macOS: VLC application bundle
/// - Linux and others: `vlc` resolved through PATH, else /usr/bin/vlc
pub fn default_player_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        PathBuf::from(r"C:\Program Files (x86)\Winamp\winamp.exe")
    }

    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Applications/VLC.app/Contents/MacOS/VLC")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        which::which("vlc").unwrap_or_else(|_| PathBuf::from("/usr/bin/vlc"))
    }
}

/// Returns the argument that makes the default player append a file to its
/// queue instead of playing it immediately
pub fn default_enqueue_flag() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "/ADD"
    }

    #[cfg(not(target_os = "windows"))]
    {
        "--playlist-enqueue"
    }
}

/// Platform-specific yt-dlp binary name
pub fn ytdlp_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}

/// Find yt-dlp with priority:
/// 1. Next to the current executable
/// 2. System PATH
/// 3. Common installation paths
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Some(adjacent) = find_adjacent_ytdlp() {
        debug!("Using yt-dlp next to executable: {:?}", adjacent);
        return Some(adjacent);
    }

    if let Ok(system) = which::which(ytdlp_binary_name()) {
        debug!("Using system yt-dlp: {:?}", system);
        return Some(system);
    }

    if let Some(common) = find_in_common_paths() {
        debug!("Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }

    warn!("yt-dlp not found anywhere");
    None
}

fn find_adjacent_ytdlp() -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let adjacent = exe_path.parent()?.join(ytdlp_binary_name());
    if adjacent.is_file() && is_executable(&adjacent) {
        Some(adjacent)
    } else {
        None
    }
}

fn find_in_common_paths() -> Option<PathBuf> {
    let common_paths = [
        // macOS Homebrew (Apple Silicon)
        "/opt/homebrew/bin/yt-dlp",
        // macOS Homebrew (Intel) and manual installs
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
        // pip --user
        "~/.local/bin/yt-dlp",
    ];

    common_paths
        .iter()
        .map(|path_str| expand_home(path_str))
        .find(|path| path.is_file() && is_executable(path))
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_home(path_str: &str) -> PathBuf {
    match path_str.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path_str),
        },
        None => PathBuf::from(path_str),
    }
}

/// Check if a file is executable
pub fn is_executable(path: &std::path::Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.exists()
    }
}
