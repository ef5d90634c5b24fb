//! tubequeue - playlist downloader feeding a media player queue
//!
//! Downloads every entry of a playlist into an output directory, one at a
//! time, and adds each finished file to the player's queue. Entries already
//! recorded in `<output>/playlist.json` are skipped on later runs.

use anyhow::Result;
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tubequeue::downloader::{FetchProgress, FetchStatus};
use tubequeue::utils::{ConfigInput, Configuration};
use tubequeue::{ExternalPlayer, HandoffPolicy, PlaylistTraversal, YtDlpResolver};

const AFTER_HELP: &str = "Examples:

    $ tubequeue --playlist \"PLSgyieXjxY_edCma2rZlwugFgvhldDU8-\" --output ~/Music/Playlist
    $ tubequeue --url \"https://www.youtube.com/playlist?list=PL123\" -o ./videos -w /usr/bin/vlc";

#[derive(Parser, Debug)]
#[command(name = "tubequeue", version, about, after_help = AFTER_HELP)]
struct Cli {
    /// Playlist id to download
    #[arg(short, long, env = "TUBEQUEUE_PLAYLIST")]
    playlist: Option<String>,

    /// Playlist URL (has priority over --playlist)
    #[arg(short, long, env = "TUBEQUEUE_URL")]
    url: Option<String>,

    /// Directory to download the playlist into
    #[arg(short, long, env = "TUBEQUEUE_OUTPUT")]
    output: Option<PathBuf>,

    /// Media player executable (defaults to the platform's usual install location)
    #[arg(short = 'w', long, env = "TUBEQUEUE_PLAYER")]
    player: Option<PathBuf>,

    /// Argument that makes the player queue a file
    #[arg(long, env = "TUBEQUEUE_ENQUEUE_FLAG", allow_hyphen_values = true)]
    enqueue_flag: Option<String>,

    /// Format preference passed to yt-dlp, also used as the file extension
    #[arg(short, long, env = "TUBEQUEUE_FORMAT")]
    format: Option<String>,

    /// yt-dlp executable (searched for when omitted)
    #[arg(long, env = "TUBEQUEUE_YTDLP")]
    ytdlp: Option<PathBuf>,

    /// How a player invocation is judged successful
    #[arg(long, value_enum, default_value_t = HandoffPolicy::Strict, env = "TUBEQUEUE_HANDOFF_POLICY")]
    handoff_policy: HandoffPolicy,

    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl From<&Cli> for ConfigInput {
    fn from(cli: &Cli) -> Self {
        ConfigInput {
            playlist: cli.playlist.clone(),
            url: cli.url.clone(),
            output: cli.output.clone(),
            player: cli.player.clone(),
            enqueue_flag: cli.enqueue_flag.clone(),
            format: cli.format.clone(),
            ytdlp: cli.ytdlp.clone(),
            handoff_policy: cli.handoff_policy,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match Configuration::from_input(ConfigInput::from(&cli)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::from(1);
        }
    };

    match rt.block_on(run(config, !cli.quiet)) {
        Ok(true) => ExitCode::SUCCESS,
        // Some entries failed but the traversal completed
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "tubequeue=debug,info"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether every entry was either queued or skipped
async fn run(config: Configuration, show_progress: bool) -> Result<bool> {
    let resolver = YtDlpResolver::new(config.ytdlp_path.clone(), &config.format)?;
    let player = ExternalPlayer::new(
        config.player_path.clone(),
        config.enqueue_flag.clone(),
        config.handoff_policy,
    );

    let mut traversal = PlaylistTraversal::new((&config).into(), Arc::new(resolver), Arc::new(player));

    let reporter = if show_progress && std::io::stderr().is_terminal() {
        let (progress_tx, progress_rx) = mpsc::channel::<FetchProgress>(64);
        traversal = traversal.with_progress(progress_tx);
        Some(tokio::spawn(report_progress(progress_rx)))
    } else {
        None
    };

    let report = traversal.run().await;

    // Closing the channel ends the reporter
    drop(traversal);
    if let Some(handle) = reporter {
        let _ = handle.await;
    }

    let report = report?;
    if let Some(elapsed) = report.elapsed() {
        tracing::info!("Traversal took {}s", elapsed.num_seconds());
    }
    Ok(!report.has_failures())
}

/// Redraw a single percentage line per fetch on stderr
async fn report_progress(mut progress_rx: mpsc::Receiver<FetchProgress>) {
    let mut stderr = std::io::stderr();
    while let Some(progress) = progress_rx.recv().await {
        let line = match progress.percentage() {
            Some(pct) => format!("{:.2}%", pct * 100.0),
            None => format!("{:.1} MiB", progress.downloaded_bytes as f64 / 1024.0 / 1024.0),
        };
        let _ = write!(stderr, "\r\x1b[2K{}", line);
        if matches!(progress.status, FetchStatus::Completed | FetchStatus::Failed(_)) {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}
