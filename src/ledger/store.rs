//! Ledger persistence
//!
//! The file on disk is the single source of truth: every query and every
//! commit re-reads it in full, and every mutation rewrites it in full.
//! Concurrent commits from two processes can race (read-modify-write is not
//! locked); one traversal per output directory is assumed.

use crate::ledger::record::{PlaylistRecord, VideoEntry};
use crate::utils::error::{Result, TubequeueError};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Name of the ledger file inside the output directory
pub const LEDGER_FILE_NAME: &str = "playlist.json";

/// Location of the ledger for an output directory
pub fn ledger_path(output_dir: &Path) -> PathBuf {
    output_dir.join(LEDGER_FILE_NAME)
}

/// Reads and updates `<output>/playlist.json`
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Ledger for the given output directory
    pub fn new(output_dir: &Path) -> Self {
        Self {
            path: ledger_path(output_dir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger, creating an empty one if the file does not exist.
    ///
    /// A file that exists but does not parse is reported, never repaired.
    pub async fn load(&self) -> Result<PlaylistRecord> {
        match self.read_existing().await? {
            Some(record) => {
                debug!(
                    "Loaded ledger {:?} with {} entries",
                    self.path,
                    record.len()
                );
                Ok(record)
            }
            None => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)
                        .await
                        .map_err(|e| TubequeueError::storage("Failed to create output directory", e))?;
                }
                let record = PlaylistRecord::default();
                self.write(&record).await?;
                info!("Created empty ledger at {:?}", self.path);
                Ok(record)
            }
        }
    }

    /// Whether the on-disk ledger lists `id`
    pub async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.read().await?.contains(id))
    }

    /// Record `id` as processed.
    ///
    /// Committing an id that is already present leaves the file untouched.
    /// Returns `true` when a new entry was written.
    pub async fn commit(&self, id: &str, title: &str) -> Result<bool> {
        let mut record = self.read().await?;
        if !record.insert(id, title) {
            debug!("Ledger already contains {}, nothing to commit", id);
            return Ok(false);
        }
        self.write(&record).await?;
        debug!("Committed {} ({}) to ledger", id, title);
        Ok(true)
    }

    /// Current on-disk entries in insertion order
    pub async fn entries(&self) -> Result<Vec<VideoEntry>> {
        Ok(self.read().await?.videos)
    }

    /// Read the ledger; a file removed since `load` reads as empty.
    async fn read(&self) -> Result<PlaylistRecord> {
        Ok(self.read_existing().await?.unwrap_or_default())
    }

    async fn read_existing(&self) -> Result<Option<PlaylistRecord>> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TubequeueError::storage("Failed to read ledger", e)),
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| {
                TubequeueError::Storage(format!(
                    "Ledger {} is not a valid playlist record: {}",
                    self.path.display(),
                    e
                ))
            })
    }

    /// Serialize to a sibling temp file, then rename it over the ledger.
    async fn write(&self, record: &PlaylistRecord) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        record
            .serialize(&mut serializer)
            .map_err(|e| TubequeueError::storage("Failed to serialize ledger", e))?;
        buf.push(b'\n');

        let tmp_path = self.tmp_path();
        let result = self.replace_with(&tmp_path, &buf).await;
        if result.is_err() {
            if let Err(e) = fs::remove_file(&tmp_path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove ledger temp file {:?}: {}", tmp_path, e);
                }
            }
        }
        result
    }

    async fn replace_with(&self, tmp_path: &Path, contents: &[u8]) -> Result<()> {
        let mut file = fs::File::create(tmp_path)
            .await
            .map_err(|e| TubequeueError::storage("Failed to create ledger temp file", e))?;
        file.write_all(contents)
            .await
            .map_err(|e| TubequeueError::storage("Failed to write ledger", e))?;
        file.flush()
            .await
            .map_err(|e| TubequeueError::storage("Failed to flush ledger", e))?;
        drop(file);

        fs::rename(tmp_path, &self.path)
            .await
            .map_err(|e| TubequeueError::storage("Failed to replace ledger", e))
    }

    fn tmp_path(&self) -> PathBuf {
        let name = format!(".{}.{}.tmp", LEDGER_FILE_NAME, std::process::id());
        match self.path.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }
}
