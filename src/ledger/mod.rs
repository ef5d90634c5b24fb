//! Persisted record of videos already downloaded and queued

pub mod record;
pub mod store;

pub use record::{PlaylistRecord, VideoEntry};
pub use store::{ledger_path, LedgerStore, LEDGER_FILE_NAME};
