//! Fetch stage: streams one video into the output directory

pub mod fetch;
pub mod progress;

// Re-export for convenience
pub use fetch::fetch_to_file;
pub use progress::{FetchProgress, FetchStatus};
