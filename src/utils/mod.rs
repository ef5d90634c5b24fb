//! Utility modules for error handling, configuration and platform defaults

pub mod config;
pub mod error;
pub mod platform;

// Re-export for convenience
pub use config::{ConfigInput, Configuration};
pub use error::{ErrorKind, Result, TubequeueError};
