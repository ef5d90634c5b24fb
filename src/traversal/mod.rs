//! Sequential playlist traversal

pub mod driver;
pub mod state;

pub use driver::{PlaylistTraversal, TraversalSettings};
pub use state::{TraversalReport, TraversalState, TraversalSummary, VideoOutcome};
