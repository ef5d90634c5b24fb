pub mod models;
pub mod traits;
pub mod ytdlp;

pub use models::{BodyStream, FlatPlaylistEntry, VideoBody, VideoDescriptor};
pub use traits::{PlaylistCursor, PlaylistResolver};
pub use ytdlp::YtDlpResolver;
