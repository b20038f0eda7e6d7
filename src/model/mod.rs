pub mod types;
pub mod exon;
pub mod transcript;

pub use types::{ExonId, TranscriptId};
