//! Text handling between the model stream and the speech engine.

pub mod boundary;
pub mod segmenter;

pub use boundary::{ChunkAccumulator, ChunkPolicy};
pub use segmenter::split_sentences;
