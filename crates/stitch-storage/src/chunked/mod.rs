//! Chunked upload handling.

pub mod assembler;
pub mod cleanup;
pub mod upload;

pub use assembler::{ChunkAssembler, MergeOutcome, artifact_present};
pub use cleanup::{StagingSweeper, SweepReport};
pub use upload::ChunkStore;
