//! Core type definitions used across the Stitch workspace.

pub mod chunk;
pub mod identity;
pub mod range;
pub mod size;
pub mod tree;

pub use chunk::{ChunkName, StagedChunk, parse_chunk_index};
pub use identity::{FileIdentity, STAGING_DIR_PREFIX, staging_dir_name, validate_segment};
pub use range::ByteRange;
pub use size::format_file_size;
pub use tree::{Children, FolderNode};
