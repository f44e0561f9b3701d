//! Chunk naming.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::identity::validate_segment;

/// A validated chunk identifier of the form `<hash>-<index>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkName {
    name: String,
    index: u64,
}

impl ChunkName {
    /// Parse a client-supplied chunk name.
    pub fn parse(name: impl Into<String>) -> AppResult<Self> {
        let name = name.into();
        validate_segment("chunkHash", &name)?;
        let index = parse_chunk_index(&name)?;
        Ok(Self { name, index })
    }

    /// The chunk name as stored on disk.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Sequence index of the chunk.
    pub fn index(&self) -> u64 {
        self.index
    }
}

impl std::fmt::Display for ChunkName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Extract the integer after the last `-` of a chunk name.
pub fn parse_chunk_index(name: &str) -> AppResult<u64> {
    let (_, suffix) = name
        .rsplit_once('-')
        .ok_or_else(|| AppError::validation(format!("Chunk name '{name}' has no index")))?;
    suffix
        .parse::<u64>()
        .map_err(|_| AppError::validation(format!("Chunk name '{name}' has an invalid index")))
}

/// A chunk present in a staging area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedChunk {
    /// File name inside the staging directory.
    pub name: String,
    /// Parsed sequence index.
    pub index: u64,
    /// Size on disk in bytes.
    pub size: u64,
}
