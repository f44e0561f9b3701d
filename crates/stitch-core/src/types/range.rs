//! HTTP byte range handling.

use serde::{Deserialize, Serialize};

/// A single satisfiable byte range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
    /// Total size of the underlying file.
    pub total: u64,
}

impl ByteRange {
    /// Parse a `Range` header value against a file of `size` bytes.
    ///
    /// Only the single-range form `bytes=<start>-[<end>]` is honored. An
    /// open or oversized end is clamped to the last byte. Anything else
    /// (malformed syntax, multiple ranges, suffix ranges, `start > end`,
    /// `start >= size`) yields `None` and the caller serves the whole file.
    pub fn parse(header: &str, size: u64) -> Option<Self> {
        let spec = header.trim().strip_prefix("bytes=")?.trim();
        if spec.contains(',') {
            return None;
        }
        let (start, end) = spec.split_once('-')?;
        let start = start.trim();
        let end = end.trim();
        if start.is_empty() {
            return None;
        }
        let start: u64 = start.parse().ok()?;
        if size == 0 || start >= size {
            return None;
        }
        let end = if end.is_empty() {
            size - 1
        } else {
            end.parse::<u64>().ok()?.min(size - 1)
        };
        if start > end {
            return None;
        }
        Some(Self {
            start,
            end,
            total: size,
        })
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a parsed range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}
