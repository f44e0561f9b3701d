//! Folder upload: path normalization, tree building and persistence.

pub mod tree;
pub mod upload;

pub use tree::{TreeBuilder, TreeEntry, normalize_relative_path, resolve_destination};
