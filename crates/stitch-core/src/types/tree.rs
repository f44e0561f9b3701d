//! Folder tree model returned by folder uploads.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A node of a reconstructed folder tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FolderNode {
    /// A directory with insertion-ordered children.
    Directory {
        /// Directory name (one path segment).
        name: String,
        /// Child nodes keyed by their (possibly disambiguated) name.
        children: Children,
    },
    /// A persisted file.
    File {
        /// File name.
        name: String,
        /// Relative path under the upload root.
        path: String,
        /// Size in bytes.
        size: u64,
        /// MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl FolderNode {
    /// Create an empty directory node.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::Directory {
            name: name.into(),
            children: Children::default(),
        }
    }

    /// Node name.
    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name, .. } | Self::File { name, .. } => name,
        }
    }

    /// Whether the node is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    /// Children of a directory node; `None` for files.
    pub fn children(&self) -> Option<&Children> {
        match self {
            Self::Directory { children, .. } => Some(children),
            Self::File { .. } => None,
        }
    }

    /// Consume a directory node into its children; `None` for files.
    pub fn into_children(self) -> Option<Children> {
        match self {
            Self::Directory { children, .. } => Some(children),
            Self::File { .. } => None,
        }
    }

    /// Mutable children of a directory node; `None` for files.
    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            Self::Directory { children, .. } => Some(children),
            Self::File { .. } => None,
        }
    }
}

/// Children of a directory, kept in insertion order and serialized as a
/// JSON object with that key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Children {
    entries: Vec<(String, FolderNode)>,
}

impl Children {
    /// Look up a child by key.
    pub fn get(&self, key: &str) -> Option<&FolderNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, n)| n)
    }

    /// Mutable lookup by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut FolderNode> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, n)| n)
    }

    /// Whether a key is taken.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert a new child. Returns false (and leaves the existing child in
    /// place) when the key is already taken.
    pub fn insert(&mut self, key: impl Into<String>, node: FolderNode) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            return false;
        }
        self.entries.push((key, node));
        true
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FolderNode)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Children {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, node) in &self.entries {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}
