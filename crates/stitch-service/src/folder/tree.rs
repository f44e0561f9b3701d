//! Relative path normalization, on-disk layout planning and folder tree
//! reconstruction.

use std::collections::HashMap;

use tracing::{debug, warn};

use stitch_core::error::{AppError, ErrorKind};
use stitch_core::result::AppResult;
use stitch_core::traits::storage::StorageProvider;
use stitch_core::types::{Children, FolderNode, validate_segment};

/// A persisted file to place in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Relative path, `/`-separated.
    pub relative_path: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
}

/// Normalize a client-supplied relative path.
///
/// Backslashes become `/`, leading slashes and empty or `.` segments are
/// dropped. `..` segments, NUL bytes and drive prefixes are rejected, as
/// is a path that normalizes to nothing.
pub fn normalize_relative_path(raw: &str) -> AppResult<String> {
    if raw.contains('\0') {
        return Err(AppError::validation("Path contains a NUL byte"));
    }

    let unified = raw.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(AppError::validation(format!(
                    "Path '{raw}' escapes the upload root"
                )));
            }
            s if segments.is_empty() && is_drive_prefix(s) => {
                return Err(AppError::validation(format!(
                    "Path '{raw}' must be relative"
                )));
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(AppError::validation("Path is empty"));
    }
    Ok(segments.join("/"))
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Compute where an uploaded file will live, relative to the upload root.
///
/// With a relative path the file mirrors it; without one it lands directly
/// in `<folder_name>/<original_name>`.
pub fn resolve_destination(
    folder_name: &str,
    original_name: &str,
    relative_path: Option<&str>,
) -> AppResult<String> {
    if let Some(path) = relative_path.map(str::trim).filter(|p| !p.is_empty()) {
        return normalize_relative_path(path);
    }

    validate_segment("folderName", folder_name)?;
    let name = normalize_relative_path(original_name)?;
    let base = name.rsplit('/').next().unwrap_or(name.as_str());
    Ok(format!("{folder_name}/{base}"))
}

/// What already occupies a planned path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Directory,
    /// A file; `from` is the requested destination that claimed it, or
    /// `None` for a file that was already on disk.
    File { from: Option<String> },
}

/// Assigns every destination of a batch a path that can exist on disk.
///
/// A path cannot be a file and a directory at once, whether the clash is
/// within the batch or with what is already stored. Destinations are
/// claimed shallowest first; a directory segment that meets a file becomes
/// `<name>_dir` and a file that meets a directory becomes `<name>_file`,
/// with a number appended when that is taken too. A file replaces an
/// existing file at its exact requested path.
///
/// Returns the planned paths in input order.
pub async fn plan_layout(
    provider: &dyn StorageProvider,
    destinations: &[String],
) -> AppResult<Vec<String>> {
    let mut order: Vec<usize> = (0..destinations.len()).collect();
    order.sort_by_key(|&i| segments(&destinations[i]).len());

    let mut planner = LayoutPlanner {
        provider,
        slots: HashMap::new(),
    };
    let mut planned = vec![String::new(); destinations.len()];
    for i in order {
        let dest = &destinations[i];
        let parts = segments(dest);
        let Some((leaf, dirs)) = parts.split_last() else {
            return Err(AppError::validation("Path is empty"));
        };

        let mut prefix = String::new();
        for dir in dirs {
            prefix = planner.claim_directory(&prefix, dir).await?;
        }
        let path = planner.claim_file(&prefix, leaf, dest).await?;
        if &path != dest {
            debug!(requested = %dest, planned = %path, "Renamed clashing folder entry");
        }
        planned[i] = path;
    }
    Ok(planned)
}

struct LayoutPlanner<'a> {
    provider: &'a dyn StorageProvider,
    slots: HashMap<String, Slot>,
}

impl LayoutPlanner<'_> {
    async fn slot(&mut self, path: &str) -> AppResult<Option<Slot>> {
        if let Some(slot) = self.slots.get(path) {
            return Ok(Some(slot.clone()));
        }
        let found = match self.provider.metadata(path).await {
            Ok(meta) if meta.is_directory => Some(Slot::Directory),
            Ok(_) => Some(Slot::File { from: None }),
            Err(e) if e.kind == ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        if let Some(slot) = &found {
            self.slots.insert(path.to_string(), slot.clone());
        }
        Ok(found)
    }

    async fn claim_directory(&mut self, prefix: &str, name: &str) -> AppResult<String> {
        let mut attempt = 0;
        loop {
            let path = join(prefix, &suffixed(name, "_dir", attempt));
            match self.slot(&path).await? {
                Some(Slot::Directory) => return Ok(path),
                Some(Slot::File { .. }) => attempt += 1,
                None => {
                    self.slots.insert(path.clone(), Slot::Directory);
                    return Ok(path);
                }
            }
        }
    }

    async fn claim_file(&mut self, prefix: &str, name: &str, dest: &str) -> AppResult<String> {
        let mut attempt = 0;
        loop {
            let path = join(prefix, &suffixed(name, "_file", attempt));
            let reusable = match self.slot(&path).await? {
                None => true,
                Some(Slot::File { from: Some(from) }) => from == dest,
                Some(Slot::File { from: None }) => path == dest,
                Some(Slot::Directory) => false,
            };
            if reusable {
                self.slots.insert(
                    path.clone(),
                    Slot::File {
                        from: Some(dest.to_string()),
                    },
                );
                return Ok(path);
            }
            attempt += 1;
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Builds the directory tree of a folder upload.
///
/// Entries are placed shallowest first. Name clashes between a file and a
/// directory never overwrite: the later node gets a `_dir` or `_file`
/// suffixed key, with a number appended if that key is taken too.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    root_name: String,
}

impl TreeBuilder {
    /// Create a builder whose root directory is called `root_name`.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
        }
    }

    /// Build the tree for `entries`.
    pub fn build(&self, entries: &[TreeEntry]) -> FolderNode {
        let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
        sorted.sort_by_key(|e| segments(&e.relative_path).len());

        let mut root = FolderNode::directory(&self.root_name);
        if let Some(children) = root.children_mut() {
            for entry in sorted {
                let parts = segments(&entry.relative_path);
                if parts.is_empty() {
                    warn!(size = entry.size, "Skipping folder entry without a relative path");
                    continue;
                }
                place(children, &parts, entry);
            }
        }
        root
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn place(children: &mut Children, parts: &[&str], entry: &TreeEntry) {
    match parts {
        [] => {}
        [leaf] => place_file(children, leaf, entry),
        [head, rest @ ..] => {
            let key = directory_key(children, head);
            if let Some(sub) = children.get_mut(&key).and_then(FolderNode::children_mut) {
                place(sub, rest, entry);
            }
        }
    }
}

/// Key for the directory `name`, reusing an existing directory or creating
/// one under the first key not held by a file.
fn directory_key(children: &mut Children, name: &str) -> String {
    let mut attempt = 0;
    loop {
        let key = suffixed(name, "_dir", attempt);
        match children.get(&key) {
            Some(node) if node.is_directory() => return key,
            Some(_) => attempt += 1,
            None => {
                children.insert(key.clone(), FolderNode::directory(name));
                return key;
            }
        }
    }
}

fn place_file(children: &mut Children, name: &str, entry: &TreeEntry) {
    let node = FolderNode::File {
        name: name.to_string(),
        path: entry.relative_path.clone(),
        size: entry.size,
        mime_type: entry.mime_type.clone(),
    };

    let mut attempt = 0;
    loop {
        let key = suffixed(name, "_file", attempt);
        match children.get_mut(&key) {
            // Same path uploaded twice: the disk holds the later copy.
            Some(existing) if file_path(existing) == Some(&entry.relative_path) => {
                *existing = node;
                return;
            }
            Some(_) => attempt += 1,
            None => {
                children.insert(key, node);
                return;
            }
        }
    }
}

fn file_path(node: &FolderNode) -> Option<&String> {
    match node {
        FolderNode::File { path, .. } => Some(path),
        FolderNode::Directory { .. } => None,
    }
}

fn suffixed(name: &str, suffix: &str, attempt: usize) -> String {
    match attempt {
        0 => name.to_string(),
        1 => format!("{name}{suffix}"),
        n => format!("{name}{suffix}{n}"),
    }
}
