//! # stitch-storage
//!
//! Filesystem storage for Stitch: the local provider, the chunk store that
//! stages uploaded pieces, the merge engine that assembles them, the
//! per-file lock registry and the staging sweeper.

pub mod chunked;
pub mod lock;
pub mod manager;
pub mod providers;

pub use lock::IdentityLocks;
pub use manager::{StorageArea, StorageManager};
