//! Caches that invalidate on source content changes.
//!
//! [`PathCached`] memoizes an in-memory value for as long as the files it was
//! computed from keep the same content hash. [`PersistentCache`] is a typed
//! key-value store saved under the project's hidden cache directory and
//! cleared when any file it depends on changes content.
mod path;
mod persistent;

pub use path::PathCached;
pub use persistent::PersistentCache;
