use crate::checksum::checksum;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

struct Memo<T> {
    stamps: Vec<(PathBuf, String)>,
    value: Arc<T>,
}

/// A value memoized against the content hashes of a set of paths.
///
/// The value is recomputed on the next access after any of the paths changes
/// content (or appears/disappears). The dependency set may be discovered by
/// the computation itself, see [`PathCached::get_tracked`].
pub struct PathCached<T> {
    memo: Mutex<Option<Memo<T>>>,
}

impl<T> Default for PathCached<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathCached<T> {
    pub fn new() -> Self {
        Self {
            memo: Mutex::new(None),
        }
    }

    /// Return the memoized value for a fixed set of paths, recomputing if stale.
    pub fn get<F>(&self, paths: &[PathBuf], compute: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut memo = self.lock();
        if let Some(current) = memo.as_ref() {
            let same_paths = current.stamps.len() == paths.len()
                && current
                    .stamps
                    .iter()
                    .zip(paths)
                    .all(|((stamped, _), path)| stamped == path);
            if same_paths && stamps_fresh(&current.stamps)? {
                return Ok(Arc::clone(&current.value));
            }
        }
        let value = Arc::new(compute()?);
        *memo = Some(Memo {
            stamps: stamp(paths)?,
            value: Arc::clone(&value),
        });
        Ok(value)
    }

    /// Return the memoized value, recomputing when any previously reported
    /// dependency changed. The computation reports its own dependency paths.
    pub fn get_tracked<F>(&self, compute: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<(T, Vec<PathBuf>)>,
    {
        let mut memo = self.lock();
        if let Some(current) = memo.as_ref() {
            if stamps_fresh(&current.stamps)? {
                return Ok(Arc::clone(&current.value));
            }
            tracing::debug!("path cache stale");
        }
        let (value, paths) = compute()?;
        let value = Arc::new(value);
        *memo = Some(Memo {
            stamps: stamp(&paths)?,
            value: Arc::clone(&value),
        });
        Ok(value)
    }

    /// Whether a value is memoized and all of its dependencies are unchanged.
    pub fn is_fresh(&self) -> Result<bool> {
        match self.lock().as_ref() {
            Some(current) => stamps_fresh(&current.stamps),
            None => Ok(false),
        }
    }

    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<Memo<T>>> {
        self.memo
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn stamp(paths: &[PathBuf]) -> Result<Vec<(PathBuf, String)>> {
    paths
        .iter()
        .map(|path| Ok((path.clone(), checksum(path)?)))
        .collect()
}

fn stamps_fresh(stamps: &[(PathBuf, String)]) -> Result<bool> {
    for (path, hash) in stamps {
        if checksum(Path::new(path))? != *hash {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;

    #[test]
    fn recomputes_only_after_content_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("lexicon.pycl");
        fs::write(&source, "entry <a> *a (n.) a\n").expect("write");
        let paths = vec![source.clone()];
        let cached = PathCached::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            fs::read_to_string(&source).map_err(|err| crate::error::Error::io(&source, err))
        };

        let first = cached.get(&paths, compute).expect("first");
        let second = cached.get(&paths, compute).expect("second");
        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        fs::write(&source, "entry <b> *b (n.) b\n").expect("rewrite");
        let third = cached.get(&paths, compute).expect("third");
        assert_eq!(calls.get(), 2);
        assert!(third.contains("<b>"));
    }

    #[test]
    fn tracked_dependencies_include_discovered_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("root.pycl");
        let included = dir.path().join("included.pycl");
        fs::write(&root, "include \"included.pycl\"\n").expect("write root");
        fs::write(&included, "one").expect("write included");
        let cached: PathCached<usize> = PathCached::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok((calls.get(), vec![root.clone(), included.clone()]))
        };

        assert_eq!(*cached.get_tracked(compute).expect("first"), 1);
        assert!(cached.is_fresh().expect("fresh"));
        assert_eq!(*cached.get_tracked(compute).expect("memoized"), 1);

        fs::write(&included, "two").expect("rewrite included");
        assert!(!cached.is_fresh().expect("stale"));
        assert_eq!(*cached.get_tracked(compute).expect("recomputed"), 2);
    }
}
