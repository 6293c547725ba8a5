use crate::checksum::{checksum, mtime_ns};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::hash::Hash;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Envelope version; files written with another version are discarded.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
struct Envelope<K, V> {
    version: u32,
    #[serde(default)]
    settings: String,
    entries: Vec<(K, V)>,
    mtimes: BTreeMap<String, u64>,
    hashes: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, K, V> {
    version: u32,
    settings: &'a str,
    entries: Vec<(&'a K, &'a V)>,
    mtimes: &'a BTreeMap<String, u64>,
    hashes: &'a BTreeMap<String, String>,
}

/// Typed key-value store persisted to a single JSON file.
///
/// The store remembers the mtime and content hash of every source path it
/// depends on. When a source changes mtime but keeps its hash the stamp is
/// refreshed; when a hash changes every entry is evicted. Entries are also
/// bound to a settings string recorded next to them, and a file written
/// under different settings loads empty. Unsaved changes are flushed on drop.
pub struct PersistentCache<K, V>
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: Serialize + DeserializeOwned,
{
    path: PathBuf,
    sources: Vec<PathBuf>,
    settings: String,
    entries: HashMap<K, V>,
    mtimes: BTreeMap<String, u64>,
    hashes: BTreeMap<String, String>,
    dirty: bool,
}

impl<K, V> PersistentCache<K, V>
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: Serialize + DeserializeOwned,
{
    /// Load the cache at `path`, validating it against `sources` and
    /// `settings`.
    ///
    /// Unreadable or incompatible files are logged and treated as empty.
    pub fn load(
        path: impl Into<PathBuf>,
        sources: Vec<PathBuf>,
        settings: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let mut cache = Self {
            path,
            sources,
            settings: settings.into(),
            entries: HashMap::new(),
            mtimes: BTreeMap::new(),
            hashes: BTreeMap::new(),
            dirty: false,
        };
        match read_envelope::<K, V>(&cache.path) {
            Ok(Some(envelope)) if envelope.settings != cache.settings => {
                tracing::info!(
                    path = %cache.path.display(),
                    saved = %envelope.settings,
                    current = %cache.settings,
                    "settings changed; cache evicted"
                );
                cache.dirty = true;
            }
            Ok(Some(envelope)) => {
                cache.entries = envelope.entries.into_iter().collect();
                cache.mtimes = envelope.mtimes;
                cache.hashes = envelope.hashes;
                tracing::debug!(
                    path = %cache.path.display(),
                    entries = cache.entries.len(),
                    "cache loaded"
                );
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(path = %cache.path.display(), error = %err, "cache unreadable; starting empty");
            }
        }
        if let Err(err) = cache.revalidate() {
            tracing::warn!(path = %cache.path.display(), error = %err, "cache validation failed; starting empty");
            cache.entries.clear();
        }
        cache
    }

    /// Check source stamps, refreshing mtimes or evicting everything.
    ///
    /// Returns true when the entries were evicted.
    pub fn revalidate(&mut self) -> Result<bool> {
        let keys: Vec<String> = self.sources.iter().map(|source| path_key(source)).collect();
        let same_set = keys.len() == self.hashes.len()
            && keys.iter().all(|key| self.hashes.contains_key(key));
        let mut stale = !same_set;
        let mut refreshed = BTreeMap::new();
        if !stale {
            for (source, key) in self.sources.iter().zip(&keys) {
                let mtime = mtime_ns(source);
                if self.mtimes.get(key) == Some(&mtime) {
                    continue;
                }
                if self.hashes.get(key).map(String::as_str) == Some(checksum(source)?.as_str()) {
                    refreshed.insert(key.clone(), mtime);
                } else {
                    stale = true;
                    break;
                }
            }
        }
        if stale {
            let had_entries = !self.entries.is_empty();
            self.restamp()?;
            self.entries.clear();
            self.dirty = true;
            if had_entries {
                tracing::info!(path = %self.path.display(), "sources changed; cache evicted");
            }
            return Ok(had_entries);
        }
        if !refreshed.is_empty() {
            self.mtimes.extend(refreshed);
            self.dirty = true;
        }
        Ok(false)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry and re-stamp the sources at their current state.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.dirty = true;
        self.restamp()
    }

    /// Persist the cache if it changed since the last save.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let envelope = EnvelopeRef {
            version: CACHE_SCHEMA_VERSION,
            settings: &self.settings,
            entries: self.entries.iter().collect(),
            mtimes: &self.mtimes,
            hashes: &self.hashes,
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|err| Error::Cache(format!("serialize {}: {err}", self.path.display())))?;
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|err| Error::io(parent, err))?;
        tmp.write_all(&bytes)
            .map_err(|err| Error::io(tmp.path().to_path_buf(), err))?;
        tmp.persist(&self.path)
            .map_err(|err| Error::io(&self.path, err.error))?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "cache saved");
        Ok(())
    }

    fn restamp(&mut self) -> Result<()> {
        self.mtimes.clear();
        self.hashes.clear();
        for source in &self.sources {
            let key = path_key(source);
            self.mtimes.insert(key.clone(), mtime_ns(source));
            self.hashes.insert(key, checksum(source)?);
        }
        Ok(())
    }
}

impl<K, V> Drop for PersistentCache<K, V>
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: Serialize + DeserializeOwned,
{
    fn drop(&mut self) {
        if let Err(err) = self.save() {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to flush cache");
        }
    }
}

fn read_envelope<K, V>(path: &Path) -> Result<Option<Envelope<K, V>>>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(Error::io(path, err)),
    };
    let envelope: Envelope<K, V> = serde_json::from_slice(&bytes)
        .map_err(|err| Error::Cache(format!("parse {}: {err}", path.display())))?;
    if envelope.version != CACHE_SCHEMA_VERSION {
        return Err(Error::Cache(format!(
            "{} has unsupported cache version {}",
            path.display(),
            envelope.version
        )));
    }
    Ok(Some(envelope))
}

/// Sources are keyed by canonical path so any spelling of a file matches.
fn path_key(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
#[path = "persistent_tests.rs"]
mod tests;
