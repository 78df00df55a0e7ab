// src/core/cache.rs

use crate::core::errors::{Cause, CommandError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// The cache could not be read or written. Never fatal: the value is computed anyway.
#[derive(Error, Debug, Clone)]
#[error("{message}: {cause}")]
pub struct CacheError {
    pub message: String,
    #[source]
    pub cause: Cause,
}

impl CacheError {
    fn new(message: impl Into<String>, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: message.into(),
            cause: Arc::new(cause),
        }
    }
}

/// The signature of the closure a cache calls on a miss.
pub type Compute<'a> = &'a dyn Fn() -> Result<String, CommandError>;

/// Memoizes expensive string-producing operations such as `--summary` or
/// `--describe-commands`.
///
/// `owner` is the file whose output is being cached and `key` names the operation.
/// If `compute` fails the error is returned and nothing is stored.
/// Implementations must be safe to share between threads.
pub trait Cache: Send + Sync + fmt::Debug {
    fn fetch(&self, owner: &Path, key: &str, compute: Compute<'_>) -> Result<String, CommandError>;
}

/// Performs no caching: every fetch calls `compute`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl Cache for NullCache {
    fn fetch(&self, _owner: &Path, _key: &str, compute: Compute<'_>) -> Result<String, CommandError> {
        compute()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    value: String,
    mod_time: i64,
    cached_at: i64,
}

type Outcome = Result<String, CommandError>;

/// One in-progress computation that concurrent callers with the same key wait on.
#[derive(Debug, Default)]
struct InFlight {
    outcome: Mutex<Option<Outcome>>,
    done: Condvar,
}

impl InFlight {
    fn finish(&self, outcome: Outcome) {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self.done.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// A JSON file-backed cache, invalidated by the owner's modification time and an optional TTL.
///
/// The document is loaded on first use and rewritten in full after every miss.
/// Concurrent fetches of the same `(key, owner)` share one computation.
/// Nothing coordinates separate processes writing the same file; the last write wins.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    expires_after: Option<Duration>,
    entries: RwLock<Option<HashMap<String, CacheEntry>>>,
    in_flight: Mutex<HashMap<String, Arc<InFlight>>>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expires_after: None,
            entries: RwLock::new(None),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Entries older than `ttl` are recomputed. A zero duration disables expiry.
    pub fn expires_after(mut self, ttl: Duration) -> Self {
        self.expires_after = (!ttl.is_zero()).then_some(ttl);
        self
    }

    /// The location of the cache document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fetch_once(&self, owner: &Path, cache_key: &str, compute: Compute<'_>) -> Outcome {
        self.ensure_loaded();

        let mod_time = modification_time(owner);
        let now = unix_now();

        let cached = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .as_ref()
                .and_then(|map| map.get(cache_key))
                .filter(|entry| self.is_valid(entry, mod_time, now))
                .map(|entry| entry.value.clone())
        };
        if let Some(value) = cached {
            debug!("cache hit: {}", cache_key);
            return Ok(value);
        }

        debug!("cache miss: {}", cache_key);
        let value = compute()?;

        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.get_or_insert_with(HashMap::new).insert(
                cache_key.to_string(),
                CacheEntry {
                    value: value.clone(),
                    mod_time,
                    cached_at: now,
                },
            );
        }

        self.persist();
        Ok(value)
    }

    fn is_valid(&self, entry: &CacheEntry, mod_time: i64, now: i64) -> bool {
        if entry.mod_time != mod_time {
            return false;
        }
        match self.expires_after {
            Some(ttl) => {
                let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
                now.saturating_sub(entry.cached_at) <= ttl
            }
            None => true,
        }
    }

    fn ensure_loaded(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.is_none() {
            *entries = Some(self.load());
        }
    }

    fn load(&self) -> HashMap<String, CacheEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!("{}", CacheError::new("could not load cache", e));
                return HashMap::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(
                "{}",
                CacheError::new(format!("ignoring corrupt cache at {}", self.path.display()), e)
            );
            HashMap::new()
        })
    }

    fn persist(&self) {
        let serialized = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_vec(&entries.as_ref().cloned().unwrap_or_default())
        };

        let result = serialized
            .map_err(|e| CacheError::new("could not serialize cache", e))
            .and_then(|bytes| {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| CacheError::new("could not create cache directory", e))?;
                }
                fs::write(&self.path, bytes).map_err(|e| CacheError::new("could not write cache", e))
            });

        if let Err(e) = result {
            warn!("{}", e);
        }
    }
}

impl Cache for FileCache {
    fn fetch(&self, owner: &Path, key: &str, compute: Compute<'_>) -> Result<String, CommandError> {
        let cache_key = format!("{}:{}", key, owner.display());

        let (flight, leader) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(&cache_key) {
                Some(flight) => (Arc::clone(flight), false),
                None => {
                    let flight = Arc::new(InFlight::default());
                    in_flight.insert(cache_key.clone(), Arc::clone(&flight));
                    (flight, true)
                }
            }
        };

        if !leader {
            debug!("waiting on in-flight computation: {}", cache_key);
            return flight.wait();
        }

        let outcome = self.fetch_once(owner, &cache_key, compute);
        flight.finish(outcome.clone());
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&cache_key);
        outcome
    }
}

/// Seconds since the epoch of the owner's last modification, or 0 when it cannot be read.
fn modification_time(path: &Path) -> i64 {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .and_then(|elapsed| i64::try_from(elapsed.as_secs()).ok())
        .unwrap_or(0)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_secs()).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::Command;
    use crate::core::errors::CommandErrorKind;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use tempfile::tempdir;

    fn counting<'a>(counter: &'a AtomicUsize, value: &'static str) -> impl Fn() -> Outcome + 'a {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value.to_string())
        }
    }

    #[test]
    fn test_null_cache_always_computes() {
        let calls = AtomicUsize::new(0);
        let compute = counting(&calls, "v");
        NullCache.fetch(Path::new("/bin/sh"), "summary", &compute).unwrap();
        NullCache.fetch(Path::new("/bin/sh"), "summary", &compute).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_hit_computes_once_and_persists() {
        let dir = tempdir().unwrap();
        let owner = dir.path().join("owner");
        fs::write(&owner, "#!/bin/sh\n").unwrap();
        let cache_path = dir.path().join("nested").join("cache.json");

        let calls = AtomicUsize::new(0);
        let compute = counting(&calls, "hello");
        let cache = FileCache::new(&cache_path);
        assert_eq!(cache.fetch(&owner, "summary", &compute).unwrap(), "hello");
        assert_eq!(cache.fetch(&owner, "summary", &compute).unwrap(), "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&cache_path).unwrap()).unwrap();
        let key = format!("summary:{}", owner.display());
        assert_eq!(document[&key]["value"], "hello");
        assert!(document[&key]["modTime"].is_i64());
        assert!(document[&key]["cachedAt"].is_i64());

        // A fresh instance reads what the first one wrote.
        let reloaded = FileCache::new(&cache_path);
        assert_eq!(reloaded.fetch(&owner, "summary", &compute).unwrap(), "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_keys_are_scoped_by_operation() {
        let dir = tempdir().unwrap();
        let owner = dir.path().join("owner");
        fs::write(&owner, "x").unwrap();
        let cache = FileCache::new(dir.path().join("cache.json"));

        let calls = AtomicUsize::new(0);
        cache.fetch(&owner, "summary", &counting(&calls, "a")).unwrap();
        let other = cache.fetch(&owner, "describe-commands", &counting(&calls, "b")).unwrap();
        assert_eq!(other, "b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_mtime_change_invalidates() {
        let dir = tempdir().unwrap();
        let owner = dir.path().join("owner");
        fs::write(&owner, "x").unwrap();
        let cache = FileCache::new(dir.path().join("cache.json"));

        let calls = AtomicUsize::new(0);
        cache.fetch(&owner, "summary", &counting(&calls, "old")).unwrap();

        let file = fs::OpenOptions::new().write(true).open(&owner).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(3600)).unwrap();

        let value = cache.fetch(&owner, "summary", &counting(&calls, "new")).unwrap();
        assert_eq!(value, "new");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_expired_entry_is_recomputed() {
        let dir = tempdir().unwrap();
        let owner = dir.path().join("owner");
        fs::write(&owner, "x").unwrap();
        let cache_path = dir.path().join("cache.json");

        let mut stale = HashMap::new();
        stale.insert(
            format!("summary:{}", owner.display()),
            CacheEntry {
                value: "stale".to_string(),
                mod_time: modification_time(&owner),
                cached_at: unix_now() - 7200,
            },
        );
        fs::write(&cache_path, serde_json::to_string(&stale).unwrap()).unwrap();

        let calls = AtomicUsize::new(0);
        let untimed = FileCache::new(&cache_path);
        assert_eq!(untimed.fetch(&owner, "summary", &counting(&calls, "fresh")).unwrap(), "stale");

        let timed = FileCache::new(&cache_path).expires_after(Duration::from_secs(60));
        assert_eq!(timed.fetch(&owner, "summary", &counting(&calls, "fresh")).unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_corrupt_file_is_treated_as_empty() {
        let dir = tempdir().unwrap();
        let owner = dir.path().join("owner");
        fs::write(&owner, "x").unwrap();
        let cache_path = dir.path().join("cache.json");
        fs::write(&cache_path, "{ not json").unwrap();

        let calls = AtomicUsize::new(0);
        let cache = FileCache::new(&cache_path);
        assert_eq!(cache.fetch(&owner, "summary", &counting(&calls, "v")).unwrap(), "v");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let rewritten: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&cache_path).unwrap()).unwrap();
        assert!(rewritten.is_object());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let dir = tempdir().unwrap();
        let owner = dir.path().join("owner");
        fs::write(&owner, "x").unwrap();
        let cache = FileCache::new(dir.path().join("cache.json"));
        let command = Command::null("broken", &std::sync::Weak::new());

        let calls = AtomicUsize::new(0);
        let failing = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CommandError::new(
                CommandErrorKind::Summary,
                &command,
                "boom",
                io::Error::other("boom"),
            ))
        };
        assert!(cache.fetch(&owner, "summary", &failing).is_err());
        assert!(cache.fetch(&owner, "summary", &failing).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_fetches_are_coalesced() {
        const CALLERS: usize = 8;

        let dir = tempdir().unwrap();
        let owner = dir.path().join("owner");
        fs::write(&owner, "x").unwrap();
        let cache = FileCache::new(dir.path().join("cache.json"));

        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(CALLERS);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(200));
            Ok("shared".to_string())
        };

        let results: Vec<Outcome> = thread::scope(|scope| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache.fetch(&owner, "describe-commands", &compute)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.as_deref().unwrap() == "shared"));
    }
}
