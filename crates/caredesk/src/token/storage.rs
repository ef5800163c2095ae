// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key/value persistence backing the token store.
//!
//! Values are plain strings under fixed keys (`accessToken`, `refreshToken`,
//! `user`). [`FileStorage`] survives restarts by keeping them in one JSON
//! file written atomically; [`MemoryStorage`] is for tests and embedding.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::error::StorageError;

/// Durable string key/value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Write every entry, all or nothing.
    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove every key, all or nothing. Missing keys are not an error.
    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_all(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.remove_all(&[key])
    }
}

/// In-process storage. Lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = self.entries.lock();
        for (key, value) in entries {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.entries.lock();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Storage persisted as a JSON object in `<dir>/session.json`.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub const FILE_NAME: &'static str = "session.json";

    /// Open (creating the directory if needed) and load any existing file.
    ///
    /// An unreadable file is discarded with a warning rather than failing:
    /// the worst case is a fresh login.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(Self::FILE_NAME);
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), err = %e, "discarding unreadable session file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut current = self.entries.lock();
        let mut next = current.clone();
        for (key, value) in entries {
            next.insert((*key).to_owned(), (*value).to_owned());
        }
        save(&self.path, &next)?;
        *current = next;
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut current = self.entries.lock();
        if !keys.iter().any(|key| current.contains_key(*key)) {
            return Ok(());
        }
        let mut next = current.clone();
        for key in keys {
            next.remove(*key);
        }
        save(&self.path, &next)?;
        *current = next;
        Ok(())
    }
}

/// Write `entries` to `path` atomically (write tmp + rename).
///
/// The temp name carries the PID and a counter so concurrent saves never
/// share a temp file.
fn save(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(entries)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    // Leftover from a crashed process that had the same PID.
    let _ = std::fs::remove_file(&tmp_path);
    let written = write_private(&tmp_path, json.as_bytes())
        .and_then(|()| std::fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Create `path` readable only by the owner (on unix) and write `bytes`.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
