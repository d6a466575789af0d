//! File-backed cookie jar and key/value storage.
//!
//! Each adapter keeps one JSON document inside a capability-scoped state
//! directory and rewrites it on every change.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use cap_std::{ambient_authority, fs::Dir};
use mockable::{Clock, DefaultClock};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::StoredCookie;
use crate::domain::ports::{CookieStore, PersistentStorage, SessionCookie, StorageError};

const COOKIE_FILE: &str = "cookies.json";
const STORAGE_FILE: &str = "storage.json";

struct JsonDocument {
    dir: Dir,
    file_name: &'static str,
    guard: Mutex<()>,
}

impl JsonDocument {
    fn open(root: &Path, file_name: &'static str) -> Result<Self, StorageError> {
        Dir::create_ambient_dir_all(root, ambient_authority())
            .map_err(|error| io_error(root, &error))?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())
            .map_err(|error| io_error(root, &error))?;
        Ok(Self {
            dir,
            file_name,
            guard: Mutex::new(()),
        })
    }

    fn read<T: DeserializeOwned + Default>(&self) -> Result<T, StorageError> {
        let _held = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.load()
    }

    /// Load, modify and rewrite the document under one lock.
    fn update<T, R>(&self, change: impl FnOnce(&mut T) -> R) -> Result<R, StorageError>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let _held = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = self.load()?;
        let result = change(&mut document);
        let encoded = serde_json::to_vec_pretty(&document)
            .map_err(|error| StorageError::serialization(error.to_string()))?;
        self.dir
            .write(self.file_name, encoded)
            .map_err(|error| io_error(Path::new(self.file_name), &error))?;
        Ok(result)
    }

    fn load<T: DeserializeOwned + Default>(&self) -> Result<T, StorageError> {
        match self.dir.read_to_string(self.file_name) {
            Ok(text) => serde_json::from_str(&text).map_err(|error| {
                StorageError::serialization(format!("{}: {error}", self.file_name))
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(T::default()),
            Err(error) => Err(io_error(Path::new(self.file_name), &error)),
        }
    }
}

fn io_error(path: &Path, error: &io::Error) -> StorageError {
    StorageError::io(format!("{}: {error}", path.display()))
}

/// Cookie jar persisted as `cookies.json` in a state directory.
pub struct FileCookieJar {
    clock: Arc<dyn Clock>,
    document: JsonDocument,
}

impl FileCookieJar {
    /// Open (creating if needed) the jar under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        Self::with_clock(root, Arc::new(DefaultClock))
    }

    /// Open the jar with an injectable clock for expiry checks.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the directory cannot be created or
    /// opened.
    pub fn with_clock(root: &Path, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        Ok(Self {
            clock,
            document: JsonDocument::open(root, COOKIE_FILE)?,
        })
    }
}

impl CookieStore for FileCookieJar {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        let now = self.clock.utc();
        let cookies: BTreeMap<String, StoredCookie> = self.document.read()?;
        Ok(cookies
            .get(name)
            .filter(|cookie| cookie.is_live(now))
            .map(|cookie| cookie.value.clone()))
    }

    fn set(&self, cookie: SessionCookie) -> Result<(), StorageError> {
        let now = self.clock.utc();
        let stored = StoredCookie::issue(&cookie, now);
        self.document
            .update(|cookies: &mut BTreeMap<String, StoredCookie>| {
                cookies.retain(|_, existing| existing.is_live(now));
                cookies.insert(cookie.name, stored);
            })
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.document
            .update(|cookies: &mut BTreeMap<String, StoredCookie>| {
                cookies.remove(name);
            })
    }
}

/// Key/value storage persisted as `storage.json` in a state directory.
pub struct FileStorage {
    document: JsonDocument,
}

impl FileStorage {
    /// Open (creating if needed) the storage under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            document: JsonDocument::open(root, STORAGE_FILE)?,
        })
    }
}

impl PersistentStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items: BTreeMap<String, String> = self.document.read()?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.document
            .update(|items: &mut BTreeMap<String, String>| {
                items.insert(key.to_owned(), value.to_owned());
            })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.document
            .update(|items: &mut BTreeMap<String, String>| {
                items.remove(key);
            })
    }
}
