//! In-memory cookie jar and key/value storage.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mockable::{Clock, DefaultClock};

use super::StoredCookie;
use crate::domain::ports::{CookieStore, PersistentStorage, SessionCookie, StorageError};

/// Cookie jar honouring max-age against an injectable clock.
pub struct MemoryCookieJar {
    clock: Arc<dyn Clock>,
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
}

impl Default for MemoryCookieJar {
    fn default() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl MemoryCookieJar {
    /// Jar whose expiry checks read `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            cookies: Mutex::new(BTreeMap::new()),
        }
    }

    /// Live cookies rendered as a `Cookie` request header value.
    ///
    /// Returns `None` when no cookie is live.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        let now = self.clock.utc();
        let rendered = self
            .lock()
            .iter()
            .filter(|(_, cookie)| cookie.is_live(now))
            .map(|(name, cookie)| format!("{name}={}", cookie.value))
            .collect::<Vec<_>>();
        (!rendered.is_empty()).then(|| rendered.join("; "))
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredCookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CookieStore for MemoryCookieJar {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        let now = self.clock.utc();
        let mut cookies = self.lock();
        let live = match cookies.get(name) {
            Some(cookie) if cookie.is_live(now) => Some(cookie.value.clone()),
            Some(_) => {
                cookies.remove(name);
                None
            }
            None => None,
        };
        Ok(live)
    }

    fn set(&self, cookie: SessionCookie) -> Result<(), StorageError> {
        let stored = StoredCookie::issue(&cookie, self.clock.utc());
        self.lock().insert(cookie.name, stored);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.lock().remove(name);
        Ok(())
    }
}

/// Key/value storage held in memory.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistentStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}
