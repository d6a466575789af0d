//! Ports for the two places a session is persisted: cookies readable by the
//! edge gate, and page-local key/value storage.

use std::time::Duration;

use thiserror::Error;

/// Failures raised by cookie and storage adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("session storage I/O failed: {message}")]
    Io {
        /// Human-readable detail.
        message: String,
    },
    /// Stored content could not be encoded or decoded.
    #[error("session storage serialisation failed: {message}")]
    Serialization {
        /// Human-readable detail.
        message: String,
    },
}

impl StorageError {
    /// Build a [`StorageError::Io`].
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Build a [`StorageError::Serialization`].
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

/// Cookie `SameSite` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    /// Same-site requests only.
    Strict,
    /// Top-level navigations may carry the cookie.
    #[default]
    Lax,
    /// Sent on every request.
    None,
}

/// A cookie the session wants set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Path scope.
    pub path: String,
    /// Lifetime from the moment it is set.
    pub max_age: Duration,
    /// `SameSite` attribute.
    pub same_site: SameSite,
}

impl SessionCookie {
    /// Root-path, `SameSite=Lax` cookie living for `max_age`.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, max_age: Duration) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_owned(),
            max_age,
            same_site: SameSite::Lax,
        }
    }
}

/// Cookie jar visible to the edge gate.
pub trait CookieStore: Send + Sync {
    /// Current, unexpired value for `name`.
    fn get(&self, name: &str) -> Result<Option<String>, StorageError>;
    /// Set or replace a cookie.
    fn set(&self, cookie: SessionCookie) -> Result<(), StorageError>;
    /// Delete a cookie; deleting a missing cookie succeeds.
    fn remove(&self, name: &str) -> Result<(), StorageError>;
}

/// Page-local persistent key/value storage.
pub trait PersistentStorage: Send + Sync {
    /// Value stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Store `value` under `key`.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove `key`; removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
