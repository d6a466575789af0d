//! The canonical session store.
//!
//! One [`SessionStore`] exists per running application. It is cloned (cheaply)
//! into every binding and service that needs the credential, rather than being
//! reached through ambient globals. Reads are snapshots; only explicit
//! login/logout actions write. Every credential change is announced on a
//! `watch` channel so bound queries can re-fetch under the new identity.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::ports::{CookieStore, PersistentStorage, SessionCookie, StorageError};
use super::{AuthData, Credential, Principal};

/// Cookie holding the raw token; read by the edge gate.
pub const TOKEN_COOKIE: &str = "auth_token";
/// Cookie and storage key holding the token type.
pub const TOKEN_TYPE_KEY: &str = "auth_token_type";
/// Storage key holding the JSON-encoded principal.
pub const USER_STORAGE_KEY: &str = "auth_user";
/// Lifetime of the session cookies.
pub const SESSION_COOKIE_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// In-memory view of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Token and scheme, when signed in.
    pub credential: Option<Credential>,
    /// Cached profile of the signed-in user.
    pub principal: Option<Principal>,
}

struct SessionInner {
    cookies: Arc<dyn CookieStore>,
    storage: Arc<dyn PersistentStorage>,
    snapshot: RwLock<SessionSnapshot>,
    changes: watch::Sender<u64>,
}

/// Shared handle to the session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    /// Create an empty session over the given persistence adapters.
    ///
    /// Call [`SessionStore::restore`] to load a previously persisted session.
    #[must_use]
    pub fn new(cookies: Arc<dyn CookieStore>, storage: Arc<dyn PersistentStorage>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                cookies,
                storage,
                snapshot: RwLock::new(SessionSnapshot::default()),
                changes: watch::channel(0).0,
            }),
        }
    }

    /// Current credential, if any.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.read().credential.clone()
    }

    /// Current principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        self.read().principal.clone()
    }

    /// Full snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.read().clone()
    }

    /// Receiver that observes a new value whenever the credential changes.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Persist a fresh login or registration.
    ///
    /// Writes the token and token type cookies, mirrors the token type and the
    /// principal into storage, then updates the snapshot. When any write
    /// fails, whatever was already written is removed and the session ends up
    /// signed out.
    pub fn set_auth(&self, auth: &AuthData) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&auth.user)
            .map_err(|error| StorageError::serialization(error.to_string()))?;

        if let Err(error) = self.persist(auth, &user_json) {
            warn!(%error, "session write failed; discarding partial session");
            for leftover in self.remove_persisted().into_iter().filter_map(Result::err) {
                warn!(error = %leftover, "could not discard partial session entry");
            }
            self.publish(SessionSnapshot::default());
            return Err(error);
        }

        self.publish(SessionSnapshot {
            credential: Some(auth.credential()),
            principal: Some(auth.user.clone()),
        });
        debug!(user_id = auth.user.id, "session established");
        Ok(())
    }

    /// Clear cookies, storage and snapshot together.
    ///
    /// Every entry is attempted even if an earlier one fails; the first error
    /// is returned.
    pub fn clear_auth(&self) -> Result<(), StorageError> {
        self.publish(SessionSnapshot::default());
        let results = self.remove_persisted();
        debug!("session cleared");
        results.into_iter().collect()
    }

    /// Rebuild the snapshot from persisted cookies and storage.
    ///
    /// The token type cookie is authoritative; the storage copy is only a
    /// fallback. Without both a token and a token type no credential is
    /// restored. An unreadable principal is ignored.
    pub fn restore(&self) -> Result<SessionSnapshot, StorageError> {
        let cookies = &self.inner.cookies;
        let storage = &self.inner.storage;

        let token = cookies.get(TOKEN_COOKIE)?;
        let token_type = match cookies.get(TOKEN_TYPE_KEY)? {
            Some(kind) => Some(kind),
            None => storage.get_item(TOKEN_TYPE_KEY)?,
        };
        let credential = token
            .zip(token_type)
            .filter(|(raw, kind)| !raw.is_empty() && !kind.is_empty())
            .map(|(raw, kind)| Credential::new(raw, kind));

        let principal = storage
            .get_item(USER_STORAGE_KEY)?
            .filter(|raw| raw != "undefined")
            .and_then(|raw| match serde_json::from_str::<Principal>(&raw) {
                Ok(principal) => Some(principal),
                Err(error) => {
                    warn!(%error, "ignoring unreadable stored principal");
                    None
                }
            });

        let snapshot = SessionSnapshot {
            credential,
            principal,
        };
        self.publish(snapshot.clone());
        Ok(snapshot)
    }

    fn persist(&self, auth: &AuthData, user_json: &str) -> Result<(), StorageError> {
        let cookies = &self.inner.cookies;
        cookies.set(SessionCookie::new(TOKEN_COOKIE, &auth.token, SESSION_COOKIE_MAX_AGE))?;
        cookies.set(SessionCookie::new(
            TOKEN_TYPE_KEY,
            &auth.token_type,
            SESSION_COOKIE_MAX_AGE,
        ))?;

        let storage = &self.inner.storage;
        storage.set_item(TOKEN_TYPE_KEY, &auth.token_type)?;
        storage.set_item(USER_STORAGE_KEY, user_json)
    }

    fn remove_persisted(&self) -> [Result<(), StorageError>; 4] {
        let cookies = &self.inner.cookies;
        let storage = &self.inner.storage;
        [
            cookies.remove(TOKEN_COOKIE),
            cookies.remove(TOKEN_TYPE_KEY),
            storage.remove_item(TOKEN_TYPE_KEY),
            storage.remove_item(USER_STORAGE_KEY),
        ]
    }

    /// Replace the snapshot, announcing a change when the credential differs.
    fn publish(&self, snapshot: SessionSnapshot) {
        let changed = {
            let mut current = self.write();
            let differs = current.credential != snapshot.credential;
            *current = snapshot;
            differs
        };
        if changed {
            self.inner.changes.send_modify(|generation| *generation += 1);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionSnapshot> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionSnapshot> {
        self.inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
