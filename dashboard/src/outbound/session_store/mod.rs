//! Session persistence adapters.
//!
//! The in-memory adapters back tests and the edge server's integration
//! suites; the file adapters give the command-line front end a session that
//! survives between invocations.

mod file;
mod memory;

pub use file::{FileCookieJar, FileStorage};
pub use memory::{MemoryCookieJar, MemoryStorage};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ports::SessionCookie;

/// Cookie value plus its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    /// `None` when the max-age does not fit in a timestamp.
    expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn issue(cookie: &SessionCookie, now: DateTime<Utc>) -> Self {
        let expires_at = TimeDelta::from_std(cookie.max_age)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime));
        Self {
            value: cookie.value.clone(),
            expires_at,
        }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}
