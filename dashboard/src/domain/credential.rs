//! Session credential and principal types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Token type assumed at the edge when only the token cookie survives.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Bearer token plus token type identifying an authenticated session.
///
/// `Debug` redacts the token so credentials never reach logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    token: String,
    token_type: String,
}

impl Credential {
    /// Construct a credential.
    #[must_use]
    pub fn new(token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: token_type.into(),
        }
    }

    /// Construct a credential from edge cookies, defaulting the token type.
    ///
    /// Returns `None` when the token is missing or blank.
    #[must_use]
    pub fn from_cookies(token: Option<&str>, token_type: Option<&str>) -> Option<Self> {
        let raw_token = token.filter(|value| !value.trim().is_empty())?;
        let kind = token_type
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_TOKEN_TYPE);
        Some(Self::new(raw_token, kind))
    }

    /// Raw token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Token type, e.g. `Bearer`.
    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Value for the `Authorization` header: `<tokenType> <token>`.
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::Credential;
    ///
    /// let credential = Credential::new("abc", "Bearer");
    /// assert_eq!(credential.authorization_value(), "Bearer abc");
    /// ```
    #[must_use]
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Profile of the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Server-assigned user id.
    pub id: i64,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Whether the account is enabled.
    pub is_active: bool,
    /// Creation timestamp as sent by the API.
    pub created_at: String,
}

/// Payload returned by the login and registration endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    /// Bearer token.
    pub token: String,
    /// Authorization scheme, normally `Bearer`.
    pub token_type: String,
    /// The signed-in user.
    pub user: Principal,
}

impl AuthData {
    /// Credential half of the payload.
    #[must_use]
    pub fn credential(&self) -> Credential {
        Credential::new(self.token.clone(), self.token_type.clone())
    }
}
