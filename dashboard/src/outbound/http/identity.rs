//! Reqwest implementation of the identity verifier port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL};
use reqwest::{Client, Url};

use super::map_transport_message;
use crate::domain::Credential;
use crate::domain::ports::{IdentityVerificationError, IdentityVerifier};

const IDENTITY_PATH: &str = "/api/auth/me";

/// `<api base>/api/auth/me`.
///
/// # Errors
///
/// Returns an error when the joined URL is not valid.
///
/// # Examples
/// ```
/// use dashboard::outbound::http::identity_endpoint;
/// use url::Url;
///
/// let base = Url::parse("https://api.example.com").expect("valid URL");
/// let endpoint = identity_endpoint(&base).expect("joins");
/// assert_eq!(endpoint.as_str(), "https://api.example.com/api/auth/me");
/// ```
pub fn identity_endpoint(api_base: &Url) -> Result<Url, url::ParseError> {
    api_base.join(IDENTITY_PATH)
}

/// Verifier calling the identity endpoint once per check, uncached.
pub struct HttpIdentityVerifier {
    client: Client,
    endpoint: Url,
}

impl HttpIdentityVerifier {
    /// Build a verifier for `endpoint` with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, credential: &Credential) -> Result<(), IdentityVerificationError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(AUTHORIZATION, credential.authorization_value())
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|error| IdentityVerificationError::Transport {
                message: map_transport_message(&error),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(IdentityVerificationError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
