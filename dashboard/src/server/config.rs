//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Url};

use crate::domain::ports::IdentityVerifier;
use crate::outbound::http::{HttpIdentityVerifier, identity_endpoint};
use crate::settings::{DashboardSettings, SettingsError};

/// Builder-style configuration for creating the edge server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) api_base: Url,
    pub(crate) verifier: Arc<dyn IdentityVerifier>,
    pub(crate) client: Client,
}

impl ServerConfig {
    /// Construct a configuration with an explicit verifier and proxy client.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        api_base: Url,
        verifier: Arc<dyn IdentityVerifier>,
        client: Client,
    ) -> Self {
        Self {
            bind_addr,
            api_base,
            verifier,
            client,
        }
    }

    /// Build the production configuration from loaded settings.
    ///
    /// The identity check and the `/api` passthrough both target the
    /// configured API base and share its request timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] when a setting is malformed or the HTTP
    /// clients cannot be built.
    pub fn from_settings(settings: &DashboardSettings) -> Result<Self, SettingsError> {
        let api_base = settings.api_base_url()?;
        let timeout = settings.request_timeout();
        let endpoint =
            identity_endpoint(&api_base).map_err(|error| SettingsError::InvalidUrl {
                value: api_base.to_string(),
                message: error.to_string(),
            })?;
        let verifier = HttpIdentityVerifier::new(endpoint, timeout).map_err(client_error)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(client_error)?;
        Ok(Self::new(
            settings.bind_addr()?,
            api_base,
            Arc::new(verifier),
            client,
        ))
    }

    /// Override the listen address.
    #[must_use]
    pub const fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Return the API base `/api/*` is forwarded to.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }
}

fn client_error(error: reqwest::Error) -> SettingsError {
    SettingsError::HttpClient {
        message: error.to_string(),
    }
}
