//! Runtime settings loaded via OrthoConfig.
//!
//! Values come from `DASHBOARD_*` environment variables, matching CLI flags
//! and configuration files, in the usual OrthoConfig precedence.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Remote API serving `/api/*`.
pub const DEFAULT_API_BASE_URL: &str = "https://paisebato-production.up.railway.app";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STATE_DIR: &str = ".dashboard";

/// Settings could not be loaded or hold an unusable value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Sources could not be read or merged.
    #[error("failed to load settings: {message}")]
    Load {
        /// Underlying loader error.
        message: String,
    },
    /// The API base is not an absolute URL.
    #[error("invalid API base URL {value}: {message}")]
    InvalidUrl {
        /// Rejected value.
        value: String,
        /// Parser error.
        message: String,
    },
    /// The bind address is not `host:port`.
    #[error("invalid bind address {value}: {message}")]
    InvalidBindAddr {
        /// Rejected value.
        value: String,
        /// Parser error.
        message: String,
    },
    /// The outbound HTTP client could not be built.
    #[error("failed to build HTTP client: {message}")]
    HttpClient {
        /// Builder error.
        message: String,
    },
}

/// Configuration shared by the edge server and the CLI.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DASHBOARD")]
pub struct DashboardSettings {
    /// Base URL of the remote API.
    #[ortho_config(default = DEFAULT_API_BASE_URL.to_owned())]
    pub api_base_url: String,
    /// Socket address the edge server listens on.
    #[ortho_config(default = DEFAULT_BIND_ADDR.to_owned())]
    pub bind_addr: String,
    /// Timeout for every outbound request, in seconds.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,
    /// Directory holding the CLI's cookie jar and storage.
    #[ortho_config(default = PathBuf::from(DEFAULT_STATE_DIR))]
    pub state_dir: PathBuf,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
        }
    }
}

impl DashboardSettings {
    /// Load from the environment and configuration files only, ignoring the
    /// process arguments.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] when a source cannot be parsed.
    pub fn load_without_args(binary: &str) -> Result<Self, SettingsError> {
        Self::load_from_iter([OsString::from(binary)]).map_err(|error| SettingsError::Load {
            message: error.to_string(),
        })
    }

    /// Load from the process arguments, environment and configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] when a source cannot be parsed.
    pub fn load_from_args() -> Result<Self, SettingsError> {
        Self::load_from_iter(std::env::args_os()).map_err(|error| SettingsError::Load {
            message: error.to_string(),
        })
    }

    /// Configured API base, by default the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value does not parse.
    pub fn api_base_url(&self) -> Result<Url, SettingsError> {
        Url::parse(&self.api_base_url).map_err(|error| SettingsError::InvalidUrl {
            value: self.api_base_url.clone(),
            message: error.to_string(),
        })
    }

    /// Configured listen address, by default `0.0.0.0:3000`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_addr
            .parse()
            .map_err(|error: std::net::AddrParseError| SettingsError::InvalidBindAddr {
                value: self.bind_addr.clone(),
                message: error.to_string(),
            })
    }

    /// Outbound request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Directory for persisted CLI session state.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings loading.

    use super::*;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 4] = [
        "DASHBOARD_API_BASE_URL",
        "DASHBOARD_BIND_ADDR",
        "DASHBOARD_REQUEST_TIMEOUT_SECS",
        "DASHBOARD_STATE_DIR",
    ];

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = DashboardSettings::load_without_args("dashboard").expect("loads");

        assert_eq!(
            settings.api_base_url().expect("default parses").as_str(),
            "https://paisebato-production.up.railway.app/"
        );
        assert_eq!(
            settings.bind_addr().expect("default parses"),
            SocketAddr::from(([0, 0, 0, 0], 3000))
        );
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.state_dir(), Path::new(".dashboard"));
    }

    #[rstest]
    fn loaded_defaults_match_the_default_value() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let loaded = DashboardSettings::load_without_args("dashboard-cli").expect("loads");
        let fallback = DashboardSettings::default();

        assert_eq!(loaded.api_base_url, fallback.api_base_url);
        assert_eq!(loaded.bind_addr, fallback.bind_addr);
        assert_eq!(loaded.request_timeout_secs, fallback.request_timeout_secs);
        assert_eq!(loaded.state_dir, fallback.state_dir);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("DASHBOARD_API_BASE_URL", Some("http://localhost:8080".to_owned())),
            ("DASHBOARD_BIND_ADDR", Some("127.0.0.1:4000".to_owned())),
            ("DASHBOARD_REQUEST_TIMEOUT_SECS", Some("5".to_owned())),
            ("DASHBOARD_STATE_DIR", Some("/tmp/dashboard-state".to_owned())),
        ]);

        let settings = DashboardSettings::load_without_args("dashboard").expect("loads");

        assert_eq!(
            settings.api_base_url().expect("parses").as_str(),
            "http://localhost:8080/"
        );
        assert_eq!(
            settings.bind_addr().expect("parses"),
            SocketAddr::from(([127, 0, 0, 1], 4000))
        );
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
        assert_eq!(settings.state_dir(), Path::new("/tmp/dashboard-state"));
    }

    #[rstest]
    fn malformed_urls_are_reported() {
        let settings = DashboardSettings {
            api_base_url: "not a url".to_owned(),
            ..DashboardSettings::default()
        };

        assert!(matches!(
            settings.api_base_url(),
            Err(SettingsError::InvalidUrl { .. })
        ));
    }

    #[rstest]
    #[case("localhost")]
    #[case("127.0.0.1")]
    #[case("127.0.0.1:http")]
    fn malformed_bind_addresses_are_reported(#[case] raw: &str) {
        let settings = DashboardSettings {
            bind_addr: raw.to_owned(),
            ..DashboardSettings::default()
        };

        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::InvalidBindAddr { .. })
        ));
    }
}
