//! Port for the remote "who am I" check used by the session guard.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Credential;

/// Reasons a credential failed remote verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityVerificationError {
    /// The identity endpoint could not be reached.
    #[error("identity check transport failed: {message}")]
    Transport {
        /// Human-readable detail.
        message: String,
    },
    /// The identity endpoint answered with a non-success status.
    #[error("identity check rejected with status {status}")]
    Rejected {
        /// HTTP status returned by the identity endpoint.
        status: u16,
    },
}

/// Validates a credential against the identity endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Succeed only when the remote endpoint accepts `credential`.
    async fn verify(&self, credential: &Credential) -> Result<(), IdentityVerificationError>;
}
