//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (HTTP transport, the identity endpoint, cookie and storage backends). Each
//! trait exposes strongly typed errors so adapters map their failures into
//! predictable variants.

mod identity_verifier;
mod request_executor;
mod session_persistence;

pub use identity_verifier::{IdentityVerificationError, IdentityVerifier};
pub use request_executor::RequestExecutor;
pub use session_persistence::{CookieStore, PersistentStorage, SameSite, SessionCookie, StorageError};

#[cfg(test)]
pub use identity_verifier::MockIdentityVerifier;
#[cfg(test)]
pub use request_executor::MockRequestExecutor;
