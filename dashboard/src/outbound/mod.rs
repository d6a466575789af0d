//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **http**: reqwest-backed request executor and identity verifier
//! - **session_store**: cookie jars and key/value storage for the session
//!
//! Adapters are thin translators between domain types and the underlying
//! transport or medium. They contain no business logic.

pub mod http;
pub mod session_store;
