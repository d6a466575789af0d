//! Reqwest-backed HTTP adapters.
//!
//! Both adapters own transport details only: header and body encoding,
//! timeouts, cancellation and mapping reqwest failures into domain errors.

mod identity;
mod reqwest_executor;

pub use identity::{HttpIdentityVerifier, identity_endpoint};
pub use reqwest_executor::ReqwestExecutor;

fn map_transport_message(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {error}")
    } else {
        error.to_string()
    }
}
