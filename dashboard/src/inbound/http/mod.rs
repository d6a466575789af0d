//! HTTP inbound adapter: the edge gate, page shells, API passthrough and
//! health probes.

pub mod health;
pub mod pages;
pub mod proxy;
pub mod session_guard;
