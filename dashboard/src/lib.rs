//! Shared-expense dashboard core.
//!
//! Request bindings with single-flight semantics, the canonical session store
//! and the edge session guard, arranged as a hexagon:
//! - `domain`: request lifecycle, session and guard decisions, plus ports.
//! - `outbound`: reqwest transport, identity check and session persistence.
//! - `inbound::http`: actix-web middleware, page shells, `/api` passthrough.
//! - `server`: edge application wiring.
//! - `settings`: OrthoConfig-backed runtime settings.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;
