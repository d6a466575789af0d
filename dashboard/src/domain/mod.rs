//! Domain primitives, bindings and services.
//!
//! Purpose: model the request lifecycle between the dashboard and the remote
//! expense API, independently of any transport or storage technology.
//!
//! Public surface:
//! - RequestError: failure kinds shared by every binding.
//! - HttpRequest / HttpResponse / ResponseBody: executor-facing messages.
//! - Credential / Principal / AuthData: session identity.
//! - SessionStore: the single canonical session.
//! - QueryBinding / MutationBinding: reactive read and write bindings.
//! - DashboardClient: per-endpoint operations used by the front ends.

pub mod binding;
pub mod credential;
pub mod dashboard_client;
pub mod error;
pub mod guard;
pub mod http;
pub mod pages;
pub mod ports;
pub mod schema;
pub mod session;

pub use self::binding::{
    FetchOptions, MutationBinding, MutationMethod, MutationPayload, QueryBinding, QueryOptions,
    RequestState,
};
pub use self::credential::{AuthData, Credential, Principal};
pub use self::dashboard_client::{DashboardClient, DashboardError};
pub use self::error::RequestError;
pub use self::http::{
    FormData, FormValue, Headers, HttpMethod, HttpRequest, HttpResponse, RequestBody,
    ResponseBody,
};
pub use self::session::{SessionSnapshot, SessionStore};
