//! Reactive bindings between remote endpoints and local request state.
//!
//! A binding owns one [`RequestState`] published through a
//! [`tokio::sync::watch`] channel and enforces single-flight semantics:
//! starting an attempt cancels the previous one, and only the most recently
//! started attempt may write `data` or `error`. Cancelled attempts settle as
//! no-ops apart from clearing `loading`.

mod mutation;
mod query;

pub use mutation::{MutationBinding, MutationMethod, MutationPayload};
pub use query::{QueryBinding, QueryOptions};

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::http::{AUTHORIZATION_HEADER, Headers, HttpMethod};
use super::{RequestError, SessionStore};

/// Observable state of one binding.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    /// Last successfully decoded payload.
    pub data: Option<T>,
    /// Message of the latest failure; cleared when an attempt starts.
    pub error: Option<String>,
    /// True exactly while a non-cancelled attempt is in flight.
    pub loading: bool,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }
}

/// Pass-through request options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Overrides the binding's default verb.
    pub method: Option<HttpMethod>,
    /// Extra headers sent with every attempt.
    pub headers: Headers,
}

impl FetchOptions {
    /// Options carrying only extra headers.
    #[must_use]
    pub const fn with_headers(headers: Headers) -> Self {
        Self {
            method: None,
            headers,
        }
    }
}

/// Caller headers plus the session's `Authorization` header, if any.
fn authorised_headers(base: &Headers, session: &SessionStore) -> Headers {
    let mut headers = base.clone();
    if let Some(credential) = session.credential() {
        headers.set(AUTHORIZATION_HEADER, credential.authorization_value());
    }
    headers
}

/// Handle for one started attempt.
pub(crate) struct Attempt {
    generation: u64,
    token: CancellationToken,
}

impl Attempt {
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[derive(Default)]
struct FlightSlot {
    generation: u64,
    active: Option<CancellationToken>,
    unbound: bool,
}

/// Single-flight coordinator shared by query and mutation bindings.
pub(crate) struct SingleFlight<T> {
    slot: Mutex<FlightSlot>,
    state: watch::Sender<RequestState<T>>,
}

impl<T> SingleFlight<T> {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(RequestState::default());
        Self {
            slot: Mutex::new(FlightSlot::default()),
            state,
        }
    }

    /// Supersede any in-flight attempt and start a new one.
    ///
    /// Returns `None` once the binding has been unbound.
    pub(crate) fn begin(&self) -> Option<Attempt> {
        let mut slot = self.lock();
        if slot.unbound {
            return None;
        }
        if let Some(previous) = slot.active.take() {
            previous.cancel();
        }
        slot.generation += 1;
        let token = CancellationToken::new();
        slot.active = Some(token.clone());
        self.state.send_modify(|state| {
            state.error = None;
            state.loading = true;
        });
        Some(Attempt {
            generation: slot.generation,
            token,
        })
    }

    /// Cancel the in-flight attempt, if any.
    pub(crate) fn cancel(&self) {
        let mut slot = self.lock();
        if let Some(active) = slot.active.take() {
            active.cancel();
            self.clear_loading();
        }
    }

    /// Cancel in-flight work and refuse every later write.
    pub(crate) fn unbind(&self) {
        let mut slot = self.lock();
        if slot.unbound {
            return;
        }
        if let Some(active) = slot.active.take() {
            active.cancel();
            self.clear_loading();
        }
        slot.unbound = true;
    }

    pub(crate) fn is_bound(&self) -> bool {
        !self.lock().unbound
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.state.subscribe()
    }

    fn clear_loading(&self) {
        self.state.send_if_modified(|state| {
            let was_loading = state.loading;
            state.loading = false;
            was_loading
        });
    }

    fn lock(&self) -> MutexGuard<'_, FlightSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> SingleFlight<T> {
    /// Record the outcome of `attempt` if it is still the current one.
    ///
    /// Superseded, cancelled and unbound attempts come back as
    /// [`RequestError::Cancelled`] without touching `data` or `error`.
    pub(crate) fn settle(
        &self,
        attempt: &Attempt,
        outcome: Result<T, RequestError>,
    ) -> Result<T, RequestError> {
        let mut slot = self.lock();
        if slot.unbound || slot.generation != attempt.generation {
            return Err(RequestError::Cancelled);
        }
        slot.active = None;

        if attempt.token.is_cancelled() {
            self.clear_loading();
            return Err(RequestError::Cancelled);
        }
        match outcome {
            Ok(data) => {
                self.state.send_modify(|state| {
                    state.data = Some(data.clone());
                    state.loading = false;
                });
                Ok(data)
            }
            Err(error) => {
                let message = error.user_message();
                self.state.send_modify(|state| {
                    if message.is_some() {
                        state.error = message;
                    }
                    state.loading = false;
                });
                Err(error)
            }
        }
    }

    pub(crate) fn snapshot(&self) -> RequestState<T> {
        self.state.borrow().clone()
    }
}

#[cfg(test)]
mod tests;
