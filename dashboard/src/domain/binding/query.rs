//! Read binding: a URL bound to request state, fetched on bind, on URL
//! change and whenever the session credential changes.

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Attempt, FetchOptions, RequestState, SingleFlight, authorised_headers};
use crate::domain::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::domain::ports::RequestExecutor;
use crate::domain::{RequestError, SessionStore};

/// Options recognised by [`QueryBinding`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Fetch automatically on bind, whenever the URL changes and after every
    /// login or logout.
    pub immediate: bool,
    /// Method override and extra headers.
    pub fetch_options: FetchOptions,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            immediate: true,
            fetch_options: FetchOptions::default(),
        }
    }
}

impl QueryOptions {
    /// Options that never fetch on their own.
    #[must_use]
    pub fn manual() -> Self {
        Self {
            immediate: false,
            ..Self::default()
        }
    }
}

struct QueryInner<T> {
    executor: Arc<dyn RequestExecutor>,
    session: SessionStore,
    url: Mutex<String>,
    options: QueryOptions,
    flight: SingleFlight<T>,
    released: CancellationToken,
}

impl<T> QueryInner<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn start(&self) -> Option<(Attempt, HttpRequest)> {
        let attempt = self.flight.begin()?;
        let url = self.url.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let method = self.options.fetch_options.method.unwrap_or(HttpMethod::Get);
        let mut request = HttpRequest::new(method, url);
        request.headers = authorised_headers(&self.options.fetch_options.headers, &self.session);
        Some((attempt, request))
    }

    async fn run(&self, attempt: Attempt, request: HttpRequest) -> Result<T, RequestError> {
        debug!(method = %request.method, url = %request.url, "query attempt started");
        let outcome = self
            .executor
            .execute(request, attempt.token())
            .await
            .and_then(HttpResponse::decode::<T>);
        self.flight.settle(&attempt, outcome)
    }

    fn spawn_fetch(self: &Arc<Self>, handle: &Handle) {
        let Some((attempt, request)) = self.start() else {
            return;
        };
        let inner = Arc::clone(self);
        handle.spawn(async move {
            // Outcome is published through the state channel.
            inner.run(attempt, request).await.ok();
        });
    }
}

/// Subscribe-on-bind query against one URL.
///
/// Dropping the binding unbinds it: in-flight work is cancelled and no state
/// is written afterwards.
pub struct QueryBinding<T> {
    inner: Arc<QueryInner<T>>,
}

impl<T> QueryBinding<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Bind `url`, fetching straight away when `options.immediate` is set.
    ///
    /// Automatic fetches are spawned on the current Tokio runtime; outside a
    /// runtime they are skipped and only [`QueryBinding::refetch`] issues
    /// requests.
    #[must_use]
    pub fn bind(
        executor: Arc<dyn RequestExecutor>,
        session: SessionStore,
        url: impl Into<String>,
        options: QueryOptions,
    ) -> Self {
        let binding = Self {
            inner: Arc::new(QueryInner {
                executor,
                session,
                url: Mutex::new(url.into()),
                options,
                flight: SingleFlight::new(),
                released: CancellationToken::new(),
            }),
        };
        if binding.inner.options.immediate {
            binding.trigger();
            binding.follow_session();
        }
        binding
    }

    /// Point the binding at a new URL.
    ///
    /// Returns whether the URL changed. A change re-fetches when the binding
    /// is immediate, superseding any in-flight request.
    #[must_use]
    pub fn set_url(&self, url: impl Into<String>) -> bool {
        let next = url.into();
        {
            let mut current = self.inner.url.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == next {
                return false;
            }
            *current = next;
        }
        if self.inner.options.immediate {
            self.trigger();
        }
        true
    }

    /// Current URL.
    #[must_use]
    pub fn url(&self) -> String {
        self.inner
            .url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Issue a fetch now and wait for it.
    ///
    /// Returns the decoded payload, or `None` on failure, cancellation,
    /// supersession or after unbind.
    pub async fn refetch(&self) -> Option<T> {
        self.try_refetch().await.ok()
    }

    /// [`QueryBinding::refetch`] that reports why no payload was produced.
    ///
    /// Superseded and unbound attempts report [`RequestError::Cancelled`].
    pub async fn try_refetch(&self) -> Result<T, RequestError> {
        let (attempt, request) = self.inner.start().ok_or(RequestError::Cancelled)?;
        self.inner.run(attempt, request).await
    }

    /// Cancel the in-flight fetch without touching `data` or `error`.
    pub fn cancel(&self) {
        self.inner.flight.cancel();
    }

    /// Cancel in-flight work and stop all future state writes.
    pub fn unbind(&self) {
        self.inner.released.cancel();
        self.inner.flight.unbind();
    }

    /// Whether [`QueryBinding::unbind`] has not been called yet.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.flight.is_bound()
    }

    /// Snapshot of the request state.
    #[must_use]
    pub fn state(&self) -> RequestState<T> {
        self.inner.flight.snapshot()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.inner.flight.subscribe()
    }

    /// Last successful payload.
    #[must_use]
    pub fn data(&self) -> Option<T> {
        self.state().data
    }

    /// Latest error message.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state().error
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.state().loading
    }

    fn trigger(&self) {
        let Ok(handle) = Handle::try_current() else {
            warn!(url = %self.url(), "no async runtime; skipping automatic fetch");
            return;
        };
        self.inner.spawn_fetch(&handle);
    }

    /// Re-fetch on every credential change until the binding is released.
    fn follow_session(&self) {
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let mut changes = self.inner.session.changes();
        let inner = Arc::clone(&self.inner);
        let fetches = handle.clone();
        handle.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = inner.released.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        debug!("session changed; re-fetching query");
                        inner.spawn_fetch(&fetches);
                    }
                }
            }
        });
    }
}

impl<T> Drop for QueryBinding<T> {
    fn drop(&mut self) {
        self.inner.released.cancel();
        self.inner.flight.unbind();
    }
}
