//! Write binding: an explicitly invoked command against one endpoint.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::info;

use super::{FetchOptions, RequestState, SingleFlight, authorised_headers};
use crate::domain::http::{
    CONTENT_TYPE_HEADER, FormData, Headers, HttpMethod, HttpRequest, HttpResponse,
    JSON_CONTENT_TYPE, RequestBody,
};
use crate::domain::ports::RequestExecutor;
use crate::domain::{RequestError, SessionStore};

/// Verbs a mutation may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationMethod {
    /// `POST`.
    Post,
    /// `PUT`.
    Put,
    /// `PATCH`.
    Patch,
    /// `DELETE`.
    Delete,
}

impl From<MutationMethod> for HttpMethod {
    fn from(value: MutationMethod) -> Self {
        match value {
            MutationMethod::Post => Self::Post,
            MutationMethod::Put => Self::Put,
            MutationMethod::Patch => Self::Patch,
            MutationMethod::Delete => Self::Delete,
        }
    }
}

/// Payload handed to [`MutationBinding::mutate`].
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPayload<P> {
    /// Serialised as JSON.
    Json(P),
    /// Sent as multipart form data with a transport-chosen boundary.
    FormData(FormData),
    /// Empty body.
    Empty,
}

/// Command binding against a fixed endpoint and verb.
pub struct MutationBinding<P, R> {
    executor: Arc<dyn RequestExecutor>,
    session: SessionStore,
    url: String,
    method: MutationMethod,
    options: FetchOptions,
    flight: SingleFlight<R>,
    payload: PhantomData<fn(P)>,
}

impl<P, R> MutationBinding<P, R>
where
    P: Serialize,
    R: DeserializeOwned + Clone,
{
    /// Bind an endpoint; nothing is sent until [`MutationBinding::mutate`].
    #[must_use]
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        session: SessionStore,
        url: impl Into<String>,
        method: MutationMethod,
    ) -> Self {
        Self::with_options(executor, session, url, method, FetchOptions::default())
    }

    /// Bind an endpoint with pass-through request options.
    #[must_use]
    pub fn with_options(
        executor: Arc<dyn RequestExecutor>,
        session: SessionStore,
        url: impl Into<String>,
        method: MutationMethod,
        options: FetchOptions,
    ) -> Self {
        Self {
            executor,
            session,
            url: url.into(),
            method,
            options,
            flight: SingleFlight::new(),
            payload: PhantomData,
        }
    }

    /// Send `payload`, superseding any in-flight mutation on this binding.
    ///
    /// Returns the decoded result, or `None` on failure or cancellation; the
    /// failure message is available through [`MutationBinding::error`].
    pub async fn mutate(&self, payload: MutationPayload<P>) -> Option<R> {
        self.try_mutate(payload).await.ok()
    }

    /// [`MutationBinding::mutate`] that reports why no result was produced.
    pub async fn try_mutate(&self, payload: MutationPayload<P>) -> Result<R, RequestError> {
        let attempt = self.flight.begin().ok_or(RequestError::Cancelled)?;
        let outcome = match self.prepare(payload) {
            Ok(request) => {
                let method = request.method;
                info!(%method, url = %self.url, "mutation request");
                let result = self.executor.execute(request, attempt.token()).await;
                if let Ok(response) = &result {
                    info!(
                        %method,
                        url = %self.url,
                        status = response.status,
                        ok = response.ok(),
                        "mutation response"
                    );
                }
                result.and_then(HttpResponse::decode::<R>)
            }
            Err(error) => Err(error),
        };
        self.flight.settle(&attempt, outcome)
    }

    /// Cancel the in-flight mutation without touching `data` or `error`.
    pub fn cancel(&self) {
        self.flight.cancel();
    }

    /// Snapshot of the request state.
    #[must_use]
    pub fn state(&self) -> RequestState<R> {
        self.flight.snapshot()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RequestState<R>> {
        self.flight.subscribe()
    }

    /// Last successful result.
    #[must_use]
    pub fn data(&self) -> Option<R> {
        self.state().data
    }

    /// Latest error message.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state().error
    }

    /// Whether a mutation is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.state().loading
    }

    /// Target endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn prepare(&self, payload: MutationPayload<P>) -> Result<HttpRequest, RequestError> {
        let mut headers = authorised_headers(&self.options.headers, &self.session);
        let body = match payload {
            MutationPayload::FormData(form) => {
                headers.remove(CONTENT_TYPE_HEADER);
                RequestBody::Multipart(form)
            }
            MutationPayload::Json(value) => {
                default_json_content_type(&mut headers);
                let text = serde_json::to_string(&value).map_err(|error| {
                    RequestError::validation(format!("payload could not be encoded: {error}"))
                })?;
                RequestBody::Json(text)
            }
            MutationPayload::Empty => {
                default_json_content_type(&mut headers);
                RequestBody::Empty
            }
        };
        let method = self.options.method.unwrap_or_else(|| self.method.into());
        Ok(HttpRequest {
            method,
            url: self.url.clone(),
            headers,
            body,
        })
    }
}

fn default_json_content_type(headers: &mut Headers) {
    if !headers.contains(CONTENT_TYPE_HEADER) {
        headers.set(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE);
    }
}
