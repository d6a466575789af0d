//! Test utilities for the dashboard crate.
//!
//! Shared doubles for unit tests in `src/`. Only compiled for tests.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::domain::ports::RequestExecutor;
use crate::domain::{
    AuthData, HttpRequest, HttpResponse, Principal, RequestError, ResponseBody, SessionStore,
};
use crate::outbound::session_store::{MemoryCookieJar, MemoryStorage};

/// Session backed by in-memory cookies and storage.
pub(crate) fn memory_session() -> SessionStore {
    SessionStore::new(
        Arc::new(MemoryCookieJar::default()),
        Arc::new(MemoryStorage::default()),
    )
}

/// Session that already holds `sample_auth()`.
pub(crate) fn signed_in_session() -> SessionStore {
    let session = memory_session();
    session.set_auth(&sample_auth()).expect("memory session accepts auth");
    session
}

pub(crate) fn sample_principal() -> Principal {
    Principal {
        id: 7,
        email: "ada@example.com".to_owned(),
        name: "Ada".to_owned(),
        is_active: true,
        created_at: "2025-01-01T00:00:00Z".to_owned(),
    }
}

pub(crate) fn sample_auth() -> AuthData {
    AuthData {
        token: "abc".to_owned(),
        token_type: "Bearer".to_owned(),
        user: sample_principal(),
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(status, ResponseBody::Json(body))
}

pub(crate) fn text_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse::new(status, ResponseBody::Text(body.to_owned()))
}

/// `{ "data": value }` with status 200.
pub(crate) fn envelope(value: Value) -> HttpResponse {
    json_response(200, json!({ "data": value }))
}

type Outcome = Result<HttpResponse, RequestError>;

/// Executor whose calls block until the test releases them.
///
/// Each call is parked on its own channel so tests can settle attempts in any
/// order. With `honour_cancel` unset the executor ignores cancellation, which
/// models a transport that finishes after being superseded.
pub(crate) struct ControlledExecutor {
    honour_cancel: bool,
    requests: Mutex<Vec<HttpRequest>>,
    releases: Mutex<Vec<Option<oneshot::Sender<Outcome>>>>,
    calls: watch::Sender<usize>,
}

impl ControlledExecutor {
    pub(crate) fn new(honour_cancel: bool) -> Arc<Self> {
        let (calls, _) = watch::channel(0);
        Arc::new(Self {
            honour_cancel,
            requests: Mutex::new(Vec::new()),
            releases: Mutex::new(Vec::new()),
            calls,
        })
    }

    /// Wait until at least `count` calls have arrived.
    pub(crate) async fn wait_for_calls(&self, count: usize) {
        let mut calls = self.calls.subscribe();
        calls
            .wait_for(|seen| *seen >= count)
            .await
            .expect("executor outlives the test");
    }

    /// Settle call `index` with `outcome`.
    pub(crate) fn release(&self, index: usize, outcome: Outcome) {
        let sender = self
            .releases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(index)
            .and_then(Option::take)
            .expect("call was recorded and not yet released");
        // The caller may already have given up on a cancelled attempt.
        sender.send(outcome).ok();
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RequestExecutor for ControlledExecutor {
    async fn execute(&self, request: HttpRequest, cancel: CancellationToken) -> Outcome {
        let (sender, receiver) = oneshot::channel();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.releases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Some(sender));
        self.calls.send_modify(|seen| *seen += 1);

        if self.honour_cancel {
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(RequestError::Cancelled),
                outcome = receiver => outcome.unwrap_or(Err(RequestError::Cancelled)),
            }
        } else {
            receiver.await.unwrap_or(Err(RequestError::Cancelled))
        }
    }
}
