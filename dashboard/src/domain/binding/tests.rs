//! Tests for the query and mutation bindings.

use std::collections::BTreeMap;
use std::sync::Arc;

use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::http::{CONTENT_TYPE_HEADER, FormData, HttpResponse, RequestBody};
use crate::domain::ports::{MockRequestExecutor, RequestExecutor};
use crate::domain::schema::Envelope;
use crate::test_support::{
    ControlledExecutor, envelope, json_response, memory_session, sample_auth, signed_in_session,
    text_response,
};

fn manual_query(executor: Arc<dyn RequestExecutor>) -> QueryBinding<Envelope<String>> {
    QueryBinding::bind(executor, memory_session(), "/api/groups", QueryOptions::manual())
}

#[tokio::test]
async fn rapid_refetches_keep_only_the_last_result() {
    let executor = ControlledExecutor::new(false);
    let binding = manual_query(executor.clone());

    let (first, second, ()) = tokio::join!(binding.refetch(), binding.refetch(), async {
        executor.wait_for_calls(2).await;
        executor.release(1, Ok(envelope(json!("second"))));
        executor.release(0, Ok(envelope(json!("first"))));
    });

    assert!(first.is_none(), "superseded attempt must not report data");
    assert_eq!(second.map(Envelope::into_inner).as_deref(), Some("second"));
    let state = binding.state();
    assert_eq!(state.data.map(Envelope::into_inner).as_deref(), Some("second"));
    assert!(state.error.is_none());
    assert!(!state.loading);
}

#[tokio::test]
async fn superseded_failure_does_not_overwrite_error_state() {
    let executor = ControlledExecutor::new(false);
    let binding = manual_query(executor.clone());

    tokio::join!(binding.refetch(), binding.refetch(), async {
        executor.wait_for_calls(2).await;
        executor.release(1, Ok(envelope(json!("fresh"))));
        executor.release(0, Ok(json_response(500, json!({ "message": "stale" }))));
    });

    assert_eq!(binding.error(), None);
    assert_eq!(binding.data().map(Envelope::into_inner).as_deref(), Some("fresh"));
}

#[rstest]
#[case::structured_message(json_response(400, json!({ "message": "X" })), "X")]
#[case::plain_text(text_response(500, "Y"), "Y")]
#[case::empty_text(text_response(502, ""), "Request failed with 502")]
#[tokio::test]
async fn failures_surface_a_single_message(#[case] response: HttpResponse, #[case] expected: &str) {
    let mut executor = MockRequestExecutor::new();
    executor
        .expect_execute()
        .times(1)
        .return_once(move |_, _| Ok(response));
    let binding = manual_query(Arc::new(executor));

    assert!(binding.refetch().await.is_none());

    let state = binding.state();
    assert_eq!(state.error.as_deref(), Some(expected));
    assert!(state.data.is_none());
    assert!(!state.loading);
}

#[tokio::test]
async fn a_new_attempt_clears_the_previous_error() {
    let mut executor = MockRequestExecutor::new();
    let mut responses = vec![
        envelope(json!("recovered")),
        json_response(500, json!({ "message": "down" })),
    ];
    executor
        .expect_execute()
        .times(2)
        .returning(move |_, _| Ok(responses.pop().expect("scripted response")));
    let binding = manual_query(Arc::new(executor));

    binding.refetch().await;
    assert_eq!(binding.error().as_deref(), Some("down"));

    binding.refetch().await;
    assert_eq!(binding.error(), None);
    assert_eq!(binding.data().map(Envelope::into_inner).as_deref(), Some("recovered"));
}

#[tokio::test]
async fn cancel_leaves_no_error_and_clears_loading() {
    let executor = ControlledExecutor::new(true);
    let binding = manual_query(executor.clone());

    let (outcome, ()) = tokio::join!(binding.refetch(), async {
        executor.wait_for_calls(1).await;
        assert!(binding.loading());
        binding.cancel();
    });

    assert!(outcome.is_none());
    let state = binding.state();
    assert_eq!(state.error, None);
    assert_eq!(state.data, None);
    assert!(!state.loading);
}

#[tokio::test]
async fn try_refetch_reports_cancellation() {
    let executor = ControlledExecutor::new(true);
    let binding = manual_query(executor.clone());

    let (outcome, ()) = tokio::join!(binding.try_refetch(), async {
        executor.wait_for_calls(1).await;
        binding.cancel();
    });

    assert_eq!(outcome, Err(RequestError::Cancelled));
}

#[tokio::test]
async fn unbind_stops_state_writes() {
    let executor = ControlledExecutor::new(false);
    let binding = manual_query(executor.clone());

    let (outcome, ()) = tokio::join!(binding.refetch(), async {
        executor.wait_for_calls(1).await;
        binding.unbind();
        executor.release(0, Ok(envelope(json!("late"))));
    });

    assert!(outcome.is_none());
    assert!(!binding.is_bound());
    assert_eq!(binding.state(), RequestState::default());

    assert!(binding.refetch().await.is_none());
    assert_eq!(executor.requests().len(), 1, "unbound bindings never fetch");
}

#[tokio::test]
async fn attaches_the_session_credential() {
    let mut executor = MockRequestExecutor::new();
    executor
        .expect_execute()
        .withf(|request, _| request.headers.get("authorization") == Some("Bearer abc"))
        .times(1)
        .return_once(|_, _| Ok(envelope(json!("ok"))));
    let binding: QueryBinding<Envelope<String>> = QueryBinding::bind(
        Arc::new(executor),
        signed_in_session(),
        "/api/groups",
        QueryOptions::manual(),
    );

    assert!(binding.refetch().await.is_some());
}

#[tokio::test]
async fn omits_authorization_without_a_session() {
    let mut executor = MockRequestExecutor::new();
    executor
        .expect_execute()
        .withf(|request, _| !request.headers.contains("Authorization"))
        .times(1)
        .return_once(|_, _| Ok(envelope(json!("ok"))));
    let binding = manual_query(Arc::new(executor));

    assert!(binding.refetch().await.is_some());
}

#[tokio::test]
async fn passes_caller_headers_and_method_through() {
    let mut executor = MockRequestExecutor::new();
    executor
        .expect_execute()
        .withf(|request, _| {
            request.method == HttpMethod::Post && request.headers.get("X-Trace") == Some("1")
        })
        .times(1)
        .return_once(|_, _| Ok(envelope(json!("ok"))));
    let options = QueryOptions {
        immediate: false,
        fetch_options: FetchOptions {
            method: Some(HttpMethod::Post),
            headers: Headers::new().with("X-Trace", "1"),
        },
    };
    let binding: QueryBinding<Envelope<String>> =
        QueryBinding::bind(Arc::new(executor), memory_session(), "/api/search", options);

    assert!(binding.refetch().await.is_some());
}

#[tokio::test]
async fn immediate_binding_fetches_on_bind_and_url_change() {
    let mut executor = MockRequestExecutor::new();
    executor
        .expect_execute()
        .times(2)
        .returning(|request, _| Ok(envelope(Value::String(request.url))));
    let binding: QueryBinding<Envelope<String>> = QueryBinding::bind(
        Arc::new(executor),
        memory_session(),
        "/api/expenses/group/1",
        QueryOptions::default(),
    );
    let mut updates = binding.subscribe();

    updates
        .wait_for(|state| state.data.as_ref().is_some_and(|data| data.data.ends_with("/1")))
        .await
        .expect("binding alive");

    assert!(!binding.set_url("/api/expenses/group/1"), "unchanged URL is a no-op");
    assert!(binding.set_url("/api/expenses/group/2"));
    updates
        .wait_for(|state| state.data.as_ref().is_some_and(|data| data.data.ends_with("/2")))
        .await
        .expect("binding alive");
    assert_eq!(binding.url(), "/api/expenses/group/2");
}

#[test]
fn immediate_binding_without_runtime_waits_for_refetch() {
    let mut executor = MockRequestExecutor::new();
    executor.expect_execute().never();

    let binding: QueryBinding<Envelope<String>> = QueryBinding::bind(
        Arc::new(executor),
        memory_session(),
        "/api/groups",
        QueryOptions::default(),
    );

    assert!(!binding.loading());
}

#[tokio::test]
async fn immediate_binding_refetches_after_login_and_logout() {
    let executor = ControlledExecutor::new(true);
    let session = memory_session();
    let binding: QueryBinding<Envelope<String>> = QueryBinding::bind(
        executor.clone(),
        session.clone(),
        "/api/groups",
        QueryOptions::default(),
    );
    executor.wait_for_calls(1).await;

    session.set_auth(&sample_auth()).expect("set auth");
    executor.wait_for_calls(2).await;
    session.clear_auth().expect("clear auth");
    executor.wait_for_calls(3).await;

    let authorisation: Vec<Option<String>> = executor
        .requests()
        .iter()
        .map(|request| request.headers.get("authorization").map(str::to_owned))
        .collect();
    assert_eq!(authorisation, vec![None, Some("Bearer abc".to_owned()), None]);
    executor.release(2, Ok(envelope(json!("signed out"))));
    binding
        .subscribe()
        .wait_for(|state| !state.loading)
        .await
        .expect("binding alive");
    assert_eq!(binding.data().map(Envelope::into_inner).as_deref(), Some("signed out"));
}

#[tokio::test]
async fn released_bindings_ignore_session_changes() {
    let executor = ControlledExecutor::new(true);
    let session = memory_session();
    let binding: QueryBinding<Envelope<String>> = QueryBinding::bind(
        executor.clone(),
        session.clone(),
        "/api/groups",
        QueryOptions::default(),
    );
    executor.wait_for_calls(1).await;

    binding.unbind();
    session.set_auth(&sample_auth()).expect("set auth");
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }

    assert_eq!(executor.requests().len(), 1);
}

#[tokio::test]
async fn manual_bindings_ignore_session_changes() {
    let mut executor = MockRequestExecutor::new();
    executor.expect_execute().never();
    let session = memory_session();
    let binding: QueryBinding<Envelope<String>> = QueryBinding::bind(
        Arc::new(executor),
        session.clone(),
        "/api/groups",
        QueryOptions::manual(),
    );

    session.set_auth(&sample_auth()).expect("set auth");
    tokio::task::yield_now().await;

    assert!(!binding.loading());
}

#[tokio::test]
async fn dropping_a_binding_cancels_its_fetch() {
    let executor = ControlledExecutor::new(true);
    let binding: QueryBinding<Envelope<String>> = QueryBinding::bind(
        executor.clone(),
        memory_session(),
        "/api/groups",
        QueryOptions::default(),
    );
    let mut updates = binding.subscribe();
    executor.wait_for_calls(1).await;

    drop(binding);

    updates
        .wait_for(|state| !state.loading)
        .await
        .expect("sender kept alive by the spawned fetch");
}

fn mutation(
    executor: MockRequestExecutor,
    options: FetchOptions,
) -> MutationBinding<Value, Envelope<String>> {
    MutationBinding::with_options(
        Arc::new(executor),
        memory_session(),
        "/api/expenses",
        MutationMethod::Post,
        options,
    )
}

#[tokio::test]
async fn form_data_never_carries_a_json_content_type() {
    let mut executor = MockRequestExecutor::new();
    executor
        .expect_execute()
        .withf(|request, _| {
            !request.headers.contains(CONTENT_TYPE_HEADER)
                && matches!(request.body, RequestBody::Multipart(_))
        })
        .times(1)
        .return_once(|_, _| Ok(envelope(json!("uploaded"))));
    let options = FetchOptions::with_headers(
        Headers::new().with("content-type", "application/json"),
    );
    let binding = mutation(executor, options);
    let form = FormData::new()
        .text("description", "Dinner")
        .file("receipt", "r.png", Some("image/png".to_owned()), vec![1, 2, 3]);

    let result = binding.mutate(MutationPayload::FormData(form)).await;

    assert_eq!(result.map(Envelope::into_inner).as_deref(), Some("uploaded"));
}

#[tokio::test]
async fn json_payloads_default_the_content_type() {
    let mut executor = MockRequestExecutor::new();
    executor
        .expect_execute()
        .withf(|request, _| {
            request.method == HttpMethod::Post
                && request.headers.get(CONTENT_TYPE_HEADER) == Some("application/json")
                && request.body == RequestBody::Json(r#"{"amount":12.5}"#.to_owned())
        })
        .times(1)
        .return_once(|_, _| Ok(envelope(json!("created"))));
    let binding = mutation(executor, FetchOptions::default());

    let result = binding
        .mutate(MutationPayload::Json(json!({ "amount": 12.5 })))
        .await;

    assert!(result.is_some());
    assert_eq!(binding.error(), None);
}

#[tokio::test]
async fn caller_content_type_is_kept_for_json() {
    let mut executor = MockRequestExecutor::new();
    executor
        .expect_execute()
        .withf(|request, _| {
            request.headers.get(CONTENT_TYPE_HEADER) == Some("application/merge-patch+json")
                && request.method == HttpMethod::Patch
        })
        .times(1)
        .return_once(|_, _| Ok(envelope(json!("patched"))));
    let options = FetchOptions {
        method: Some(HttpMethod::Patch),
        headers: Headers::new().with("Content-Type", "application/merge-patch+json"),
    };
    let binding = mutation(executor, options);

    assert!(binding.mutate(MutationPayload::Empty).await.is_some());
}

#[tokio::test]
async fn mutation_failures_keep_status_and_message() {
    let mut executor = MockRequestExecutor::new();
    executor
        .expect_execute()
        .times(1)
        .return_once(|_, _| Ok(json_response(409, json!({ "message": "Email taken" }))));
    let binding = mutation(executor, FetchOptions::default());

    let outcome = binding.try_mutate(MutationPayload::Empty).await;

    assert_eq!(outcome, Err(RequestError::application(409, "Email taken")));
    assert_eq!(binding.error().as_deref(), Some("Email taken"));
    assert!(!binding.loading());
}

#[tokio::test]
async fn unencodable_payloads_fail_before_the_network() {
    let mut executor = MockRequestExecutor::new();
    executor.expect_execute().never();
    let binding: MutationBinding<BTreeMap<Vec<u8>, u8>, Value> = MutationBinding::new(
        Arc::new(executor),
        memory_session(),
        "/api/groups",
        MutationMethod::Post,
    );

    let outcome = binding
        .try_mutate(MutationPayload::Json(BTreeMap::from([(vec![1], 1)])))
        .await;

    assert!(matches!(outcome, Err(RequestError::Validation { .. })));
    assert!(binding.error().is_some());
}
