//! Behavioural tests for the session guard wired into the edge application.
//!
//! The harness owns a single-threaded Tokio runtime plus a `LocalSet` because
//! Actix uses `spawn_local` internally. The identity endpoint and the `/api`
//! upstream are a shared wiremock server.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::http::header::LOCATION;
use actix_web::test as actix_test;
use actix_web::web;
use dashboard::inbound::http::health::HealthState;
use dashboard::inbound::http::proxy::ProxyState;
use dashboard::outbound::http::{HttpIdentityVerifier, identity_endpoint};
use dashboard::server::{AppDependencies, build_app};
use reqwest::{Client, Url};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;
use tokio::task::LocalSet;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IDENTITY_PATH: &str = "/api/auth/me";
const UNREACHABLE: &str = "http://127.0.0.1:9";

struct GuardWorld {
    upstream: MockServer,
    api_base: Url,
    token: Option<&'static str>,
    last_status: Option<u16>,
    last_location: Option<String>,
    local: LocalSet,
    runtime: Runtime,
}

impl GuardWorld {
    fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.local.block_on(&self.runtime, future)
    }

    fn mount_identity(&self, status: u16) {
        self.block_on(
            Mock::given(method("GET"))
                .and(path(IDENTITY_PATH))
                .respond_with(ResponseTemplate::new(status))
                .mount(&self.upstream),
        );
    }

    fn identity_calls(&self) -> usize {
        self.block_on(self.upstream.received_requests())
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == IDENTITY_PATH)
            .count()
    }
}

struct WorldFixture {
    world: RefCell<GuardWorld>,
}

#[fixture]
fn world() -> WorldFixture {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    let local = LocalSet::new();
    let upstream = local.block_on(&runtime, MockServer::start());
    let api_base = Url::parse(&upstream.uri()).expect("mock server URI");
    WorldFixture {
        world: RefCell::new(GuardWorld {
            upstream,
            api_base,
            token: None,
            last_status: None,
            last_location: None,
            local,
            runtime,
        }),
    }
}

#[given("the browser holds no session")]
fn the_browser_holds_no_session(world: &WorldFixture) {
    world.world.borrow_mut().token = None;
}

#[given("the browser holds a session token")]
fn the_browser_holds_a_session_token(world: &WorldFixture) {
    world.world.borrow_mut().token = Some("abc");
}

#[given("the identity endpoint accepts the session")]
fn the_identity_endpoint_accepts_the_session(world: &WorldFixture) {
    world.world.borrow().mount_identity(200);
}

#[given("the identity endpoint rejects the session")]
fn the_identity_endpoint_rejects_the_session(world: &WorldFixture) {
    world.world.borrow().mount_identity(401);
}

#[given("the identity endpoint is unreachable")]
fn the_identity_endpoint_is_unreachable(world: &WorldFixture) {
    world.world.borrow_mut().api_base = Url::parse(UNREACHABLE).expect("valid URL");
}

#[when("the browser navigates to {target}")]
fn the_browser_navigates_to(world: &WorldFixture, target: String) {
    let uri = target.trim_matches('"').to_owned();
    let mut ctx = world.world.borrow_mut();
    let api_base = ctx.api_base.clone();
    let token = ctx.token;
    let (status, location) = ctx.block_on(async move {
        let endpoint = identity_endpoint(&api_base).expect("endpoint joins");
        let verifier =
            HttpIdentityVerifier::new(endpoint, Duration::from_secs(2)).expect("client builds");
        let deps = AppDependencies {
            health_state: web::Data::new(HealthState::new()),
            proxy: web::Data::new(ProxyState::new(Client::new(), api_base)),
            verifier: Arc::new(verifier),
        };
        let app = actix_test::init_service(build_app(deps)).await;
        let mut request = actix_test::TestRequest::get().uri(&uri);
        if let Some(value) = token {
            request = request.cookie(Cookie::new("auth_token", value));
        }
        let response = actix_test::call_service(&app, request.to_request()).await;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        (response.status().as_u16(), location)
    });
    ctx.last_status = Some(status);
    ctx.last_location = location;
}

#[then("the browser is redirected to {target}")]
fn the_browser_is_redirected_to(world: &WorldFixture, target: String) {
    let ctx = world.world.borrow();
    assert_eq!(ctx.last_status, Some(307));
    assert_eq!(ctx.last_location.as_deref(), Some(target.trim_matches('"')));
}

#[then("the page is served")]
fn the_page_is_served(world: &WorldFixture) {
    let ctx = world.world.borrow();
    assert_eq!(ctx.last_status, Some(200));
}

#[then("the identity endpoint was not consulted")]
fn the_identity_endpoint_was_not_consulted(world: &WorldFixture) {
    assert_eq!(world.world.borrow().identity_calls(), 0);
}

#[scenario(
    path = "tests/features/session_guard.feature",
    name = "Anonymous visitors are sent to the login page"
)]
fn anonymous_visitors_are_sent_to_the_login_page(world: WorldFixture) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_guard.feature",
    name = "Anonymous visitors may open the login page"
)]
fn anonymous_visitors_may_open_the_login_page(world: WorldFixture) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_guard.feature",
    name = "Verified sessions reach the dashboard"
)]
fn verified_sessions_reach_the_dashboard(world: WorldFixture) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_guard.feature",
    name = "Verified sessions skip onboarding"
)]
fn verified_sessions_skip_onboarding(world: WorldFixture) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_guard.feature",
    name = "Rejected sessions go back to login"
)]
fn rejected_sessions_go_back_to_login(world: WorldFixture) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_guard.feature",
    name = "An unreachable identity endpoint fails closed"
)]
fn an_unreachable_identity_endpoint_fails_closed(world: WorldFixture) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_guard.feature",
    name = "The API passthrough is never gated"
)]
fn the_api_passthrough_is_never_gated(world: WorldFixture) {
    drop(world);
}
