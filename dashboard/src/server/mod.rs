//! Edge server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::body::{BoxBody, EitherBody};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use crate::domain::ports::IdentityVerifier;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::pages;
use crate::inbound::http::proxy::{self, ProxyState};
use crate::inbound::http::session_guard::SessionGuard;

/// Shared state cloned into every worker's [`App`].
#[derive(Clone)]
pub struct AppDependencies {
    /// Readiness and liveness flags.
    pub health_state: web::Data<HealthState>,
    /// Upstream client and API base for the `/api` passthrough.
    pub proxy: web::Data<ProxyState>,
    /// Remote identity check used by the session guard.
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppDependencies {
    /// Derive the per-app dependencies from a server configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig, health_state: web::Data<HealthState>) -> Self {
        Self {
            health_state,
            proxy: web::Data::new(ProxyState::new(
                config.client.clone(),
                config.api_base.clone(),
            )),
            verifier: Arc::clone(&config.verifier),
        }
    }
}

/// Assemble the edge application: the session guard wraps every route, the
/// guard itself skips `/api` and static assets.
#[must_use]
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<EitherBody<BoxBody>>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        proxy,
        verifier,
    } = deps;

    App::new()
        .app_data(health_state)
        .app_data(proxy)
        .wrap(SessionGuard::new(verifier))
        .service(ready)
        .service(live)
        .configure(proxy::configure)
        .service(pages::root)
        .service(pages::login)
        .service(pages::sign_up)
        .service(pages::home)
        .service(pages::group)
        .service(pages::profile)
}

/// Construct an Actix HTTP server using the provided health state and
/// configuration.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let deps = AppDependencies::from_config(&config, health_state.clone());
    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(config.bind_addr)?
        .run();

    health_state.mark_ready();
    Ok(server)
}
