//! Edge middleware gating page navigations on a verified session.
//!
//! The guard reads the `auth_token` and `auth_token_type` cookies, asks the
//! identity endpoint whether the credential is still good and then either
//! forwards the request or answers with a `307 Temporary Redirect`. Verification
//! failures of any kind resolve to the login page and never reach the browser
//! as error detail.

use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{CACHE_CONTROL, LOCATION};
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{debug, warn};

use crate::domain::Credential;
use crate::domain::guard::{
    GuardDecision, RouteCategory, Verification, is_guarded_path, redirect_location,
};
use crate::domain::ports::IdentityVerifier;
use crate::domain::session::{TOKEN_COOKIE, TOKEN_TYPE_KEY};

/// Session guard middleware.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use actix_web::App;
/// use dashboard::inbound::http::session_guard::SessionGuard;
/// use dashboard::outbound::http::{HttpIdentityVerifier, identity_endpoint};
/// use url::Url;
///
/// let base = Url::parse("https://api.example.com").expect("valid URL");
/// let endpoint = identity_endpoint(&base).expect("joins");
/// let verifier = HttpIdentityVerifier::new(endpoint, Duration::from_secs(5)).expect("client");
/// let _app = App::new().wrap(SessionGuard::new(Arc::new(verifier)));
/// ```
#[derive(Clone)]
pub struct SessionGuard {
    verifier: Arc<dyn IdentityVerifier>,
}

impl SessionGuard {
    /// Guard verifying credentials with `verifier`.
    #[must_use]
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardMiddleware {
            service: Rc::new(service),
            verifier: Arc::clone(&self.verifier),
        }))
    }
}

/// Service wrapper produced by [`SessionGuard`].
pub struct SessionGuardMiddleware<S> {
    service: Rc<S>,
    verifier: Arc<dyn IdentityVerifier>,
}

impl<S, B> Service<ServiceRequest> for SessionGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !is_guarded_path(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let service = Rc::clone(&self.service);
        let verifier = Arc::clone(&self.verifier);
        Box::pin(async move {
            let path = req.path().to_owned();
            let category = RouteCategory::classify(&path);
            let credential = credential_from_cookies(&req);
            let verification = match &credential {
                None => Verification::NotChecked,
                Some(found) => match verifier.verify(found).await {
                    Ok(()) => Verification::Valid,
                    Err(error) => {
                        warn!(%error, %path, "session credential failed verification");
                        Verification::Invalid
                    }
                },
            };

            let decision = GuardDecision::decide(credential.is_some(), verification, category);
            debug!(
                %path,
                category = category.as_str(),
                outcome = decision.label(),
                "session guard decision"
            );

            match decision {
                GuardDecision::Allow => service
                    .call(req)
                    .await
                    .map(ServiceResponse::map_into_left_body),
                GuardDecision::Redirect(page) => {
                    let location = redirect_location(page, req.query_string());
                    let response = HttpResponse::TemporaryRedirect()
                        .insert_header((LOCATION, location))
                        .insert_header((CACHE_CONTROL, "no-store"))
                        .finish()
                        .map_into_right_body();
                    Ok(req.into_response(response))
                }
            }
        })
    }
}

fn credential_from_cookies(req: &ServiceRequest) -> Option<Credential> {
    let token = req.cookie(TOKEN_COOKIE);
    let token_type = req.cookie(TOKEN_TYPE_KEY);
    Credential::from_cookies(
        token.as_ref().map(|cookie| cookie.value()),
        token_type.as_ref().map(|cookie| cookie.value()),
    )
}
