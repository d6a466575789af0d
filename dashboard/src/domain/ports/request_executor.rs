//! Port for performing one cancellable HTTP exchange.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{HttpRequest, HttpResponse, RequestError};

/// Performs network I/O on behalf of the bindings.
///
/// Implementations return every HTTP response, success or not, as
/// `Ok(HttpResponse)`; status interpretation belongs to
/// [`HttpResponse::into_success`]. Errors are reserved for transport failures
/// and for [`RequestError::Cancelled`], which must be returned promptly once
/// `cancel` fires. No retries and no buffering beyond reading the body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Execute `request` unless `cancel` fires first.
    async fn execute(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, RequestError>;
}
