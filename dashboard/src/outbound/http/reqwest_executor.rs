//! Reqwest implementation of the request executor port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Url};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::map_transport_message;
use crate::domain::ports::RequestExecutor;
use crate::domain::{
    FormData, FormValue, HttpMethod, HttpRequest, HttpResponse, RequestBody, RequestError,
    ResponseBody,
};

/// Executor that performs requests with a shared reqwest client.
///
/// Relative URLs such as `/api/groups` are resolved against the optional base
/// URL; absolute URLs are used as given.
pub struct ReqwestExecutor {
    client: Client,
    base_url: Option<Url>,
}

impl ReqwestExecutor {
    /// Build an executor with an explicit request timeout and no base URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Build an executor resolving relative URLs against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut executor = Self::new(timeout)?;
        executor.base_url = Some(base_url);
        Ok(executor)
    }

    fn resolve(&self, raw: &str) -> Result<Url, RequestError> {
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or_else(|| {
                    RequestError::validation(format!("relative URL without a base: {raw}"))
                })?;
                base.join(raw)
                    .map_err(|error| RequestError::validation(format!("invalid URL {raw}: {error}")))
            }
            Err(error) => Err(RequestError::validation(format!(
                "invalid URL {raw}: {error}"
            ))),
        }
    }

    fn build(&self, url: Url, request: HttpRequest) -> Result<RequestBuilder, RequestError> {
        let mut builder = self.client.request(map_method(request.method), url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        let prepared = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(text) => builder.body(text),
            RequestBody::Multipart(form) => builder.multipart(to_multipart(form)?),
        };
        Ok(prepared)
    }
}

#[async_trait]
impl RequestExecutor for ReqwestExecutor {
    async fn execute(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, RequestError> {
        if cancel.is_cancelled() {
            return Err(RequestError::Cancelled);
        }
        let url = self.resolve(&request.url)?;
        debug!(method = %request.method, %url, "sending request");
        let builder = self.build(url, request)?;

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RequestError::Cancelled),
            outcome = send(builder) => outcome,
        }
    }
}

async fn send(builder: RequestBuilder) -> Result<HttpResponse, RequestError> {
    let response = builder.send().await.map_err(map_transport_error)?;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = response.bytes().await.map_err(map_transport_error)?;
    Ok(HttpResponse::new(
        status,
        ResponseBody::from_bytes(content_type.as_deref(), body.as_ref()),
    ))
}

fn map_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn to_multipart(form: FormData) -> Result<Form, RequestError> {
    form.into_parts()
        .into_iter()
        .try_fold(Form::new(), |multipart, (name, value)| match value {
            FormValue::Text(text) => Ok(multipart.text(name, text)),
            FormValue::File {
                file_name,
                mime_type,
                bytes,
            } => {
                let part = Part::bytes(bytes).file_name(file_name);
                let typed = match mime_type {
                    Some(mime) => part.mime_str(&mime).map_err(|error| {
                        RequestError::validation(format!("invalid MIME type {mime}: {error}"))
                    })?,
                    None => part,
                };
                Ok(multipart.part(name, typed))
            }
        })
}

fn map_transport_error(error: reqwest::Error) -> RequestError {
    RequestError::transport(map_transport_message(&error))
}
