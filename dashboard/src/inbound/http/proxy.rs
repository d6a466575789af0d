//! `/api/*` passthrough to the remote API.
//!
//! Browser code calls relative `/api/...` URLs on the edge host. Each request
//! is replayed against the configured API base with its method, query, body
//! and end-to-end headers intact, and the upstream answer is relayed as is.

use actix_web::http::StatusCode;
use actix_web::http::header::HeaderName;
use actix_web::{HttpRequest, HttpResponse, web};
use reqwest::{Client, Method, Url};
use serde_json::json;
use tracing::{debug, warn};

/// Headers that describe one connection rather than the message.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(name))
}

/// Upstream client and API base shared by every worker.
#[derive(Clone)]
pub struct ProxyState {
    client: Client,
    api_base: Url,
}

impl ProxyState {
    /// Forward to `api_base` with `client`.
    #[must_use]
    pub const fn new(client: Client, api_base: Url) -> Self {
        Self { client, api_base }
    }

    /// Upstream URL for an inbound path and query.
    fn target(&self, path: &str, query: &str) -> Result<Url, url::ParseError> {
        let mut target = self.api_base.join(path)?;
        target.set_query((!query.is_empty()).then_some(query));
        Ok(target)
    }
}

/// Register the passthrough under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/{tail:.*}").to(forward));
}

/// Replay the request upstream and relay the answer.
///
/// Upstream failures become `502 Bad Gateway` with a JSON `message`.
pub async fn forward(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<ProxyState>,
) -> HttpResponse {
    let target = match state.target(req.path(), req.query_string()) {
        Ok(url) => url,
        Err(error) => return bad_gateway(&format!("invalid upstream URL: {error}")),
    };
    let Ok(method) = Method::from_bytes(req.method().as_str().as_bytes()) else {
        return bad_gateway("unsupported method");
    };

    let mut upstream = state.client.request(method, target.clone());
    for (name, value) in req
        .headers()
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
    {
        upstream = upstream.header(name.as_str(), value.as_bytes());
    }
    if !body.is_empty() {
        upstream = upstream.body(body.to_vec());
    }

    let response = match upstream.send().await {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, url = %target, "upstream request failed");
            return bad_gateway("upstream unavailable");
        }
    };
    let status = response.status().as_u16();
    debug!(method = %req.method(), url = %target, status, "proxied request");

    let Ok(relayed_status) = StatusCode::from_u16(status) else {
        return bad_gateway("invalid upstream status");
    };
    let mut relayed = HttpResponse::build(relayed_status);
    for (name, value) in response
        .headers()
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
    {
        if let Ok(header_name) = HeaderName::from_bytes(name.as_str().as_bytes()) {
            relayed.append_header((header_name, value.as_bytes().to_vec()));
        }
    }
    match response.bytes().await {
        Ok(bytes) => relayed.body(bytes.to_vec()),
        Err(error) => {
            warn!(%error, url = %target, "upstream body could not be read");
            bad_gateway("upstream body unreadable")
        }
    }
}

fn bad_gateway(message: &str) -> HttpResponse {
    HttpResponse::BadGateway().json(json!({ "message": message }))
}
