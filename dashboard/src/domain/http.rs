//! Transport-neutral request and response model used by the executor port.
//!
//! The executor returns every HTTP response as an [`HttpResponse`]; turning a
//! non-success status into a [`RequestError`] happens here so the message
//! derivation rules live in one place regardless of adapter.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::RequestError;

/// Content type marker for structured bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Header carrying the session credential.
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Header describing the request body encoding.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// HTTP verbs used by the bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// `GET`.
    #[default]
    Get,
    /// `POST`.
    Post,
    /// `PUT`.
    Put,
    /// `PATCH`.
    Patch,
    /// `DELETE`.
    Delete,
}

impl HttpMethod {
    /// Upper-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header list with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Create an empty header list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any existing value for `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let key = name.into();
        self.remove(&key);
        self.0.push((key, value.into()));
    }

    /// Builder-style [`Headers::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a header value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Drop every value for `name`.
    pub fn remove(&mut self, name: &str) {
        self.0.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of headers held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no headers are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// Plain text field.
    Text(String),
    /// Binary attachment.
    File {
        /// File name sent in the part header.
        file_name: String,
        /// Part content type, if known.
        mime_type: Option<String>,
        /// Raw file contents.
        bytes: Vec<u8>,
    },
}

/// Binary form payload sent as `multipart/form-data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    parts: Vec<(String, FormValue)>,
}

impl FormData {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormValue::Text(value.into())));
        self
    }

    /// Append a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormValue::File {
                file_name: file_name.into(),
                mime_type,
                bytes,
            },
        ));
        self
    }

    /// Fields in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[(String, FormValue)] {
        &self.parts
    }

    /// Consume the form, yielding its fields in insertion order.
    #[must_use]
    pub fn into_parts(self) -> Vec<(String, FormValue)> {
        self.parts
    }
}

/// Encoded request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Serialised JSON text.
    Json(String),
    /// Multipart form; the transport chooses the boundary.
    Multipart(FormData),
}

/// A fully prepared outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request verb.
    pub method: HttpMethod,
    /// Absolute or API-relative URL.
    pub url: String,
    /// Headers to send.
    pub headers: Headers,
    /// Encoded body.
    pub body: RequestBody,
}

impl HttpRequest {
    /// Body-less request.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: RequestBody::Empty,
        }
    }
}

/// Response body interpreted according to the declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Parsed structured body.
    Json(Value),
    /// Body treated as plain text.
    Text(String),
    /// Declared structured but did not parse.
    Malformed {
        /// Parser error.
        detail: String,
    },
}

impl ResponseBody {
    /// Interpret raw bytes given the response `Content-Type`.
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::ResponseBody;
    ///
    /// let body = ResponseBody::from_bytes(Some("application/json; charset=utf-8"), br#"{"a":1}"#);
    /// assert!(matches!(body, ResponseBody::Json(_)));
    /// let body = ResponseBody::from_bytes(Some("text/plain"), b"nope");
    /// assert_eq!(body, ResponseBody::Text("nope".to_owned()));
    /// ```
    #[must_use]
    pub fn from_bytes(content_type: Option<&str>, bytes: &[u8]) -> Self {
        if content_type.is_some_and(is_json_content_type) {
            match serde_json::from_slice(bytes) {
                Ok(value) => Self::Json(value),
                Err(error) => Self::Malformed {
                    detail: error.to_string(),
                },
            }
        } else {
            Self::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    /// Human-readable message for a failed response.
    ///
    /// Tries a string `message` field of a structured body, then the raw text
    /// body, then falls back to `Request failed with <status>`.
    #[must_use]
    pub fn failure_message(&self, status: u16) -> String {
        let derived = match self {
            Self::Json(Value::Object(fields)) => fields
                .get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty()),
            Self::Json(Value::String(text)) | Self::Text(text) => {
                Some(text.as_str()).filter(|text| !text.is_empty())
            }
            Self::Json(_) | Self::Malformed { .. } => None,
        };
        derived.map_or_else(|| format!("Request failed with {status}"), str::to_owned)
    }

    /// Decode the body into `T`.
    ///
    /// Text bodies decode as a JSON string so `String` and `Value` targets
    /// accept them.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, RequestError> {
        let value = match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
            Self::Malformed { detail } => return Err(RequestError::decode(detail)),
        };
        serde_json::from_value(value).map_err(|error| RequestError::decode(error.to_string()))
    }
}

/// Whether a content type names JSON.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains(JSON_CONTENT_TYPE)
}

/// Response as observed by the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded body.
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Construct a response.
    #[must_use]
    pub const fn new(status: u16, body: ResponseBody) -> Self {
        Self { status, body }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert a non-success status into [`RequestError::Application`].
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::{HttpResponse, RequestError, ResponseBody};
    /// use serde_json::json;
    ///
    /// let response = HttpResponse::new(400, ResponseBody::Json(json!({ "message": "X" })));
    /// assert_eq!(response.into_success(), Err(RequestError::application(400, "X")));
    /// ```
    pub fn into_success(self) -> Result<ResponseBody, RequestError> {
        if self.ok() {
            Ok(self.body)
        } else {
            let message = self.body.failure_message(self.status);
            Err(RequestError::application(self.status, message))
        }
    }

    /// Check the status and decode the body into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, RequestError> {
        self.into_success()?.decode()
    }
}
