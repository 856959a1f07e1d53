//! Error types for sluice.
//!
//! Failures tied to a received response are [`ResponseError`] values: one
//! tagged type parameterized by an [`ErrorKind`], holding a shared handle on
//! the response that raised it. Everything else (transport, configuration,
//! serialization) is a plain [`Error`] variant.
//!
//! At the outward boundary, [`Error::render`] turns any error into the
//! minimal `{message, errors?}` payload plus a status code.

use bytes::Bytes;
use derive_more::{Display, Error, From};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::{ErrorKind, Family, SharedResponse};

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for sluice operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Mapped status, decoding or unsupported-operation failure.
    #[display("{_0}")]
    #[from]
    Response(Box<ResponseError>),

    /// Network/connection or body read errors, raised by the transport.
    #[display("transport error: {_0}")]
    #[from(skip)]
    Transport(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// The requested info field does not exist.
    #[display("unknown info field: {_0}")]
    #[from(skip)]
    UnknownInfoField(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl From<ResponseError> for Error {
    fn from(err: ResponseError) -> Self {
        Self::Response(Box::new(err))
    }
}

impl Error {
    /// Create a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The response failure, if this error was raised by a response.
    #[must_use]
    pub fn as_response_error(&self) -> Option<&ResponseError> {
        match self {
            Self::Response(err) => Some(err),
            _ => None,
        }
    }

    /// The failure kind, if this error was raised by a response.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.as_response_error().map(ResponseError::kind)
    }

    /// The failure family, if this error was raised by a response.
    #[must_use]
    pub fn family(&self) -> Option<Family> {
        self.kind().map(ErrorKind::family)
    }

    /// Returns the HTTP status code of the response that raised this error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.as_response_error().map(ResponseError::status)
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this is a redirection failure (3xx).
    #[must_use]
    pub fn is_redirection(&self) -> bool {
        self.family() == Some(Family::Redirection)
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.family() == Some(Family::ClientError)
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.family() == Some(Family::ServerError)
    }

    /// Returns `true` if this is a decoding failure.
    #[must_use]
    pub fn is_decoding(&self) -> bool {
        self.family() == Some(Family::Decoding)
    }

    /// Returns `true` if this is a 404 Not Found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NotFound)
    }

    /// Outward-facing payload and status for this error.
    ///
    /// Failures that were not raised by a response render as a message-only
    /// `500` so no internal detail leaks.
    #[must_use]
    pub fn render(&self) -> RenderedError {
        match self {
            Self::Response(err) => err.render(),
            _ => RenderedError::internal(),
        }
    }

    /// Log this error with its diagnostic context.
    pub fn report(&self) {
        match self {
            Self::Response(err) => err.report(),
            other => warn!(error = %other, "request failed"),
        }
    }
}

// ============================================================================
// Response Error
// ============================================================================

/// A failure raised by a response accessor.
#[derive(Debug, Display)]
#[display("{message}")]
pub struct ResponseError {
    kind: ErrorKind,
    message: String,
    response: SharedResponse,
    source: Option<serde_json::Error>,
}

impl std::error::Error for ResponseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl ResponseError {
    pub(crate) fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        response: SharedResponse,
        source: Option<serde_json::Error>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            response,
            source,
        }
    }

    /// Failure kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Failure family.
    #[must_use]
    pub const fn family(&self) -> Family {
        self.kind.family()
    }

    /// Error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The response that raised this error.
    #[must_use]
    pub const fn response(&self) -> &SharedResponse {
        &self.response
    }

    /// Status code of the response, as it was when the error was raised.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.response.status()
    }

    /// The low-level parse failure of a decoding error.
    #[must_use]
    pub const fn parse_error(&self) -> Option<&serde_json::Error> {
        self.source.as_ref()
    }

    /// The `errors` collection of the body, or an empty array.
    #[must_use]
    pub fn errors(&self) -> Value {
        self.response
            .to_map()
            .remove("errors")
            .filter(|errors| !errors.is_null())
            .unwrap_or_else(|| Value::Array(Vec::new()))
    }

    /// Diagnostic context bundle.
    ///
    /// Always holds the raw content under `response`. Client errors add the
    /// `request` (method, URL, options); decoding errors add the
    /// `parse_error`.
    #[must_use]
    pub fn context(&self) -> Value {
        let mut context = Map::new();
        context.insert(
            "response".to_string(),
            Value::String(self.response.content().to_string()),
        );

        match self.family() {
            Family::ClientError => {
                let request = self.response.request();
                let mut details = Map::new();
                details.insert(
                    "method".to_string(),
                    Value::String(request.method().to_string()),
                );
                details.insert("url".to_string(), Value::String(request.url().to_string()));
                details.insert(
                    "options".to_string(),
                    Value::Object(request.options().as_map().clone()),
                );
                context.insert("request".to_string(), Value::Object(details));
            }
            Family::Decoding => {
                if let Some(parse_error) = &self.source {
                    context.insert(
                        "parse_error".to_string(),
                        Value::String(parse_error.to_string()),
                    );
                }
            }
            Family::Redirection | Family::ServerError | Family::UnsupportedOperation => {}
        }

        Value::Object(context)
    }

    /// Outward-facing payload and status.
    #[must_use]
    pub fn render(&self) -> RenderedError {
        if self.kind == ErrorKind::UnsupportedOperation {
            return RenderedError::internal();
        }
        RenderedError {
            status: self.status(),
            payload: ErrorPayload {
                message: self.message.clone(),
                errors: self.kind.carries_errors().then(|| self.errors()),
            },
        }
    }

    /// Log this error with its diagnostic context.
    pub fn report(&self) {
        let status = self.status();
        let kind = self.kind;
        let context = self.context();
        match self.family() {
            Family::Decoding => info!(status, ?kind, %context, "{}", self.message),
            Family::UnsupportedOperation => warn!(status, ?kind, "{}", self.message),
            family => error!(status, ?kind, %family, %context, "{}", self.message),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Body of an outward-facing error response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    /// Error message.
    pub message: String,
    /// Structured validation errors (`422` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

/// An error converted for the outward boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedError {
    /// HTTP status code to answer with.
    pub status: u16,
    /// JSON payload.
    pub payload: ErrorPayload,
}

impl RenderedError {
    /// Message-only `500` used for failures not mapped from a status.
    #[must_use]
    pub fn internal() -> Self {
        Self {
            status: 500,
            payload: ErrorPayload {
                message: "Internal Error".to_string(),
                errors: None,
            },
        }
    }

    /// The payload as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        // a string and an optional JSON value: serialization cannot fail
        serde_json::to_value(&self.payload).unwrap_or_default()
    }

    /// The payload serialized as JSON bytes.
    #[must_use]
    pub fn body(&self) -> Bytes {
        serde_json::to_vec(&self.payload)
            .map(Bytes::from)
            .unwrap_or_default()
    }

    /// Build an `application/json` HTTP response.
    ///
    /// A status outside the valid HTTP range is answered with `500`.
    #[must_use]
    pub fn into_http_response(self) -> http::Response<Bytes> {
        let status = http::StatusCode::from_u16(self.status)
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = http::Response::new(self.body());
        *response.status_mut() = status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static(crate::ContentType::Json.as_str()),
        );
        response
    }
}

impl From<RenderedError> for http::Response<Bytes> {
    fn from(rendered: RenderedError) -> Self {
        rendered.into_http_response()
    }
}

impl From<&Error> for RenderedError {
    fn from(err: &Error) -> Self {
        err.render()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;
    use crate::{Method, RequestContext, RequestOptions};

    fn shared(status: u16, content: &str) -> SharedResponse {
        let request = RequestContext::new(
            Method::Post,
            "https://api.example.com/users",
            RequestOptions::new().header("Accept", "application/json"),
        );
        SharedResponse::detached(request, status, content)
    }

    fn raise(kind: ErrorKind, status: u16, content: &str) -> ResponseError {
        ResponseError::new(kind, kind.default_message(status), shared(status, content), None)
    }

    #[test]
    fn error_display() {
        let err = Error::from(raise(ErrorKind::NotFound, 404, ""));
        check!(err.to_string() == "Server returned 404 Not Found");

        check!(Error::Timeout.to_string() == "request timeout");
        check!(Error::transport("refused").to_string() == "transport error: refused");
        check!(
            Error::json_deserialization("user.city", "missing field `city`").to_string()
                == "JSON deserialization error at 'user.city': missing field `city`"
        );
    }

    #[test]
    fn error_status_helpers() {
        let err = Error::from(raise(ErrorKind::NotFound, 404, ""));
        check!(err.status() == Some(404));
        check!(err.is_client_error());
        check!(err.is_not_found());
        check!(!err.is_server_error());

        let err = Error::from(raise(ErrorKind::ServerError, 598, ""));
        check!(err.is_server_error());
        check!(err.kind() == Some(ErrorKind::ServerError));

        check!(Error::Timeout.status().is_none());
        check!(Error::Timeout.is_timeout());
        check!(Error::transport("x").is_transport());
    }

    #[test]
    fn client_error_context_includes_request() {
        let err = raise(ErrorKind::Conflict, 409, "taken");
        let context = err.context();

        check!(context["response"] == json!("taken"));
        check!(context["request"]["method"] == json!("POST"));
        check!(context["request"]["url"] == json!("https://api.example.com/users"));
        check!(context["request"]["options"]["headers"]["Accept"] == json!("application/json"));
    }

    #[test]
    fn server_and_redirection_context_is_content_only() {
        for (kind, status) in [(ErrorKind::BadGateway, 502), (ErrorKind::Found, 302)] {
            let context = raise(kind, status, "body").context();
            check!(context == json!({"response": "body"}));
        }
    }

    #[test]
    fn decoding_context_includes_parse_error() {
        let parse_error = serde_json::from_str::<Value>("{oops").expect_err("invalid json");
        let err = ResponseError::new(
            ErrorKind::Decoding,
            ErrorKind::Decoding.default_message(200),
            shared(200, "{oops"),
            Some(parse_error),
        );

        let context = err.context();
        check!(context["response"] == json!("{oops"));
        check!(context["parse_error"].is_string());
        check!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn render_uses_response_status() {
        let rendered = Error::from(raise(ErrorKind::Forbidden, 403, "")).render();
        check!(rendered.status == 403);
        check!(rendered.to_value() == json!({"message": "Server returned 403 Forbidden"}));
    }

    #[test]
    fn render_unprocessable_entity_nests_errors() {
        let body = r#"{"message":"Validation failed","errors":{"field":["required"]}}"#;
        let err = ResponseError::new(
            ErrorKind::UnprocessableEntity,
            "Validation failed",
            shared(422, body),
            None,
        );

        let rendered = err.render();
        check!(rendered.status == 422);
        check!(
            rendered.to_value()
                == json!({"message": "Validation failed", "errors": {"field": ["required"]}})
        );
    }

    #[test]
    fn render_unprocessable_entity_defaults_to_empty_errors() {
        for body in ["not json", r#"{"message":"nope"}"#, r#"{"errors":null}"#] {
            let rendered = raise(ErrorKind::UnprocessableEntity, 422, body).render();
            check!(rendered.payload.errors == Some(json!([])));
        }
    }

    #[test]
    fn render_unmapped_errors_as_internal() {
        check!(Error::Timeout.render() == RenderedError::internal());
        check!(Error::transport("refused").render().status == 500);

        let unsupported = raise(ErrorKind::UnsupportedOperation, 200, "");
        check!(unsupported.render().to_value() == json!({"message": "Internal Error"}));
    }

    #[test]
    fn rendered_into_http_response() {
        let response: http::Response<Bytes> = RenderedError::internal().into();

        check!(response.status() == http::StatusCode::INTERNAL_SERVER_ERROR);
        let_assert!(Some(content_type) = response.headers().get(http::header::CONTENT_TYPE));
        check!(content_type == "application/json");
        check!(response.body().as_ref() == br#"{"message":"Internal Error"}"#);
    }

    #[test]
    fn payload_serializes_without_absent_errors() {
        let payload = ErrorPayload {
            message: "m".to_string(),
            errors: None,
        };
        check!(serde_json::to_value(&payload).expect("serialize") == json!({"message": "m"}));
    }

    #[test]
    fn rendered_body_serializes_payload_fields_in_order() {
        let rendered = RenderedError {
            status: 422,
            payload: ErrorPayload {
                message: "Invalid".to_string(),
                errors: Some(json!({"name": ["required"]})),
            },
        };

        check!(rendered.body().as_ref() == br#"{"message":"Invalid","errors":{"name":["required"]}}"#);
        check!(rendered.to_value() == json!({"message": "Invalid", "errors": {"name": ["required"]}}));
    }
}
