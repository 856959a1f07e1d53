//! HTTP response handling.
//!
//! [`ResponseWrapper`] wraps one raw transport response together with the
//! [`RequestContext`] that produced it. The body is materialized at most once
//! into a single content slot; every accessor reads through that slot.
//!
//! The consumption mode is fixed at construction by the `stream` option:
//!
//! - buffered: `Unread → Buffered`, inside the constructor, which also
//!   releases the body resource;
//! - streaming: `StreamOpen → Buffered` on the first read (or on demand via
//!   [`ResponseWrapper::read_contents_from_stream`]), then `StreamClosed` once
//!   the caller calls [`ResponseWrapper::close_stream`].
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use sluice_core::{
//!     MemoryBody, Method, RawResponse, RequestContext, RequestOptions, ResponseConfig,
//!     ResponseWrapper,
//! };
//!
//! let request = RequestContext::new(Method::Get, "/users/1", RequestOptions::new());
//! let raw = RawResponse::new(200, Default::default(), MemoryBody::new(r#"{"id":1}"#));
//! let mut response =
//!     ResponseWrapper::new(request, raw, Utc::now(), ResponseConfig::default()).expect("read");
//!
//! let user = response.to_map(true).expect("decode");
//! assert_eq!(user["id"], 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    BodyStream, Error, ErrorKind, InfoField, InfoSnapshot, RequestContext, ResponseConfig,
    ResponseError, Result, normalize_content,
};

/// Response headers keyed by lower-case name, each with all its values.
pub type Headers = HashMap<String, Vec<String>>;

// ============================================================================
// Raw Response
// ============================================================================

/// What a transport hands over: status line, headers and an open body.
pub struct RawResponse<B = Box<dyn BodyStream>> {
    status: u16,
    reason: String,
    headers: Headers,
    body: B,
}

impl<B> RawResponse<B> {
    /// Creates a raw response with the canonical reason phrase for `status`.
    #[must_use]
    pub fn new(status: u16, headers: Headers, body: B) -> Self {
        Self {
            status,
            reason: canonical_reason(status),
            headers,
            body,
        }
    }

    /// Override the reason phrase.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase.
    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Consume into (status, reason, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, String, Headers, B) {
        (self.status, self.reason, self.headers, self.body)
    }
}

impl RawResponse {
    /// Creates a raw response with a type-erased body.
    #[must_use]
    pub fn boxed(status: u16, headers: Headers, body: impl BodyStream + 'static) -> Self {
        Self::new(status, headers, Box::new(body))
    }
}

impl<B> std::fmt::Debug for RawResponse<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

fn canonical_reason(status: u16) -> String {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// Shared Response
// ============================================================================

#[derive(Debug)]
struct ResponseHead {
    request: RequestContext,
    status: u16,
    reason: String,
    headers: Headers,
    start_time: DateTime<Utc>,
}

/// Read-only view of a response, shared with the errors it raises.
///
/// Holds the request context, the status line, the headers, and the cached
/// content as it was when the view was taken.
#[derive(Debug, Clone)]
pub struct SharedResponse {
    head: Arc<ResponseHead>,
    content: Arc<str>,
}

impl SharedResponse {
    /// A view not backed by a transport response, with no headers.
    #[must_use]
    pub fn detached(request: RequestContext, status: u16, content: impl Into<Arc<str>>) -> Self {
        Self {
            head: Arc::new(ResponseHead {
                request,
                status,
                reason: canonical_reason(status),
                headers: Headers::new(),
                start_time: Utc::now(),
            }),
            content: content.into(),
        }
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.head.status
    }

    /// Reason phrase.
    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        &self.head.reason
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.head.headers
    }

    /// The originating request.
    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.head.request
    }

    /// When the request was sent.
    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.head.start_time
    }

    /// Cached content (empty if the body was never read).
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content decoded as a map, or an empty map if it is not valid JSON.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        decode_map(&self.content).unwrap_or_default()
    }

    /// Try to decode the content as a typed value.
    ///
    /// # Example
    ///
    /// ```ignore
    /// #[derive(Debug, Deserialize)]
    /// struct ApiError {
    ///     code: String,
    /// }
    ///
    /// if let Err(err) = response.content(true) {
    ///     if let Some(Ok(api)) = err.as_response_error().map(|e| e.response().decode_body::<ApiError>()) {
    ///         println!("API error code: {}", api.code);
    ///     }
    /// }
    /// ```
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        crate::from_json(self.content.as_bytes())
    }

    /// Transport metadata snapshot.
    #[must_use]
    pub fn info(&self) -> InfoSnapshot {
        InfoSnapshot {
            error: None,
            http_code: self.head.status,
            http_method: self.head.request.method().to_string(),
            redirect_count: 0,
            redirect_url: self.redirect_url(),
            response_headers: self.head.headers.clone(),
            start_time: self.head.start_time,
            url: self.head.request.url().to_string(),
            user_data: self.head.request.options().as_map().clone(),
            content: self.content.to_string(),
        }
    }

    fn redirect_url(&self) -> Option<String> {
        if !(300..400).contains(&self.head.status) {
            return None;
        }
        self.head
            .headers
            .get("location")
            .and_then(|values| values.first())
            .cloned()
    }
}

/// Decode content as a map.
///
/// A JSON object is returned as is, an array is keyed by index, and any other
/// value is wrapped as `{"message": value}`.
pub(crate) fn decode_map(content: &str) -> std::result::Result<Map<String, Value>, serde_json::Error> {
    serde_json::from_str::<Value>(content).map(|value| match value {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        other => {
            let mut map = Map::new();
            map.insert("message".to_string(), other);
            map
        }
    })
}

// ============================================================================
// Response Wrapper
// ============================================================================

/// Where the body of a [`ResponseWrapper`] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumptionState {
    /// Buffered mode, body not read yet (only seen during construction).
    Unread,
    /// Content is cached in the slot.
    Buffered,
    /// Streaming mode, body open and not read yet.
    StreamOpen,
    /// Streaming mode, content cached and body released.
    StreamClosed,
}

/// Builds a response type from what a transport returned.
///
/// The client is generic over this trait, so the response type is chosen at
/// compile time.
pub trait FromRawResponse: Sized {
    /// Wrap a raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if the body must be read eagerly and reading fails.
    fn from_raw(
        request: RequestContext,
        raw: RawResponse,
        start_time: DateTime<Utc>,
        config: ResponseConfig,
    ) -> Result<Self>;
}

/// A transport response with lazy, at-most-once body materialization and
/// status-driven errors.
///
/// Accessors taking a `throw` flag first run [`check_status`] when it is
/// `true`; with `false` the check is skipped entirely.
///
/// [`check_status`]: ResponseWrapper::check_status
pub struct ResponseWrapper<B: BodyStream = Box<dyn BodyStream>> {
    head: Arc<ResponseHead>,
    body: Option<B>,
    content: Option<Arc<str>>,
    state: ConsumptionState,
    streaming: bool,
    config: ResponseConfig,
}

impl<B: BodyStream> ResponseWrapper<B> {
    /// Wraps a raw response.
    ///
    /// In buffered mode the body is drained and released here.
    ///
    /// # Errors
    ///
    /// Returns a transport error if draining the body fails.
    pub fn new(
        request: RequestContext,
        raw: RawResponse<B>,
        start_time: DateTime<Utc>,
        config: ResponseConfig,
    ) -> Result<Self> {
        let streaming = request.options().is_stream();
        let (status, reason, headers, body) = raw.into_parts();

        let mut response = Self {
            head: Arc::new(ResponseHead {
                request,
                status,
                reason,
                headers,
                start_time,
            }),
            body: Some(body),
            content: None,
            state: if streaming {
                ConsumptionState::StreamOpen
            } else {
                ConsumptionState::Unread
            },
            streaming,
            config,
        };

        if !streaming {
            response.read_contents_from_stream()?;
            response.release_body();
        }

        Ok(response)
    }

    /// HTTP status code. Never fails.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.head.status
    }

    /// Reason phrase.
    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        &self.head.reason
    }

    /// The originating request.
    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.head.request
    }

    /// When the request was sent.
    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.head.start_time
    }

    /// Current consumption state.
    #[must_use]
    pub const fn state(&self) -> ConsumptionState {
        self.state
    }

    /// Whether this response was opened in streaming mode.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// First value of a header, without any status check.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head
            .headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Response headers.
    ///
    /// # Errors
    ///
    /// With `throw`, returns the mapped failure for a 3xx/4xx/5xx status.
    pub fn headers(&mut self, throw: bool) -> Result<&Headers> {
        if throw {
            self.check_status()?;
        }
        Ok(&self.head.headers)
    }

    /// Response content as text.
    ///
    /// # Errors
    ///
    /// With `throw`, returns the mapped failure for a 3xx/4xx/5xx status.
    /// A transport error if the body has to be read and reading fails.
    pub fn content(&mut self, throw: bool) -> Result<&str> {
        if throw {
            self.check_status()?;
        }
        self.read_contents_from_stream()
    }

    /// Response content as bytes.
    ///
    /// # Errors
    ///
    /// Same as [`content`](Self::content).
    pub fn body(&mut self, throw: bool) -> Result<Bytes> {
        let content = self.content(throw)?;
        Ok(Bytes::copy_from_slice(content.as_bytes()))
    }

    /// Content decoded as a map.
    ///
    /// A JSON object is returned as is; any other JSON value is normalized
    /// (see [`SharedResponse::to_map`]). Without `throw`, content that is not
    /// valid JSON yields an empty map.
    ///
    /// # Errors
    ///
    /// With `throw`, the mapped status failure, or a decoding failure
    /// wrapping the parse error.
    pub fn to_map(&mut self, throw: bool) -> Result<Map<String, Value>> {
        let decoded = decode_map(self.content(throw)?);
        match decoded {
            Ok(map) => Ok(map),
            Err(err) if throw => {
                let message = ErrorKind::Decoding.default_message(self.status_code());
                Err(self.raise(ErrorKind::Decoding, message, Some(err)))
            }
            Err(_) => Ok(Map::new()),
        }
    }

    /// Content decoded as a typed value.
    ///
    /// # Errors
    ///
    /// The mapped status failure, or a decoding failure whose message names
    /// the path of the offending field.
    pub fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T> {
        let decoded = {
            let content = self.content(true)?;
            let mut deserializer = serde_json::Deserializer::from_str(content);
            serde_path_to_error::deserialize::<_, T>(&mut deserializer)
        };
        decoded.map_err(|err| {
            let path = err.path().to_string();
            let message = format!(
                "{} at '{path}'",
                ErrorKind::Decoding.default_message(self.status_code())
            );
            self.raise(ErrorKind::Decoding, message, Some(err.into_inner()))
        })
    }

    /// Always fails: a blocking response cannot be cancelled mid-flight.
    ///
    /// # Errors
    ///
    /// Always returns an [`ErrorKind::UnsupportedOperation`] failure.
    pub fn cancel(&self) -> Result<()> {
        Err(self.raise(
            ErrorKind::UnsupportedOperation,
            "Method [cancel] not supported",
            None,
        ))
    }

    /// Evaluate the status registry and raise the mapped failure, if any.
    ///
    /// The body is buffered before raising so the error carries the content.
    /// For `422` the message is taken from the body's `message` field when
    /// present.
    ///
    /// # Errors
    ///
    /// The mapped failure for a 3xx/4xx/5xx status.
    pub fn check_status(&mut self) -> Result<()> {
        let status = self.status_code();
        let Some(kind) = ErrorKind::for_status(status) else {
            return Ok(());
        };

        self.read_contents_from_stream()?;

        let message = if kind.carries_errors() {
            decode_map(self.cached_content())
                .ok()
                .and_then(|mut map| match map.remove("message") {
                    Some(Value::String(message)) => Some(message),
                    _ => None,
                })
                .unwrap_or_else(|| kind.default_message(status))
        } else {
            kind.default_message(status)
        };

        Err(self.raise(kind, message, None))
    }

    /// Read the body into the content slot, if not done yet.
    ///
    /// Safe to call any number of times: the body is only read when it is
    /// still readable and not at end-of-stream, and only on the first call.
    /// Otherwise the slot ends up holding an empty string.
    ///
    /// # Errors
    ///
    /// A transport error if reading the body fails.
    pub fn read_contents_from_stream(&mut self) -> Result<&str> {
        if matches!(
            self.state,
            ConsumptionState::Unread | ConsumptionState::StreamOpen
        ) {
            let content = match self.body.as_mut() {
                Some(body) if body.is_readable() && !body.is_eof() => {
                    normalize_content(&body.read_to_end()?)
                }
                _ => String::new(),
            };
            if self.config.debug {
                debug!(
                    status = self.head.status,
                    bytes = content.len(),
                    streaming = self.streaming,
                    "response body buffered"
                );
            }
            self.content = Some(Arc::from(content));
            self.state = ConsumptionState::Buffered;
        }
        Ok(self.cached_content())
    }

    /// Buffer the body, then release the underlying resource.
    ///
    /// Required in streaming mode; harmless in buffered mode, where the
    /// constructor already released the body.
    ///
    /// # Errors
    ///
    /// A transport error if reading the body fails; the body is then kept
    /// open.
    pub fn close_stream(&mut self) -> Result<()> {
        self.read_contents_from_stream()?;
        self.release_body();
        if self.streaming {
            self.state = ConsumptionState::StreamClosed;
        }
        Ok(())
    }

    /// Transport metadata, buffering the body first.
    ///
    /// Never raises a status failure.
    ///
    /// # Errors
    ///
    /// A transport error if reading the body fails.
    pub fn info(&mut self) -> Result<InfoSnapshot> {
        self.read_contents_from_stream()?;
        Ok(self.shared().info())
    }

    /// A single info field by name (`camelCase` or `snake_case`).
    ///
    /// # Errors
    ///
    /// [`Error::UnknownInfoField`] for an unrecognized name, or a transport
    /// error if reading the body fails.
    pub fn info_field(&mut self, name: &str) -> Result<Value> {
        let field: InfoField = name.parse()?;
        Ok(self.info()?.field(field))
    }

    /// Read-only view of this response, as shared with raised errors.
    #[must_use]
    pub fn shared(&self) -> SharedResponse {
        SharedResponse {
            head: Arc::clone(&self.head),
            content: self.content.clone().unwrap_or_else(|| Arc::from("")),
        }
    }

    fn cached_content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    fn release_body(&mut self) {
        if let Some(mut body) = self.body.take() {
            body.close();
            if self.config.debug {
                debug!(status = self.head.status, "response body released");
            }
        }
    }

    fn raise(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        source: Option<serde_json::Error>,
    ) -> Error {
        let err = ResponseError::new(kind, message, self.shared(), source);
        err.report();
        err.into()
    }
}

impl FromRawResponse for ResponseWrapper {
    fn from_raw(
        request: RequestContext,
        raw: RawResponse,
        start_time: DateTime<Utc>,
        config: ResponseConfig,
    ) -> Result<Self> {
        Self::new(request, raw, start_time, config)
    }
}

impl<B: BodyStream> Drop for ResponseWrapper<B> {
    fn drop(&mut self) {
        if let Some(body) = self.body.as_mut() {
            if self.streaming && self.state != ConsumptionState::StreamClosed {
                warn!(
                    status = self.head.status,
                    url = self.head.request.url(),
                    "streaming response dropped without close_stream"
                );
            }
            body.close();
        }
    }
}

impl<B: BodyStream> std::fmt::Debug for ResponseWrapper<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWrapper")
            .field("request", &self.head.request)
            .field("status", &self.head.status)
            .field("state", &self.state)
            .field("streaming", &self.streaming)
            .finish_non_exhaustive()
    }
}
