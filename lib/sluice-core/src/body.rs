//! Body resources and serialization utilities.
//!
//! [`BodyStream`] is the single-pass body resource a transport hands over with
//! its response. The helpers below serialize request bodies and decode
//! response content.

use bytes::Bytes;

use crate::Result;

/// A response body that can be read forward exactly once.
///
/// Reading to completion leaves the stream at end-of-stream; after
/// [`close`](BodyStream::close) it is no longer readable.
pub trait BodyStream {
    /// Read everything left in the stream.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the underlying connection fails.
    fn read_to_end(&mut self) -> Result<Bytes>;

    /// Whether the stream can still be read (not closed or detached).
    fn is_readable(&self) -> bool;

    /// Whether the stream has been read to completion.
    fn is_eof(&self) -> bool;

    /// Release the underlying resource.
    fn close(&mut self);
}

impl<B: BodyStream + ?Sized> BodyStream for Box<B> {
    fn read_to_end(&mut self) -> Result<Bytes> {
        (**self).read_to_end()
    }

    fn is_readable(&self) -> bool {
        (**self).is_readable()
    }

    fn is_eof(&self) -> bool {
        (**self).is_eof()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// A [`BodyStream`] over bytes already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBody {
    data: Option<Bytes>,
    closed: bool,
}

impl MemoryBody {
    /// Creates a readable body holding `data`.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
            closed: false,
        }
    }
}

impl BodyStream for MemoryBody {
    fn read_to_end(&mut self) -> Result<Bytes> {
        if self.closed {
            return Err(crate::Error::transport("body stream is closed"));
        }
        Ok(self.data.take().unwrap_or_default())
    }

    fn is_readable(&self) -> bool {
        !self.closed
    }

    fn is_eof(&self) -> bool {
        self.data.is_none()
    }

    fn close(&mut self) {
        self.closed = true;
        self.data = None;
    }
}

/// Turns raw body bytes into the cached response content.
///
/// Invalid UTF-8 sequences are replaced, and non-breaking spaces are
/// normalized to plain spaces.
#[must_use]
pub fn normalize_content(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace('\u{a0}', " ")
}

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use sluice_core::to_json;
///
/// let bytes = to_json(&serde_json::json!({"name": "Alice"})).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// Uses `serde_html_form`, so sequences become repeated fields
/// (e.g., `tags=a&tags=b`).
///
/// # Errors
///
/// Returns an error if form serialization fails.
///
/// # Example
///
/// ```
/// use sluice_core::to_form;
///
/// let form = serde_json::json!({"username": "alice"});
/// let bytes = to_form(&form).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"username=alice");
/// ```
pub fn to_form<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
///
/// # Example
///
/// ```
/// use sluice_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let user: User = from_json(br#"{"name":"Alice"}"#).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
