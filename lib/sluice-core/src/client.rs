//! Transport trait.
//!
//! A [`Transport`] performs one blocking HTTP exchange and hands back a
//! [`RawResponse`] whose body is still open. Response wrapping happens above
//! it, so a transport never looks at status codes.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::{RawResponse, Result};

/// Blocking HTTP transport.
///
/// Implement this for custom connectors or for test doubles.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use sluice_core::{Headers, MemoryBody, RawResponse, Result, Transport};
///
/// struct Canned;
///
/// impl Transport for Canned {
///     fn send(&self, _request: http::Request<Bytes>) -> Result<RawResponse> {
///         Ok(RawResponse::boxed(200, Headers::new(), MemoryBody::new("ok")))
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Send a request and return the response with its body unread.
    ///
    /// A [`RequestTimeout`] extension on the request overrides the transport's
    /// default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - Timeouts
    /// - Invalid response
    fn send(&self, request: http::Request<Bytes>) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: http::Request<Bytes>) -> Result<RawResponse> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: http::Request<Bytes>) -> Result<RawResponse> {
        (**self).send(request)
    }
}

/// Per-request timeout, carried as an [`http::Extensions`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeout(pub Duration);
