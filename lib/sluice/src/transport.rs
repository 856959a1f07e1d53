//! Blocking transport using hyper-util.
//!
//! [`HyperTransport`] owns a private current-thread tokio runtime and drives
//! hyper-util's pooled client on it. The response body is handed over still
//! attached to the connection: [`HyperBody`] only pulls it when a response
//! reads its content.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::ext::ReasonPhrase;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use sluice_core::{BodyStream, Error, Headers, RawResponse, RequestTimeout, Result, Transport};
use tokio::runtime::Runtime;
use tokio::time::Instant;

use crate::config::ClientConfig;
use crate::connector::http_connector;

/// Upper bound for any request deadline.
const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// HTTP transport with connection pooling, driven from blocking calls.
///
/// # Example
///
/// ```ignore
/// use sluice::{ClientConfig, HyperTransport};
/// use std::time::Duration;
///
/// let config = ClientConfig::builder().timeout(Duration::from_secs(5)).build();
/// let transport = HyperTransport::with_config(&config)?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpConnector, Full<Bytes>>,
    runtime: Arc<Runtime>,
    timeout: Duration,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the runtime cannot be started.
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a transport with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the runtime cannot be started.
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| Error::transport(format!("failed to start runtime: {err}")))?;

        let inner = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(http_connector(config.connect_timeout));

        Ok(Self {
            inner,
            runtime: Arc::new(runtime),
            timeout: config.timeout,
        })
    }

    /// Default request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extract response headers, keyed by lower-case name.
    fn extract_headers(headers: &http::HeaderMap) -> Headers {
        let mut extracted = Headers::new();
        for (name, value) in headers {
            if let Ok(value) = value.to_str() {
                extracted
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
        extracted
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        if err.is_connect() {
            return Error::transport(format!("connection failed: {err}"));
        }
        Error::transport(err.to_string())
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: http::Request<Bytes>) -> Result<RawResponse> {
        let timeout = request
            .extensions()
            .get::<RequestTimeout>()
            .map_or(self.timeout, |timeout| timeout.0)
            .min(MAX_TIMEOUT);
        let deadline = Instant::now() + timeout;

        let (parts, body) = request.into_parts();
        let request = http::Request::from_parts(parts, Full::new(body));

        let response = self
            .runtime
            .block_on(async {
                tokio::time::timeout_at(deadline, self.inner.request(request)).await
            })
            .map_err(|_| Error::Timeout)?
            .map_err(Self::map_hyper_error)?;

        let status = response.status().as_u16();
        let headers = Self::extract_headers(response.headers());
        let reason = response
            .extensions()
            .get::<ReasonPhrase>()
            .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned());
        let body = response
            .into_body()
            .map_err(|err| Error::transport(err.to_string()))
            .boxed_unsync();

        let body = HyperBody {
            body: Some(body),
            runtime: Arc::clone(&self.runtime),
            deadline,
            failure: None,
            eof: false,
            closed: false,
        };

        let raw = RawResponse::boxed(status, headers, body);
        Ok(match reason {
            Some(reason) => raw.with_reason(reason),
            None => raw,
        })
    }
}

/// A response body still attached to its connection.
///
/// Reading drains the remaining frames before the request deadline; closing
/// drops the body, which releases the connection. A failed read is sticky:
/// the frames already pulled are lost, so every later read fails the same way.
pub struct HyperBody {
    body: Option<UnsyncBoxBody<Bytes, Error>>,
    runtime: Arc<Runtime>,
    deadline: Instant,
    failure: Option<ReadFailure>,
    eof: bool,
    closed: bool,
}

impl std::fmt::Debug for HyperBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperBody")
            .field("failure", &self.failure)
            .field("eof", &self.eof)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl BodyStream for HyperBody {
    fn read_to_end(&mut self) -> Result<Bytes> {
        if self.closed {
            return Err(Error::transport("body stream is closed"));
        }
        if let Some(failure) = &self.failure {
            return Err(failure.to_error());
        }
        let Some(body) = self.body.take() else {
            return Ok(Bytes::new());
        };

        let deadline = self.deadline;
        let result = self
            .runtime
            .block_on(async move { tokio::time::timeout_at(deadline, body.collect()).await })
            .map_err(|_| Error::Timeout)
            .and_then(|collected| collected);

        match result {
            Ok(collected) => {
                self.eof = true;
                Ok(collected.to_bytes())
            }
            Err(err) => {
                let failure = ReadFailure::from(&err);
                self.failure = Some(failure);
                Err(err)
            }
        }
    }

    fn is_readable(&self) -> bool {
        !self.closed
    }

    fn is_eof(&self) -> bool {
        self.eof
    }

    fn close(&mut self) {
        self.body = None;
        self.closed = true;
    }
}

/// Why a body read failed, kept to replay the error on later reads.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReadFailure {
    Timeout,
    Transport(String),
}

impl ReadFailure {
    fn to_error(&self) -> Error {
        match self {
            Self::Timeout => Error::Timeout,
            Self::Transport(message) => Error::transport(message.clone()),
        }
    }
}

impl From<&Error> for ReadFailure {
    fn from(err: &Error) -> Self {
        match err {
            Error::Timeout => Self::Timeout,
            Error::Transport(message) => Self::Transport(message.clone()),
            other => Self::Transport(other.to_string()),
        }
    }
}
