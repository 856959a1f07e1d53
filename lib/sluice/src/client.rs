//! Blocking HTTP client.
//!
//! [`Client`] turns a method, a URL and [`RequestOptions`] into an HTTP
//! request, sends it through a [`Transport`] and wraps what comes back into a
//! response type chosen at compile time through [`FromRawResponse`].

use std::marker::PhantomData;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use sluice_core::{
    ContentType, Error, FromRawResponse, Method, RequestContext, RequestOptions, RequestTimeout,
    ResponseWrapper, Result, Transport, to_form, to_json,
};
use tracing::{Level, debug, info, span, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::transport::HyperTransport;

/// Blocking HTTP client.
///
/// `T` is the transport, `R` the response type every call returns.
///
/// # Example
///
/// ```ignore
/// use sluice::{Client, ClientConfig, RequestOptions};
///
/// let config = ClientConfig::builder()
///     .base_url(url::Url::parse("http://localhost:8080/api/")?)
///     .build();
/// let client = Client::with_config(config)?;
///
/// let mut response = client.get("users/1", RequestOptions::new())?;
/// let user = response.to_map(true)?;
/// ```
pub struct Client<T = HyperTransport, R = ResponseWrapper> {
    transport: T,
    config: ClientConfig,
    response: PhantomData<fn() -> R>,
}

impl<T: Clone, R> Clone for Client<T, R> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: self.config.clone(),
            response: PhantomData,
        }
    }
}

impl<T, R> std::fmt::Debug for Client<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the transport cannot be started.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client over a [`HyperTransport`] built from `config`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the transport cannot be started.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = HyperTransport::with_config(&config)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T, R> Client<T, R> {
    /// Create a client over a custom transport.
    #[must_use]
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            response: PhantomData,
        }
    }

    /// Switch the response type.
    #[must_use]
    pub fn response_type<R2>(self) -> Client<T, R2> {
        Client {
            transport: self.transport,
            config: self.config,
            response: PhantomData,
        }
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport, R: FromRawResponse> Client<T, R> {
    /// Send a request and wrap the response.
    ///
    /// The status is not checked here: mapped failures are raised by the
    /// response accessors.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or options are invalid, or the transport
    /// fails. Transport errors are returned unchanged.
    pub fn request(&self, method: Method, url: &str, options: RequestOptions) -> Result<R> {
        let context = RequestContext::new(method, url, options);
        let request = self.build_request(&context)?;

        let span = span!(Level::INFO, "http_request", %method, url = %request.uri());
        let _entered = span.enter();

        if self.config.debug {
            debug!(
                method = %method,
                url = %request.uri(),
                headers = ?request.headers(),
                "sending request"
            );
        }

        let start_time = Utc::now();
        let start = Instant::now();
        let result = self.transport.send(request);
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let raw = result.inspect_err(|err| warn!(error = %err, elapsed_ms, "request failed"))?;

        if self.config.debug {
            debug!(
                status = raw.status(),
                elapsed_ms,
                headers = ?raw.headers(),
                "response received"
            );
        } else {
            info!(status = raw.status(), elapsed_ms, "response received");
        }

        R::from_raw(context, raw, start_time, self.config.response_config())
    }

    /// Send a GET request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub fn get(&self, url: &str, options: RequestOptions) -> Result<R> {
        self.request(Method::Get, url, options)
    }

    /// Send a POST request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub fn post(&self, url: &str, options: RequestOptions) -> Result<R> {
        self.request(Method::Post, url, options)
    }

    /// Send a PUT request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub fn put(&self, url: &str, options: RequestOptions) -> Result<R> {
        self.request(Method::Put, url, options)
    }

    /// Send a PATCH request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub fn patch(&self, url: &str, options: RequestOptions) -> Result<R> {
        self.request(Method::Patch, url, options)
    }

    /// Send a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub fn delete(&self, url: &str, options: RequestOptions) -> Result<R> {
        self.request(Method::Delete, url, options)
    }
}

impl<T, R> Client<T, R> {
    /// Resolve `url` against the base URL, if any.
    ///
    /// Absolute URLs are kept as is. Relative ones follow URL joining rules:
    /// `users` under `http://host/api/` gives `http://host/api/users`.
    fn resolve_url(&self, url: &str) -> Result<Url> {
        match &self.config.base_url {
            Some(base_url) => Ok(base_url.join(url)?),
            None => Ok(Url::parse(url)?),
        }
    }

    fn build_request(&self, context: &RequestContext) -> Result<http::Request<Bytes>> {
        let options = context.options();

        let mut url = self.resolve_url(context.url())?;
        let query = options.query_pairs();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(&query);
        }

        let (content_type, body) = encode_body(options)?;
        let mut request = http::Request::builder()
            .method(http::Method::from(context.method()))
            .uri(url.as_str())
            .body(body)
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        let headers = request.headers_mut();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        }
        let option_headers = options.headers();
        for (name, value) in self.config.default_headers.iter().chain(&option_headers) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::invalid_request(format!("header name {name:?}: {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| Error::invalid_request(format!("header {name}: {err}")))?;
            headers.insert(name, value);
        }

        if let Some(timeout) = options.request_timeout() {
            request.extensions_mut().insert(RequestTimeout(timeout));
        }

        Ok(request)
    }
}

/// Encode the request body: `json` wins over `form_params`, then `body`.
fn encode_body(options: &RequestOptions) -> Result<(Option<ContentType>, Bytes)> {
    if let Some(json) = options.json_body() {
        return Ok((Some(ContentType::Json), to_json(json)?));
    }
    if let Some(form) = options.form_body() {
        return Ok((Some(ContentType::FormUrlEncoded), to_form(form)?));
    }
    let body = options
        .raw_body()
        .map(|body| Bytes::copy_from_slice(body.as_bytes()))
        .unwrap_or_default();
    Ok((None, body))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use assert2::{check, let_assert};
    use chrono::DateTime;
    use serde_json::json;
    use sluice_core::{
        ConsumptionState, ErrorKind, Headers, MemoryBody, RawResponse, ResponseConfig,
    };

    use super::*;

    /// Transport answering with a canned response and recording requests.
    #[derive(Default)]
    struct StubTransport {
        status: u16,
        body: &'static str,
        sent: Mutex<Vec<http::Request<Bytes>>>,
    }

    impl StubTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                sent: Mutex::default(),
            }
        }

        fn last_request(&self) -> http::Request<Bytes> {
            self.sent
                .lock()
                .expect("lock")
                .pop()
                .expect("a request was sent")
        }
    }

    impl Transport for StubTransport {
        fn send(&self, request: http::Request<Bytes>) -> Result<RawResponse> {
            self.sent.lock().expect("lock").push(request);
            Ok(RawResponse::boxed(
                self.status,
                Headers::new(),
                MemoryBody::new(self.body),
            ))
        }
    }

    struct FailingTransport;

    impl Transport for FailingTransport {
        fn send(&self, _request: http::Request<Bytes>) -> Result<RawResponse> {
            Err(Error::transport("connection refused"))
        }
    }

    fn client(transport: StubTransport) -> Client<StubTransport> {
        let config = ClientConfig::builder()
            .base_url(Url::parse("http://api.example.com/v1/").expect("url"))
            .default_header("Accept", "application/json")
            .default_header("User-Agent", "sluice-test")
            .build();
        Client::with_transport(transport, config)
    }

    #[test]
    fn resolves_relative_urls_and_query() {
        let client = client(StubTransport::new(200, "{}"));

        client
            .get("users", RequestOptions::new().query("page", 2))
            .expect("request");

        let request = client.transport().last_request();
        check!(request.method() == http::Method::GET);
        check!(request.uri() == "http://api.example.com/v1/users?page=2");
    }

    #[test]
    fn absolute_url_bypasses_base() {
        let client = client(StubTransport::new(200, "{}"));

        client
            .delete("http://other.example.com/x", RequestOptions::new())
            .expect("request");

        let request = client.transport().last_request();
        check!(request.method() == http::Method::DELETE);
        check!(request.uri() == "http://other.example.com/x");
    }

    #[test]
    fn option_headers_override_defaults() {
        let client = client(StubTransport::new(200, "{}"));

        client
            .get("users", RequestOptions::new().header("Accept", "text/plain"))
            .expect("request");

        let request = client.transport().last_request();
        check!(request.headers()["accept"] == "text/plain");
        check!(request.headers()["user-agent"] == "sluice-test");
    }

    #[test]
    fn json_body_sets_content_type() {
        let client = client(StubTransport::new(201, "{}"));
        let options = RequestOptions::new()
            .json(&json!({"name": "Alice"}))
            .expect("json");

        client.post("users", options).expect("request");

        let request = client.transport().last_request();
        check!(request.headers()[CONTENT_TYPE] == "application/json");
        check!(request.body().as_ref() == br#"{"name":"Alice"}"#);
    }

    #[test]
    fn form_body_is_url_encoded() {
        let client = client(StubTransport::new(200, "{}"));
        let options = RequestOptions::new()
            .form_params(&json!({"grant_type": "client_credentials"}))
            .expect("form");

        client.put("token", options).expect("request");

        let request = client.transport().last_request();
        check!(request.headers()[CONTENT_TYPE] == "application/x-www-form-urlencoded");
        check!(request.body().as_ref() == b"grant_type=client_credentials");
    }

    #[test]
    fn raw_body_is_sent_verbatim() {
        let client = client(StubTransport::new(200, "{}"));

        client
            .patch("notes/1", RequestOptions::new().body("plain text"))
            .expect("request");

        let request = client.transport().last_request();
        check!(request.method() == http::Method::PATCH);
        check!(request.headers().get(CONTENT_TYPE).is_none());
        check!(request.body().as_ref() == b"plain text");
    }

    #[test]
    fn timeout_option_becomes_extension() {
        let client = client(StubTransport::new(200, "{}"));

        client
            .get(
                "slow",
                RequestOptions::new().timeout(Duration::from_millis(250)),
            )
            .expect("request");

        let request = client.transport().last_request();
        check!(
            request.extensions().get::<RequestTimeout>()
                == Some(&RequestTimeout(Duration::from_millis(250)))
        );
    }

    #[test]
    fn invalid_header_is_rejected() {
        let client = client(StubTransport::new(200, "{}"));

        let result = client.get("users", RequestOptions::new().header("bad header", "x"));

        let_assert!(Err(Error::InvalidRequest(_)) = result);
    }

    #[test]
    fn relative_url_without_base_is_invalid() {
        let client: Client<StubTransport> =
            Client::with_transport(StubTransport::new(200, "{}"), ClientConfig::default());

        let_assert!(Err(Error::InvalidUrl(_)) = client.get("users", RequestOptions::new()));
    }

    #[test]
    fn response_carries_request_context() {
        let client = client(StubTransport::new(404, r#"{"error":"missing"}"#));
        let options = RequestOptions::new().with("trace", "abc");

        let mut response = client.get("users/9", options).expect("request");

        check!(response.status_code() == 404);
        check!(response.request().url() == "users/9");
        check!(response.request().options().get("trace") == Some(&json!("abc")));
        check!(response.state() == ConsumptionState::Buffered);

        let_assert!(Err(err) = response.to_map(true));
        check!(err.kind() == Some(ErrorKind::NotFound));
    }

    #[test]
    fn stream_option_keeps_body_open() {
        let client = client(StubTransport::new(200, "chunked"));

        let mut response = client
            .get("events", RequestOptions::new().stream(true))
            .expect("request");

        check!(response.state() == ConsumptionState::StreamOpen);
        check!(response.content(true).expect("content") == "chunked");
        response.close_stream().expect("close");
        check!(response.state() == ConsumptionState::StreamClosed);
    }

    #[test]
    fn transport_errors_propagate_unchanged() {
        let client: Client<FailingTransport> =
            Client::with_transport(FailingTransport, ClientConfig::default());

        let_assert!(Err(err) = client.get("http://localhost/", RequestOptions::new()));
        check!(err.is_transport());
        check!(err.to_string() == "transport error: connection refused");
    }

    #[test]
    fn custom_response_type() {
        struct Tagged {
            inner: ResponseWrapper,
            debug: bool,
        }

        impl FromRawResponse for Tagged {
            fn from_raw(
                request: RequestContext,
                raw: RawResponse,
                start_time: DateTime<Utc>,
                config: ResponseConfig,
            ) -> Result<Self> {
                Ok(Self {
                    inner: ResponseWrapper::new(request, raw, start_time, config)?,
                    debug: config.debug,
                })
            }
        }

        let config = ClientConfig::builder().debug(true).build();
        let client = Client::<StubTransport>::with_transport(StubTransport::new(200, "ok"), config)
            .response_type::<Tagged>();

        let mut tagged = client.get("http://localhost/", RequestOptions::new()).expect("request");

        check!(tagged.debug);
        check!(tagged.inner.content(true).expect("content") == "ok");
    }
}
