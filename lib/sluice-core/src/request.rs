//! Request context carried by a response.
//!
//! A [`RequestContext`] records what was asked for: the method, the URL as the
//! caller wrote it, and the [`RequestOptions`] mapping. The options are kept
//! verbatim for diagnostics and for the `userData` field of the info snapshot.
//!
//! # Example
//!
//! ```
//! use sluice_core::{Method, RequestContext, RequestOptions};
//!
//! let options = RequestOptions::new()
//!     .stream(true)
//!     .header("Accept", "application/json")
//!     .query("page", 1);
//! let request = RequestContext::new(Method::Get, "/users", options);
//!
//! assert!(request.options().is_stream());
//! assert_eq!(request.url(), "/users");
//! ```

use std::time::Duration;

use serde_json::{Map, Value};

use crate::Method;

/// An immutable description of the request a response answers.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    method: Method,
    url: String,
    options: RequestOptions,
}

impl RequestContext {
    /// Creates a new request context.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            method,
            url: url.into(),
            options,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL, as given by the caller.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request options.
    #[must_use]
    pub const fn options(&self) -> &RequestOptions {
        &self.options
    }
}

/// Arbitrary request options keyed by name.
///
/// Well-known keys have typed accessors; any other key is carried untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    values: Map<String, Value>,
}

impl RequestOptions {
    /// Selects streaming mode (`bool`).
    pub const STREAM: &'static str = "stream";
    /// Request headers (object of strings).
    pub const HEADERS: &'static str = "headers";
    /// Query parameters (object).
    pub const QUERY: &'static str = "query";
    /// JSON body (any value).
    pub const JSON: &'static str = "json";
    /// Form URL-encoded body (object).
    pub const FORM_PARAMS: &'static str = "form_params";
    /// Raw body (string).
    pub const BODY: &'static str = "body";
    /// Request timeout in seconds (number).
    pub const TIMEOUT: &'static str = "timeout";

    /// Empty options: buffered mode, no headers, no body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an arbitrary option.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Selects streaming (`true`) or buffered (`false`) consumption.
    #[must_use]
    pub fn stream(self, stream: bool) -> Self {
        self.with(Self::STREAM, stream)
    }

    /// Adds a request header.
    #[must_use]
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_nested(Self::HEADERS, name.into(), Value::String(value.into()))
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_nested(Self::QUERY, name.into(), value.into())
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        Ok(self.with(Self::JSON, serde_json::to_value(value)?))
    }

    /// Sets a form URL-encoded body.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn form_params<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        Ok(self.with(Self::FORM_PARAMS, serde_json::to_value(value)?))
    }

    /// Sets a raw body.
    #[must_use]
    pub fn body(self, body: impl Into<String>) -> Self {
        self.with(Self::BODY, body.into())
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        self.with(Self::TIMEOUT, timeout.as_secs_f64())
    }

    fn insert_nested(mut self, key: &str, name: String, value: Value) -> Self {
        let entry = self
            .values
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(name, value);
        }
        self
    }

    /// Whether the response should be consumed as a stream.
    ///
    /// Anything but a boolean `true` selects buffered mode.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        self.values
            .get(Self::STREAM)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Request headers as name/value pairs.
    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        self.string_pairs(Self::HEADERS)
    }

    /// Query parameters as name/value pairs.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.string_pairs(Self::QUERY)
    }

    /// JSON body, if any.
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        self.values.get(Self::JSON)
    }

    /// Form body, if any.
    #[must_use]
    pub fn form_body(&self) -> Option<&Value> {
        self.values.get(Self::FORM_PARAMS)
    }

    /// Raw body, if any.
    #[must_use]
    pub fn raw_body(&self) -> Option<&str> {
        self.values.get(Self::BODY).and_then(Value::as_str)
    }

    /// Request timeout, if a positive number of seconds is set.
    ///
    /// Values too large for a [`Duration`] are ignored.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.values
            .get(Self::TIMEOUT)
            .and_then(Value::as_f64)
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Single option by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All options.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    fn string_pairs(&self, key: &str) -> Vec<(String, String)> {
        let Some(Value::Object(map)) = self.values.get(key) else {
            return Vec::new();
        };
        map.iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect()
    }
}

impl From<Map<String, Value>> for RequestOptions {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl From<RequestOptions> for Map<String, Value> {
    fn from(options: RequestOptions) -> Self {
        options.values
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;
    use serde_json::json;

    use super::*;

    #[test]
    fn default_options_are_buffered() {
        let options = RequestOptions::new();
        check!(!options.is_stream());
        check!(options.headers().is_empty());
        check!(options.json_body().is_none());
    }

    #[test]
    fn stream_requires_boolean_true() {
        check!(RequestOptions::new().stream(true).is_stream());
        check!(!RequestOptions::new().stream(false).is_stream());
        check!(!RequestOptions::new().with("stream", "yes").is_stream());
    }

    #[test]
    fn headers_and_query_accumulate() {
        let options = RequestOptions::new()
            .header("Accept", "application/json")
            .header("X-Trace", "abc")
            .query("page", 2)
            .query("q", "rust");

        let headers = options.headers();
        check!(headers.contains(&("Accept".to_string(), "application/json".to_string())));
        check!(headers.contains(&("X-Trace".to_string(), "abc".to_string())));

        let query = options.query_pairs();
        check!(query.contains(&("page".to_string(), "2".to_string())));
        check!(query.contains(&("q".to_string(), "rust".to_string())));
    }

    #[test]
    fn bodies() {
        let options = RequestOptions::new()
            .json(&json!({"name": "Alice"}))
            .expect("json")
            .body("raw");

        check!(options.json_body() == Some(&json!({"name": "Alice"})));
        check!(options.raw_body() == Some("raw"));
    }

    #[test]
    fn timeout_round_trips_seconds() {
        let options = RequestOptions::new().timeout(Duration::from_millis(1500));
        check!(options.request_timeout() == Some(Duration::from_millis(1500)));
        check!(RequestOptions::new().with("timeout", 0).request_timeout().is_none());
    }

    #[test]
    fn out_of_range_timeout_is_ignored() {
        check!(RequestOptions::new().with("timeout", 1e30).request_timeout().is_none());
        check!(RequestOptions::new().with("timeout", f64::MAX).request_timeout().is_none());
        check!(RequestOptions::new().with("timeout", -2.5).request_timeout().is_none());
    }

    #[test]
    fn context_keeps_options_verbatim() {
        let options = RequestOptions::new().with("user_data", json!({"id": 7}));
        let request = RequestContext::new(Method::Post, "https://example.com/a", options.clone());

        check!(request.method() == Method::Post);
        check!(request.url() == "https://example.com/a");
        check!(request.options() == &options);
        check!(request.options().get("user_data") == Some(&json!({"id": 7})));
    }
}
