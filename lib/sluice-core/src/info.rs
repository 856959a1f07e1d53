//! Transport metadata snapshot.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use derive_more::Display;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{Error, Headers};

/// Metadata about a completed exchange.
///
/// Built on demand from the response; the body is buffered first so
/// `content` always holds the cached text. Serializes with `camelCase` keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoSnapshot {
    /// Transport-level error message, if the exchange was aborted.
    pub error: Option<String>,
    /// HTTP status code.
    pub http_code: u16,
    /// HTTP method.
    pub http_method: String,
    /// Number of redirects followed.
    pub redirect_count: u32,
    /// Target of a redirection response.
    pub redirect_url: Option<String>,
    /// Response headers.
    pub response_headers: Headers,
    /// When the request was sent.
    #[serde(serialize_with = "rfc3339_millis")]
    pub start_time: DateTime<Utc>,
    /// Request URL.
    pub url: String,
    /// Request options, verbatim.
    pub user_data: Map<String, Value>,
    /// Cached response content.
    pub content: String,
}

impl InfoSnapshot {
    /// A single field as a JSON value.
    #[must_use]
    pub fn field(&self, field: InfoField) -> Value {
        match self.to_value() {
            Value::Object(mut fields) => fields.remove(&field.to_string()).unwrap_or_default(),
            _ => Value::Null,
        }
    }

    /// All fields as a JSON object keyed by their `camelCase` names.
    #[must_use]
    pub fn to_value(&self) -> Value {
        // string keys only: serialization cannot fail
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn rfc3339_millis<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// A named field of an [`InfoSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum InfoField {
    /// `error`
    #[display("error")]
    Error,
    /// `httpCode`
    #[display("httpCode")]
    HttpCode,
    /// `httpMethod`
    #[display("httpMethod")]
    HttpMethod,
    /// `redirectCount`
    #[display("redirectCount")]
    RedirectCount,
    /// `redirectUrl`
    #[display("redirectUrl")]
    RedirectUrl,
    /// `responseHeaders`
    #[display("responseHeaders")]
    ResponseHeaders,
    /// `startTime`
    #[display("startTime")]
    StartTime,
    /// `url`
    #[display("url")]
    Url,
    /// `userData`
    #[display("userData")]
    UserData,
    /// `content`
    #[display("content")]
    Content,
}

impl InfoField {
    /// Every field, in snapshot order.
    pub const ALL: [Self; 10] = [
        Self::Error,
        Self::HttpCode,
        Self::HttpMethod,
        Self::RedirectCount,
        Self::RedirectUrl,
        Self::ResponseHeaders,
        Self::StartTime,
        Self::Url,
        Self::UserData,
        Self::Content,
    ];
}

impl FromStr for InfoField {
    type Err = Error;

    /// Accepts `camelCase` and `snake_case` names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(Self::Error),
            "httpCode" | "http_code" => Ok(Self::HttpCode),
            "httpMethod" | "http_method" => Ok(Self::HttpMethod),
            "redirectCount" | "redirect_count" => Ok(Self::RedirectCount),
            "redirectUrl" | "redirect_url" => Ok(Self::RedirectUrl),
            "responseHeaders" | "response_headers" => Ok(Self::ResponseHeaders),
            "startTime" | "start_time" => Ok(Self::StartTime),
            "url" => Ok(Self::Url),
            "userData" | "user_data" => Ok(Self::UserData),
            "content" => Ok(Self::Content),
            other => Err(Error::UnknownInfoField(other.to_string())),
        }
    }
}
