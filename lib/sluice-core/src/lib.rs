//! Core types and traits for the sluice HTTP response layer.
//!
//! This crate provides the foundational types used by sluice:
//! - [`ResponseWrapper`] - Response with lazy, at-most-once body reading
//! - [`ErrorKind`] - Status code registry mapping 3xx/4xx/5xx to failure kinds
//! - [`Error`], [`ResponseError`] and [`Result`] - Error handling and rendering
//! - [`RequestContext`] and [`RequestOptions`] - What a response answers
//! - [`InfoSnapshot`] - Transport metadata
//! - [`Transport`] - Blocking transport trait
//! - [`BodyStream`] - Single-pass body resource
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod body;
mod client;
mod config;
mod error;
mod info;
mod method;
pub mod prelude;
mod request;
mod response;
mod status;

pub use body::{
    BodyStream, ContentType, MemoryBody, from_json, normalize_content, to_form, to_json,
};
pub use client::{RequestTimeout, Transport};
pub use config::ResponseConfig;
pub use error::{Error, ErrorPayload, RenderedError, ResponseError, Result};
pub use info::{InfoField, InfoSnapshot};
pub use method::Method;
pub use request::{RequestContext, RequestOptions};
pub use response::{
    ConsumptionState, FromRawResponse, Headers, RawResponse, ResponseWrapper, SharedResponse,
};
pub use status::{ErrorKind, Family};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
