//! Blocking HTTP client with lazy, at-most-once response bodies.
//!
//! Responses are [`ResponseWrapper`] values: the body is read once into a
//! single content slot, and accessors raise a status-mapped [`ResponseError`]
//! for 3xx/4xx/5xx unless asked not to.
//!
//! # Example
//!
//! ```ignore
//! use sluice::prelude::*;
//!
//! let client = Client::new()?;
//!
//! let mut response = client.get("http://localhost:8080/users/42", RequestOptions::new())?;
//! match response.to_map(true) {
//!     Ok(user) => println!("{user:?}"),
//!     Err(err) if err.is_not_found() => println!("no such user"),
//!     Err(err) => return Err(err),
//! }
//!
//! // Stream a large body, then release the connection
//! let mut response = client.get("http://localhost:8080/export", RequestOptions::new().stream(true))?;
//! let export = response.content(true)?.to_owned();
//! response.close_stream()?;
//! ```

mod client;
mod config;
mod connector;
pub mod prelude;
mod transport;

// Re-export client types
pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use connector::http_connector;
pub use transport::{HyperBody, HyperTransport};

// Re-export core types
pub use sluice_core::{
    BodyStream, ConsumptionState, ContentType, Error, ErrorKind, ErrorPayload, Family,
    FromRawResponse, Headers, InfoField, InfoSnapshot, MemoryBody, Method, RawResponse,
    RenderedError, RequestContext, RequestOptions, RequestTimeout, ResponseConfig, ResponseError,
    ResponseWrapper, Result, SharedResponse, Transport, from_json, to_form, to_json,
};

// Re-export http types for status codes and headers
pub use sluice_core::{StatusCode, header};

// Re-export crates used in the public API
pub use url;
