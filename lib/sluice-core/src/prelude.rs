//! Prelude module for convenient imports.
//!
//! ```ignore
//! use sluice_core::prelude::*;
//! ```

pub use crate::{
    BodyStream, ConsumptionState, ContentType, Error, ErrorKind, Family, FromRawResponse,
    InfoField, InfoSnapshot, Method, RawResponse, RequestContext, RequestOptions, ResponseConfig,
    ResponseWrapper, Result, Transport,
};
