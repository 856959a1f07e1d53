//! Prelude module for convenient imports.
//!
//! ```ignore
//! use sluice::prelude::*;
//! ```

pub use crate::{
    Client, ClientConfig, ConsumptionState, Error, ErrorKind, Family, FromRawResponse, Method,
    RequestOptions, ResponseWrapper, Result, Transport,
};
