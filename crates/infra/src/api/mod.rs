//! GroupVAN REST API client
//!
//! # Architecture
//!
//! - [`ApiClient`] builds an [`ApiRequest`] per logical call and hands it
//!   to the [`Pipeline`]
//! - The pipeline is a fixed chain of [`Interceptor`]s over a
//!   [`Transport`]; see [`pipeline`] for the order
//! - Tokens come from an `AccessTokenProvider`, normally the auth manager

pub mod client;
pub mod interceptors;
pub mod pipeline;
pub mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{decode_json, retry_config, ApiClient, ApiClientBuilder};
pub use interceptors::standard_pipeline;
pub use pipeline::{Interceptor, Next, Pipeline, Transport};
pub use request::{ApiRequest, ApiResponse, RequestOptions};
