//! Ordered interceptor chain
//!
//! Every call runs the same stages, outermost first:
//!
//! ```text
//! correlation_id -> logging -> cache -> retry -> auth -> error_mapping -> transport
//! ```
//!
//! - `correlation_id` tags the logical call once, so every retry shares it
//! - `logging` sees the whole logical call, including cache hits
//! - `cache` answers opted-in GETs before any network work
//! - `retry` loops over everything below it, so each attempt re-enters `auth`
//!   and picks up a refreshed token
//! - `error_mapping` turns non-2xx responses into taxonomy errors that the
//!   retry and auth stages classify
//!
//! The order is part of the public contract; [`Pipeline::stage_names`]
//! exposes it for tests and diagnostics.

use std::sync::Arc;

use async_trait::async_trait;
use groupvan_common::error::GroupVanResult;

use super::request::{ApiRequest, ApiResponse};

/// Sends one attempt over the wire
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> GroupVanResult<ApiResponse>;
}

/// One `(request, next) -> response` stage
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Stable stage name used in logs and by [`Pipeline::stage_names`]
    fn name(&self) -> &'static str;

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> GroupVanResult<ApiResponse>;
}

/// The remainder of the chain below the current stage
///
/// `Copy`, so a stage may run the rest of the chain more than once.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl Next<'_> {
    pub async fn run(self, request: ApiRequest) -> GroupVanResult<ApiResponse> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage.intercept(request, Next { stages: rest, transport: self.transport }).await
            }
            None => self.transport.send(&request).await,
        }
    }
}

/// Interceptors plus the transport they wrap
pub struct Pipeline {
    stages: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("stages", &self.stage_names()).finish()
    }
}

impl Pipeline {
    /// Build from stages listed outermost first
    pub fn new(stages: Vec<Arc<dyn Interceptor>>, transport: Arc<dyn Transport>) -> Self {
        Self { stages, transport }
    }

    /// Stage names outermost first, ending with `transport`
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).chain(std::iter::once("transport")).collect()
    }

    pub async fn execute(&self, request: ApiRequest) -> GroupVanResult<ApiResponse> {
        Next { stages: &self.stages, transport: self.transport.as_ref() }.run(request).await
    }
}
