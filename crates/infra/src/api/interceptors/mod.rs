//! The standard pipeline stages, in chain order

pub mod auth;
pub mod cache;
pub mod correlation;
pub mod error_mapping;
pub mod logging;
pub mod retry;

use std::sync::Arc;

use groupvan_common::resilience::RetryConfig;
use groupvan_core::auth::AccessTokenProvider;

pub use auth::AuthInterceptor;
pub use cache::CacheInterceptor;
pub use correlation::CorrelationIdInterceptor;
pub use error_mapping::ErrorMappingInterceptor;
pub use logging::LoggingInterceptor;
pub use retry::RetryInterceptor;

use super::pipeline::{Interceptor, Pipeline, Transport};
use crate::cache::ResponseCache;

/// The fixed stage order every client uses
pub fn standard_pipeline(
    transport: Arc<dyn Transport>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    retry: RetryConfig,
    cache: Option<ResponseCache>,
) -> Pipeline {
    let stages: Vec<Arc<dyn Interceptor>> = vec![
        Arc::new(CorrelationIdInterceptor),
        Arc::new(LoggingInterceptor),
        Arc::new(CacheInterceptor::new(cache)),
        Arc::new(RetryInterceptor::new(retry)),
        Arc::new(AuthInterceptor::new(auth)),
        Arc::new(ErrorMappingInterceptor),
    ];
    Pipeline::new(stages, transport)
}
