//! Correlation-id stage
//!
//! Tags a logical call once; every retry beneath this stage reuses the id.

use async_trait::async_trait;
use groupvan_common::error::GroupVanResult;
use groupvan_domain::constants::HEADER_CORRELATION_ID;
use uuid::Uuid;

use crate::api::pipeline::{Interceptor, Next};
use crate::api::request::{ApiRequest, ApiResponse};

#[derive(Debug, Default, Clone, Copy)]
pub struct CorrelationIdInterceptor;

#[async_trait]
impl Interceptor for CorrelationIdInterceptor {
    fn name(&self) -> &'static str {
        "correlation_id"
    }

    async fn intercept(&self, mut request: ApiRequest, next: Next<'_>) -> GroupVanResult<ApiResponse> {
        if request.correlation_id.is_nil() {
            request.correlation_id = Uuid::new_v4();
        }
        request.set_header(HEADER_CORRELATION_ID, &request.correlation_id.to_string())?;
        next.run(request).await
    }
}
