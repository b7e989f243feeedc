//! # GroupVAN Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The reqwest transport and the interceptor pipeline (`api`, `http`)
//! - The HTTP token endpoint used by the auth manager
//! - Token storage backends (file, platform keychain)
//! - The response cache
//! - The RS256 client-assertion issuer
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `groupvan-core`
//! - Depends on `groupvan-common` and `groupvan-domain`
//! - Contains all "impure" code (network, filesystem, keychain)

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod http;
pub mod jwt;
pub mod storage;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder, ApiRequest, ApiResponse, RequestOptions};
pub use auth::HttpAuthEndpoint;
pub use cache::ResponseCache;
pub use errors::InfraError;
pub use http::HttpTransport;
pub use jwt::{JwtIssuer, JwtTokenProvider, VerifiedToken};
pub use storage::{build_storage, FileTokenStorage, KeyringTokenStorage};
