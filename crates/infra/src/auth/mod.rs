//! HTTP-backed auth endpoint for the auth manager

pub mod endpoint;

pub use endpoint::HttpAuthEndpoint;
