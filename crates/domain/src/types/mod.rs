//! Domain types and models

pub mod auth;
pub mod http;

pub use auth::{
    AccessToken, AuthEvent, AuthEventKind, AuthStatus, Credentials, RefreshToken, SignOutOptions,
    TokenClaims, TokenGrant, TokenPair,
};
pub use http::{
    redact_headers, CacheProvenance, GroupVanResponse, HttpMethod, RequestMetadata,
    ResponseMetadata,
};
