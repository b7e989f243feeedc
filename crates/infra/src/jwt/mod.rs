//! Client-assertion JWT issuance
//!
//! Server-side integrations sign a short-lived RS256 token with their
//! developer key and either exchange it at the token endpoint or send it
//! directly as the bearer token. See [`JwtIssuer`] and [`JwtTokenProvider`].

pub mod issuer;
pub mod provider;

pub use issuer::{decode_header, JwtClaims, JwtHeader, JwtIssuer, VerifiedToken};
pub use provider::JwtTokenProvider;
