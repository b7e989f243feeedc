//! # GroupVAN Domain
//!
//! Plain data shared by every GroupVAN client crate.
//!
//! This crate contains:
//! - Token and auth-state types (`AccessToken`, `AuthStatus`, `AuthEvent`)
//! - Request/response metadata and `GroupVanResponse<T>`
//! - Client configuration structures
//! - Protocol constants
//!
//! ## Architecture
//! - No dependencies on other GroupVAN crates
//! - No I/O, no async

pub mod config;
pub mod constants;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use types::*;
