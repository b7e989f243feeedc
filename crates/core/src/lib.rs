//! # GroupVAN Core
//!
//! Client-side business logic with no HTTP or platform code.
//!
//! This crate contains:
//! - The auth manager and its state machine
//! - Auth event broadcast
//! - Port interfaces (traits) implemented by `groupvan-infra`
//!
//! ## Architecture Principles
//! - Only depends on `groupvan-common` and `groupvan-domain`
//! - All external dependencies via traits
//! - Time is injected through [`groupvan_common::time::Clock`]

pub mod auth;

pub use auth::{
    AccessTokenProvider, AuthEndpoint, AuthEventBus, AuthManager, AuthManagerBuilder,
    AuthSubscription, ListenerHandle, MemoryTokenStorage, TokenStorage,
};
