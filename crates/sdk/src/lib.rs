//! # GroupVAN SDK
//!
//! The application-facing handle over the GroupVAN client core.
//!
//! ```no_run
//! use groupvan_sdk::{GroupVan, RequestOptions};
//! use groupvan_domain::{ClientConfig, Credentials};
//!
//! # async fn run() -> groupvan_common::error::GroupVanResult<()> {
//! let groupvan = GroupVan::init(ClientConfig::default()).await?;
//! groupvan.sign_in(&Credentials::password("counter-7", "secret")).await?;
//! let catalogs = groupvan.get::<serde_json::Value>("/catalogs", RequestOptions::new()).await?;
//! println!("{}", catalogs.data);
//! groupvan.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! ## Lifecycle
//! - [`GroupVan::init`] wires storage, the auth manager and the API client
//!   from a [`ClientConfig`](groupvan_domain::ClientConfig)
//! - [`GroupVan::dispose`] stops background refresh and closes event streams
//! - [`GroupVan::initialize`] / [`GroupVan::instance`] add an optional
//!   process-wide handle; `instance` fails with `NotInitialized` until
//!   `initialize` has run

pub mod client;
pub mod global;
pub mod logging;

pub use client::GroupVan;
pub use groupvan_infra::api::RequestOptions;
