//! Network transport

pub mod client;

pub use client::{HttpTransport, HttpTransportBuilder};
