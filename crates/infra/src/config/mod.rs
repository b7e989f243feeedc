//! Configuration loading and management
//!
//! This module provides utilities for loading [`ClientConfig`] from
//! environment variables, `.env` files and config files.
//!
//! [`ClientConfig`]: groupvan_domain::ClientConfig

pub mod loader;

// Re-export commonly used items
pub use loader::{
    apply_env_overrides, load, load_from_file, parse_config, find_config_file, validate,
};
