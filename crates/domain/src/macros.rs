//! Macro for implementing Display and FromStr for wire-named enums
//!
//! Enums that travel as strings (event kinds, cache provenance, storage
//! backend names) share one implementation of both traits. Parsing is
//! case-insensitive; output always uses the canonical lowercase name.
//!
//! # Example
//!
//! ```rust
//! use groupvan_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Stable,
//!     Beta,
//! }
//!
//! impl_wire_name_conversions!(Channel {
//!     Stable => "stable",
//!     Beta => "beta",
//! });
//!
//! assert_eq!("BETA".parse::<Channel>(), Ok(Channel::Beta));
//! ```

/// Implements Display and FromStr traits for wire-named enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their lowercase string
///   representations
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
