//! Authentication: token lifecycle, event broadcast and storage ports

pub mod claims;
pub mod events;
pub mod manager;
pub mod memory;
pub mod ports;

pub use claims::decode_unverified;
pub use events::{AuthEventBus, AuthSubscription, ListenerHandle};
pub use manager::{AuthManager, AuthManagerBuilder};
pub use memory::MemoryTokenStorage;
pub use ports::{AccessTokenProvider, AuthEndpoint, TokenStorage};
