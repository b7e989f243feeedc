//! Time abstraction for testability
//!
//! Token expiry is judged against wall-clock time. Production code uses
//! [`SystemClock`]; tests inject a [`MockClock`] and move it forward instead
//! of waiting.
//!
//! ```
//! use std::time::Duration;
//!
//! use groupvan_common::time::{Clock, MockClock};
//!
//! let mock = MockClock::at_unix(1_700_000_000);
//! mock.advance(Duration::from_secs(5));
//! assert_eq!(mock.unix_seconds(), 1_700_000_005);
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Trait for time operations to enable testing
pub trait Clock: Send + Sync {
    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Whole seconds since the UNIX epoch
    fn unix_seconds(&self) -> i64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
    }

    /// Get milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same underlying time, so a clock handed to the auth
/// manager can be advanced from the test body.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<SystemTime>>,
}

impl MockClock {
    /// Create a mock clock frozen at the current real time
    pub fn new() -> Self {
        Self { current: Arc::new(Mutex::new(SystemTime::now())) }
    }

    /// Create a mock clock frozen at `secs` after the UNIX epoch
    pub fn at_unix(secs: u64) -> Self {
        Self { current: Arc::new(Mutex::new(UNIX_EPOCH + Duration::from_secs(secs))) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
    }

    /// Set the mock clock to an absolute time
    pub fn set(&self, time: SystemTime) {
        *self.current.lock() = time;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn system_time(&self) -> SystemTime {
        *self.current.lock()
    }
}
