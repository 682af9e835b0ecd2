//! Time source abstraction.
//!
//! Expiry decisions read the current time through [`Clock`] so that tests can
//! move time forward explicitly instead of sleeping.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
