use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Source of the current time used for token expiry
pub trait TimeProvider: std::fmt::Debug + Send + Sync + 'static {
    /// Returns the current time. No guarantees are made about monotonicity
    fn now(&self) -> DateTime<Utc>;
}

/// A [`TimeProvider`] that uses [`Utc::now`] as a clock source
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvider;

impl SystemProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A [`TimeProvider`] that only moves when told to via [`MockProvider::set`] or
/// [`MockProvider::inc`]
#[derive(Debug)]
pub struct MockProvider {
    now: RwLock<DateTime<Utc>>,
}

impl MockProvider {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.now.write() = time;
    }

    /// Advance the clock, saturating at the maximum representable time
    pub fn inc(&self, duration: Duration) -> DateTime<Utc> {
        let mut now = self.now.write();
        *now = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        *now
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
