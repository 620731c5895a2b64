//! Time primitives shared across the crate.
//!
//! All validity timestamps in this crate are absolute UTC instants. Incoming
//! timestamps from any timezone are normalized with
//! [`DateTime::with_timezone`] before a comparison ever happens, so two
//! windows expressed in different zones compare identically.
//!
//! # Components
//!
//! - [`ValidityWindow`]: a closed `[not_before, not_after]` interval
//! - [`Clock`]: wall-clock source injected into the store
//! - [`Expirable`]: expiration-time capability consumed by eviction logic
//!
//! # Invariants
//!
//! - `window.not_before <= window.not_after` for every constructed window
//! - [`SystemClock`] is the only production clock; [`ManualClock`] exists for
//!   deterministic tests and timer-free examples

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which validity window a value belongs to. Used to name the offending
/// field in validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowField {
    /// The token-level validity window.
    Token,
    /// The key-level validity window.
    Key,
}

impl std::fmt::Display for WindowField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token => f.write_str("token"),
            Self::Key => f.write_str("key"),
        }
    }
}

/// Errors from validity-window construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum WindowError {
    /// The window's bounds are inverted.
    #[error("{field} window is inverted: not_before {not_before} > not_after {not_after}")]
    Inverted {
        /// Which window carried the inverted bounds.
        field: WindowField,
        /// Lower bound as provided (normalized to UTC).
        not_before: DateTime<Utc>,
        /// Upper bound as provided (normalized to UTC).
        not_after: DateTime<Utc>,
    },
}

/// A closed validity interval `[not_before, not_after]` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl ValidityWindow {
    /// Builds a window from two timestamps, normalizing both to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Inverted`] naming `field` when
    /// `not_before > not_after`.
    pub fn new<Tz: TimeZone>(
        field: WindowField,
        not_before: DateTime<Tz>,
        not_after: DateTime<Tz>,
    ) -> Result<Self, WindowError> {
        let not_before = not_before.with_timezone(&Utc);
        let not_after = not_after.with_timezone(&Utc);
        if not_before > not_after {
            return Err(WindowError::Inverted {
                field,
                not_before,
                not_after,
            });
        }
        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// Lower bound of the window.
    #[must_use]
    pub const fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// Upper bound of the window.
    #[must_use]
    pub const fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Whether `instant` falls inside the closed interval.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.not_before <= instant && instant <= self.not_after
    }

    /// Whether `inner` is fully nested inside this window.
    #[must_use]
    pub fn encloses(&self, inner: &Self) -> bool {
        self.not_before <= inner.not_before && inner.not_after <= self.not_after
    }
}

/// Expiration-time capability consumed by the store's eviction logic.
pub trait Expirable {
    /// The instant after which the item must no longer be served.
    fn expires_at(&self) -> DateTime<Utc>;
}

/// Wall-clock source.
///
/// The store never reads the system clock directly; it goes through this
/// trait so tests and timer-driven sweeps control time explicitly.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Starts at a fixed instant and only moves when [`ManualClock::advance`] or
/// [`ManualClock::set`] is called.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.lock_now();
        *now = *now + delta;
    }

    /// Jumps the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.lock_now();
        *now = instant;
    }

    fn lock_now(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned guard still holds a consistent instant; recover it.
        self.now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock_now()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn window_accepts_ordered_bounds() {
        let w = ValidityWindow::new(WindowField::Token, t0(), t0() + Duration::hours(8))
            .expect("ordered bounds");
        assert_eq!(w.not_before(), t0());
        assert_eq!(w.not_after(), t0() + Duration::hours(8));
    }

    #[test]
    fn window_accepts_zero_width() {
        let w = ValidityWindow::new(WindowField::Key, t0(), t0()).expect("point window");
        assert!(w.contains(t0()));
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        let err = ValidityWindow::new(WindowField::Token, t0() + Duration::seconds(1), t0())
            .expect_err("inverted");
        match err {
            WindowError::Inverted { field, .. } => assert_eq!(field, WindowField::Token),
        }
    }

    #[test]
    fn window_normalizes_timezones_before_comparing() {
        let offset = chrono::FixedOffset::east_opt(5 * 3600).expect("offset");
        let local_start = t0().with_timezone(&offset);
        let local_end = (t0() + Duration::hours(1)).with_timezone(&offset);
        let w = ValidityWindow::new(WindowField::Token, local_start, local_end)
            .expect("normalized bounds are ordered");
        assert_eq!(w.not_before(), t0());
    }

    #[test]
    fn encloses_is_inclusive() {
        let outer = ValidityWindow::new(WindowField::Token, t0(), t0() + Duration::hours(8))
            .expect("outer");
        let inner = ValidityWindow::new(WindowField::Key, t0(), t0() + Duration::hours(8))
            .expect("inner");
        assert!(outer.encloses(&inner));
        assert!(inner.encloses(&outer));
    }

    #[test]
    fn encloses_rejects_overhang() {
        let outer = ValidityWindow::new(WindowField::Token, t0(), t0() + Duration::hours(8))
            .expect("outer");
        let inner = ValidityWindow::new(
            WindowField::Key,
            t0() - Duration::seconds(1),
            t0() + Duration::hours(1),
        )
        .expect("inner");
        assert!(!outer.encloses(&inner));
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(t0());
        assert_eq!(clock.now(), t0());
        clock.advance(Duration::minutes(30));
        assert_eq!(clock.now(), t0() + Duration::minutes(30));
        clock.set(t0());
        assert_eq!(clock.now(), t0());
    }
}
