// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wall-clock abstraction.
//!
//! Both loops read "now" through a [`Clock`] so that due-time selection,
//! backoff and stuck-job thresholds can be driven deterministically in tests.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Manually driven clock for tests and simulations.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
	now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
	pub fn new(start: DateTime<Utc>) -> Self {
		Self {
			now: Arc::new(Mutex::new(start)),
		}
	}

	pub fn set(&self, instant: DateTime<Utc>) {
		*self.lock() = instant;
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.lock();
		*now += by;
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
		// A poisoned guard still holds a valid timestamp.
		self.now.lock().unwrap_or_else(|e| e.into_inner())
	}
}

impl Default for ManualClock {
	fn default() -> Self {
		Self::new(Utc::now())
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.lock()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn test_manual_clock_advance() {
		let start = Utc.with_ymd_and_hms(2025, 7, 28, 9, 0, 0).unwrap();
		let clock = ManualClock::new(start);
		clock.advance(Duration::minutes(5));
		assert_eq!(clock.now(), start + Duration::minutes(5));
	}

	#[test]
	fn test_manual_clock_clones_share_time() {
		let start = Utc.with_ymd_and_hms(2025, 7, 28, 9, 0, 0).unwrap();
		let clock = ManualClock::new(start);
		let other = clock.clone();
		clock.set(start + Duration::hours(2));
		assert_eq!(other.now(), start + Duration::hours(2));
	}

	#[test]
	fn test_system_clock_is_monotonic_enough() {
		let clock = SystemClock;
		let a = clock.now();
		let b = clock.now();
		assert!(b >= a);
	}
}
