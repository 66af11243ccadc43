// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic trigger shared by the scheduler and monitor loops.
//!
//! A [`Ticker`] owns a single tokio task that invokes its body once per
//! period. Bodies never overlap: the next tick is only awaited after the
//! previous body returned. Stopping is graceful, a body that is already
//! running is allowed to finish before the task exits.

use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest period a ticker runs at; `tokio::time::interval` rejects zero.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct Ticker {
	name: String,
	period: Duration,
	fire_immediately: bool,
}

impl Ticker {
	pub fn new(name: impl Into<String>, period: Duration) -> Self {
		let name = name.into();
		if period < MIN_PERIOD {
			warn!(
				ticker = %name,
				period_ms = period.as_millis() as u64,
				"Ticker period too short, clamping"
			);
		}
		Self {
			name,
			period: period.max(MIN_PERIOD),
			fire_immediately: false,
		}
	}

	/// Run the first tick right away instead of after one period.
	pub fn fire_immediately(mut self) -> Self {
		self.fire_immediately = true;
		self
	}

	pub fn period(&self) -> Duration {
		self.period
	}

	pub fn spawn<F, Fut>(self, body: F) -> TickerHandle
	where
		F: Fn() -> Fut + Send + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
		let name = self.name.clone();
		let period = self.period;

		let start = if self.fire_immediately {
			Instant::now()
		} else {
			Instant::now() + period
		};

		let handle = tokio::spawn(async move {
			let mut interval = time::interval_at(start, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

			loop {
				tokio::select! {
					biased;
					_ = shutdown_rx.recv() => {
						info!(ticker = %name, "Shutting down ticker");
						break;
					}
					_ = interval.tick() => {
						debug!(ticker = %name, "tick");
						body().await;
					}
				}
			}
		});

		info!(ticker = %self.name, period_secs = period.as_secs_f64(), "Ticker started");

		TickerHandle {
			name: self.name,
			shutdown_tx,
			handle,
		}
	}
}

pub struct TickerHandle {
	name: String,
	shutdown_tx: broadcast::Sender<()>,
	handle: JoinHandle<()>,
}

impl TickerHandle {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}

	/// Signal shutdown and wait for the in-flight tick, if any, to complete.
	pub async fn stop(self) {
		let _ = self.shutdown_tx.send(());
		if let Err(e) = self.handle.await {
			warn!(ticker = %self.name, error = %e, "Ticker task ended abnormally");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::sync::Arc;

	#[tokio::test(start_paused = true)]
	async fn test_ticker_fires_once_per_period() {
		let count = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&count);

		let handle = Ticker::new("counter", Duration::from_secs(10)).spawn(move || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
			}
		});

		time::sleep(Duration::from_secs(35)).await;
		handle.stop().await;

		assert_eq!(count.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_fire_immediately_runs_first_tick_without_delay() {
		let count = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&count);

		let handle = Ticker::new("eager", Duration::from_secs(60))
			.fire_immediately()
			.spawn(move || {
				let counter = Arc::clone(&counter);
				async move {
					counter.fetch_add(1, Ordering::SeqCst);
				}
			});

		time::sleep(Duration::from_secs(1)).await;
		handle.stop().await;

		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_stop_waits_for_in_flight_tick() {
		let finished = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&finished);

		let handle = Ticker::new("slow", Duration::from_secs(60))
			.fire_immediately()
			.spawn(move || {
				let flag = Arc::clone(&flag);
				async move {
					time::sleep(Duration::from_secs(5)).await;
					flag.store(true, Ordering::SeqCst);
				}
			});

		time::sleep(Duration::from_secs(1)).await;
		assert!(!finished.load(Ordering::SeqCst));

		handle.stop().await;
		assert!(finished.load(Ordering::SeqCst));
	}

	#[tokio::test(start_paused = true)]
	async fn test_zero_period_is_clamped() {
		let count = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&count);

		let ticker = Ticker::new("zero", Duration::ZERO);
		assert_eq!(ticker.period(), MIN_PERIOD);

		let handle = ticker.spawn(move || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
			}
		});

		time::sleep(Duration::from_millis(10)).await;
		assert!(!handle.is_finished());
		handle.stop().await;

		assert!(count.load(Ordering::SeqCst) > 0);
	}
}
