// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::Finding;
use crate::error::{MonitorError, Result};
use crate::probe::{Probe, ProbeContext};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use steward_server_jobs::JobStore;

pub const JOB_FAILURES_COMPONENT: &str = "job_failures";
pub const DEFAULT_FAILURE_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_FAILURE_THRESHOLD: usize = 3;

/// Warns when too many jobs failed within a sliding window.
pub struct FailureRateProbe {
	store: Arc<dyn JobStore>,
	window: Duration,
	threshold: usize,
}

impl FailureRateProbe {
	pub fn new(store: Arc<dyn JobStore>) -> Self {
		Self {
			store,
			window: DEFAULT_FAILURE_WINDOW,
			threshold: DEFAULT_FAILURE_THRESHOLD,
		}
	}

	pub fn with_window(mut self, window: Duration) -> Self {
		self.window = window;
		self
	}

	pub fn with_threshold(mut self, threshold: usize) -> Self {
		self.threshold = threshold;
		self
	}
}

#[async_trait]
impl Probe for FailureRateProbe {
	fn name(&self) -> &str {
		JOB_FAILURES_COMPONENT
	}

	async fn check(&self, ctx: &ProbeContext) -> Result<Vec<Finding>> {
		let window = chrono::Duration::from_std(self.window)
			.map_err(|e| MonitorError::InvalidInput(format!("failure window: {e}")))?;
		let failed = self.store.failed_since(ctx.now - window).await;

		if failed <= self.threshold {
			return Ok(Vec::new());
		}

		Ok(vec![Finding::warning(
			JOB_FAILURES_COMPONENT,
			format!(
				"{failed} jobs failed in the last {} hours",
				self.window.as_secs() / 3600
			),
		)
		.with_metadata("failed_count", failed as u64)])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use steward_common_core::{Clock, ManualClock};
	use steward_server_jobs::{payload_fn, InMemoryJobStore, Job, JobOutput, Priority};

	async fn failed_jobs(store: &InMemoryJobStore, clock: &ManualClock, count: usize) {
		for i in 0..count {
			let job = Job::new(
				format!("sync-{i}"),
				payload_fn(|_ctx| async move { Ok(JobOutput::message("done")) }),
				clock.now(),
				Priority::Normal,
				0,
				clock.now(),
			)
			.unwrap();
			let view = store.insert(job).await;
			store.claim_due(clock.now()).await;
			store
				.fail(&view.id, clock.now(), "boom", chrono::Duration::minutes(5))
				.await
				.unwrap();
		}
	}

	fn ctx(clock: &ManualClock) -> ProbeContext {
		ProbeContext {
			now: clock.now(),
			last_run: None,
		}
	}

	#[tokio::test]
	async fn test_threshold_is_exclusive() {
		let store = Arc::new(InMemoryJobStore::new());
		let clock = ManualClock::default();
		let probe = FailureRateProbe::new(store.clone());

		failed_jobs(&store, &clock, 3).await;
		assert!(probe.check(&ctx(&clock)).await.unwrap().is_empty());

		failed_jobs(&store, &clock, 1).await;
		let findings = probe.check(&ctx(&clock)).await.unwrap();
		assert_eq!(findings.len(), 1);
		assert!(!findings[0].auto_resolve);
		assert_eq!(findings[0].metadata["failed_count"], 4);
	}

	#[tokio::test]
	async fn test_old_failures_fall_out_of_window() {
		let store = Arc::new(InMemoryJobStore::new());
		let clock = ManualClock::default();
		let probe = FailureRateProbe::new(store.clone());

		failed_jobs(&store, &clock, 5).await;
		clock.advance(chrono::Duration::hours(25));
		assert!(probe.check(&ctx(&clock)).await.unwrap().is_empty());
	}
}
