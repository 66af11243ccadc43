// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::{Alert, Finding};
use crate::error::{MonitorError, Result};
use crate::probe::{Probe, ProbeContext};
use crate::remediation::Remediator;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use steward_common_core::Clock;
use steward_server_jobs::{JobId, JobObserver, JobStore};
use tracing::warn;

pub const STUCK_JOB_COMPONENT: &str = "job_stuck";
pub const DEFAULT_STUCK_THRESHOLD: Duration = Duration::from_secs(2 * 60 * 60);

/// Error recorded on a job that was force-failed for running too long.
pub const STUCK_JOB_MESSAGE: &str = "Job force-failed after exceeding the stuck-job threshold";

/// Reports jobs that have been running longer than a threshold.
pub struct StuckJobProbe {
	store: Arc<dyn JobStore>,
	threshold: Duration,
	auto_resolve: bool,
}

impl StuckJobProbe {
	pub fn new(store: Arc<dyn JobStore>) -> Self {
		Self {
			store,
			threshold: DEFAULT_STUCK_THRESHOLD,
			auto_resolve: true,
		}
	}

	pub fn with_threshold(mut self, threshold: Duration) -> Self {
		self.threshold = threshold;
		self
	}

	pub fn with_auto_resolve(mut self, auto_resolve: bool) -> Self {
		self.auto_resolve = auto_resolve;
		self
	}
}

#[async_trait]
impl Probe for StuckJobProbe {
	fn name(&self) -> &str {
		"stuck_jobs"
	}

	async fn check(&self, ctx: &ProbeContext) -> Result<Vec<Finding>> {
		let threshold = chrono::Duration::from_std(self.threshold)
			.map_err(|e| MonitorError::InvalidInput(format!("stuck threshold: {e}")))?;
		let stuck = self.store.running_since(ctx.now - threshold).await;

		Ok(stuck
			.into_iter()
			.map(|job| {
				let minutes = job
					.started_at
					.map(|started| (ctx.now - started).num_minutes())
					.unwrap_or_default();
				Finding::warning(
					STUCK_JOB_COMPONENT,
					format!("job {} has been running for {minutes} minutes", job.name),
				)
				.auto_resolve(self.auto_resolve)
				.with_metadata("job_id", job.id.to_string())
				.with_metadata("job_name", job.name)
			})
			.collect())
	}
}

/// Force-fails the job referenced by a stuck-job alert.
pub struct ForceFailStuckJob {
	store: Arc<dyn JobStore>,
	clock: Arc<dyn Clock>,
	observer: Option<Arc<dyn JobObserver>>,
}

impl ForceFailStuckJob {
	pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>) -> Self {
		Self {
			store,
			clock,
			observer: None,
		}
	}

	/// Reports the forced transition to the same observer the scheduler uses.
	pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
		self.observer = Some(observer);
		self
	}
}

#[async_trait]
impl Remediator for ForceFailStuckJob {
	async fn remediate(&self, alert: &Alert) -> Result<String> {
		let job_id = alert
			.metadata_str("job_id")
			.ok_or_else(|| MonitorError::Remediation("alert has no job_id".to_string()))?;
		let id = JobId::from(job_id);

		let view = self
			.store
			.force_fail(&id, self.clock.now(), STUCK_JOB_MESSAGE)
			.await?;
		if let Some(observer) = &self.observer {
			if let Err(e) = observer.on_transition(&view).await {
				warn!(job_id = %id, error = %e, "Job observer failed");
			}
		}
		Ok(format!("force-failed stuck job {id}"))
	}
}
