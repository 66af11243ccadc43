// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job records and the payload trait.
//!
//! A [`Job`] owns its lifecycle state. Every status change goes through one of
//! the transition methods below, which reject moves the state machine does not
//! allow:
//!
//! ```text
//! Pending -> Running -> Completed
//!                    -> Pending   (retry, retry_count <= max_retries)
//!                    -> Failed    (retries exhausted, or force-failed)
//! Pending -> Cancelled
//! ```

use crate::context::JobContext;
use crate::error::{JobError, Result};
use crate::types::{JobId, JobOutput, JobStatus, JobView, Priority};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The unit of work a job executes.
#[async_trait]
pub trait JobPayload: Send + Sync {
	async fn execute(&self, ctx: &JobContext) -> std::result::Result<JobOutput, JobError>;
}

/// Adapts an async closure into a [`JobPayload`].
pub struct FnPayload<F> {
	f: F,
}

pub fn payload_fn<F, Fut>(f: F) -> Arc<dyn JobPayload>
where
	F: Fn(JobContext) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = std::result::Result<JobOutput, JobError>> + Send + 'static,
{
	Arc::new(FnPayload { f })
}

#[async_trait]
impl<F, Fut> JobPayload for FnPayload<F>
where
	F: Fn(JobContext) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = std::result::Result<JobOutput, JobError>> + Send + 'static,
{
	async fn execute(&self, ctx: &JobContext) -> std::result::Result<JobOutput, JobError> {
		(self.f)(ctx.clone()).await
	}
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
	Retry { next_attempt_at: DateTime<Utc> },
	Failed,
}

pub struct Job {
	id: JobId,
	name: String,
	priority: Priority,
	scheduled_time: DateTime<Utc>,
	status: JobStatus,
	created_at: DateTime<Utc>,
	started_at: Option<DateTime<Utc>>,
	completed_at: Option<DateTime<Utc>>,
	error_message: Option<String>,
	retry_count: u32,
	max_retries: u32,
	payload: Arc<dyn JobPayload>,
}

impl Job {
	pub fn new(
		name: impl Into<String>,
		payload: Arc<dyn JobPayload>,
		scheduled_time: DateTime<Utc>,
		priority: Priority,
		max_retries: u32,
		now: DateTime<Utc>,
	) -> Result<Self> {
		let name = name.into();
		if name.trim().is_empty() {
			return Err(JobError::InvalidInput("job name must not be empty".to_string()));
		}

		Ok(Self {
			id: JobId::new(),
			name,
			priority,
			scheduled_time,
			status: JobStatus::Pending,
			created_at: now,
			started_at: None,
			completed_at: None,
			error_message: None,
			retry_count: 0,
			max_retries,
			payload,
		})
	}

	pub fn id(&self) -> &JobId {
		&self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn priority(&self) -> Priority {
		self.priority
	}

	pub fn status(&self) -> JobStatus {
		self.status
	}

	pub fn scheduled_time(&self) -> DateTime<Utc> {
		self.scheduled_time
	}

	pub fn started_at(&self) -> Option<DateTime<Utc>> {
		self.started_at
	}

	pub fn completed_at(&self) -> Option<DateTime<Utc>> {
		self.completed_at
	}

	pub fn retry_count(&self) -> u32 {
		self.retry_count
	}

	pub fn payload(&self) -> Arc<dyn JobPayload> {
		Arc::clone(&self.payload)
	}

	pub fn is_due(&self, now: DateTime<Utc>) -> bool {
		self.status == JobStatus::Pending && self.scheduled_time <= now
	}

	pub fn view(&self) -> JobView {
		JobView {
			id: self.id.clone(),
			name: self.name.clone(),
			priority: self.priority,
			status: self.status,
			scheduled_time: self.scheduled_time,
			created_at: self.created_at,
			started_at: self.started_at,
			completed_at: self.completed_at,
			error_message: self.error_message.clone(),
			retry_count: self.retry_count,
			max_retries: self.max_retries,
		}
	}

	fn require(&self, from: JobStatus, to: JobStatus) -> Result<()> {
		if self.status != from {
			return Err(JobError::InvalidTransition {
				id: self.id.to_string(),
				from: self.status,
				to,
			});
		}
		Ok(())
	}

	pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
		self.require(JobStatus::Pending, JobStatus::Running)?;
		self.status = JobStatus::Running;
		self.started_at = Some(now);
		Ok(())
	}

	pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
		self.require(JobStatus::Running, JobStatus::Completed)?;
		self.status = JobStatus::Completed;
		self.completed_at = Some(now);
		Ok(())
	}

	/// Records a failed attempt and either re-queues the job after `backoff`
	/// or fails it for good. Every failure consumes a retry, whatever its cause.
	pub fn fail(
		&mut self,
		now: DateTime<Utc>,
		message: impl Into<String>,
		backoff: Duration,
	) -> Result<FailureOutcome> {
		self.require(JobStatus::Running, JobStatus::Failed)?;
		self.retry_count += 1;

		if self.retry_count <= self.max_retries {
			let next_attempt_at = now + backoff;
			self.status = JobStatus::Pending;
			self.scheduled_time = next_attempt_at;
			return Ok(FailureOutcome::Retry { next_attempt_at });
		}

		self.status = JobStatus::Failed;
		self.error_message = Some(message.into());
		self.completed_at = Some(now);
		Ok(FailureOutcome::Failed)
	}

	pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
		self.require(JobStatus::Pending, JobStatus::Cancelled)?;
		self.status = JobStatus::Cancelled;
		self.completed_at = Some(now);
		Ok(())
	}

	/// Fails a running job without consuming a retry.
	pub fn force_fail(&mut self, now: DateTime<Utc>, message: impl Into<String>) -> Result<()> {
		self.require(JobStatus::Running, JobStatus::Failed)?;
		self.status = JobStatus::Failed;
		self.error_message = Some(message.into());
		self.completed_at = Some(now);
		Ok(())
	}
}

impl fmt::Debug for Job {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Job")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("priority", &self.priority)
			.field("status", &self.status)
			.field("scheduled_time", &self.scheduled_time)
			.field("retry_count", &self.retry_count)
			.field("max_retries", &self.max_retries)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct NoopPayload;

	#[async_trait]
	impl JobPayload for NoopPayload {
		async fn execute(&self, _ctx: &JobContext) -> std::result::Result<JobOutput, JobError> {
			Ok(JobOutput::message("noop"))
		}
	}

	fn new_job(max_retries: u32) -> Job {
		let now = Utc::now();
		Job::new(
			"nightly-export",
			Arc::new(NoopPayload),
			now,
			Priority::Normal,
			max_retries,
			now,
		)
		.unwrap()
	}

	#[test]
	fn test_new_rejects_blank_name() {
		let now = Utc::now();
		let result = Job::new("  ", Arc::new(NoopPayload), now, Priority::Low, 3, now);
		assert!(matches!(result, Err(JobError::InvalidInput(_))));
	}

	#[test]
	fn test_happy_path_transitions() {
		let mut job = new_job(3);
		let now = Utc::now();
		job.start(now).unwrap();
		assert_eq!(job.status(), JobStatus::Running);
		assert_eq!(job.started_at(), Some(now));
		job.complete(now).unwrap();
		assert_eq!(job.status(), JobStatus::Completed);
		assert_eq!(job.completed_at(), Some(now));
	}

	#[test]
	fn test_fail_requeues_until_ceiling() {
		let mut job = new_job(1);
		let now = Utc::now();
		let backoff = Duration::minutes(5);

		job.start(now).unwrap();
		let outcome = job.fail(now, "boom", backoff).unwrap();
		assert_eq!(
			outcome,
			FailureOutcome::Retry {
				next_attempt_at: now + backoff
			}
		);
		assert_eq!(job.status(), JobStatus::Pending);
		assert_eq!(job.scheduled_time(), now + backoff);
		assert!(job.view().error_message.is_none());

		job.start(now + backoff).unwrap();
		let outcome = job.fail(now + backoff, "boom again", backoff).unwrap();
		assert_eq!(outcome, FailureOutcome::Failed);
		assert_eq!(job.status(), JobStatus::Failed);
		assert_eq!(job.retry_count(), 2);
		assert_eq!(job.view().error_message.as_deref(), Some("boom again"));
	}

	#[test]
	fn test_fails_after_exactly_max_retries_plus_one_attempts() {
		let mut job = new_job(3);
		let mut now = Utc::now();
		let backoff = Duration::minutes(5);

		for attempt in 1..=3 {
			job.start(now).unwrap();
			let outcome = job.fail(now, "bad input", backoff).unwrap();
			assert!(matches!(outcome, FailureOutcome::Retry { .. }));
			assert_eq!(job.retry_count(), attempt);
			now += backoff;
		}

		job.start(now).unwrap();
		assert_eq!(
			job.fail(now, "bad input", backoff).unwrap(),
			FailureOutcome::Failed
		);
		assert_eq!(job.retry_count(), 4);
		assert_eq!(job.status(), JobStatus::Failed);
	}

	#[test]
	fn test_terminal_jobs_never_restart() {
		let now = Utc::now();

		let mut completed = new_job(3);
		completed.start(now).unwrap();
		completed.complete(now).unwrap();
		assert!(completed.start(now).is_err());

		let mut cancelled = new_job(3);
		cancelled.cancel(now).unwrap();
		assert!(cancelled.start(now).is_err());

		let mut failed = new_job(0);
		failed.start(now).unwrap();
		failed.fail(now, "x", Duration::zero()).unwrap();
		assert!(failed.start(now).is_err());
	}

	#[test]
	fn test_cancel_only_from_pending() {
		let now = Utc::now();
		let mut job = new_job(3);
		job.start(now).unwrap();
		let err = job.cancel(now).unwrap_err();
		assert!(matches!(
			err,
			JobError::InvalidTransition {
				from: JobStatus::Running,
				to: JobStatus::Cancelled,
				..
			}
		));
		assert_eq!(job.status(), JobStatus::Running);
	}

	#[test]
	fn test_force_fail_requires_running() {
		let now = Utc::now();
		let mut job = new_job(3);
		assert!(job.force_fail(now, "stuck").is_err());
		job.start(now).unwrap();
		job.force_fail(now, "stuck").unwrap();
		assert_eq!(job.status(), JobStatus::Failed);
		assert_eq!(job.retry_count(), 0);
	}
}
