// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job storage.
//!
//! [`JobStore`] is the seam between the scheduler loop and wherever jobs are
//! kept. Every mutation happens inside the store so that an implementation
//! can hold one lock across select-and-transition; in particular
//! [`JobStore::claim_due`] must move jobs to `Running` atomically so two
//! concurrent callers can never claim the same job.

use crate::error::{JobError, Result};
use crate::job::{FailureOutcome, Job, JobPayload};
use crate::types::{dispatch_order, JobId, JobStatus, JobView};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// A job moved to `Running` by [`JobStore::claim_due`], ready to execute.
#[derive(Clone)]
pub struct ClaimedJob {
	pub view: JobView,
	pub payload: Arc<dyn JobPayload>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
	async fn insert(&self, job: Job) -> JobView;

	async fn get(&self, id: &JobId) -> Option<JobView>;

	async fn list(&self) -> Vec<JobView>;

	/// Selects every pending job due at `now`, in dispatch order, and moves
	/// each one to `Running`.
	async fn claim_due(&self, now: DateTime<Utc>) -> Vec<ClaimedJob>;

	async fn complete(&self, id: &JobId, now: DateTime<Utc>) -> Result<JobView>;

	async fn fail(
		&self,
		id: &JobId,
		now: DateTime<Utc>,
		message: &str,
		backoff: Duration,
	) -> Result<(FailureOutcome, JobView)>;

	/// Cancels a pending job. Returns `None` when the job is unknown or not
	/// pending, leaving it untouched.
	async fn cancel(&self, id: &JobId, now: DateTime<Utc>) -> Option<JobView>;

	async fn force_fail(&self, id: &JobId, now: DateTime<Utc>, message: &str) -> Result<JobView>;

	/// Running jobs whose `started_at` is earlier than `started_before`.
	async fn running_since(&self, started_before: DateTime<Utc>) -> Vec<JobView>;

	/// Number of jobs that reached `Failed` at or after `since`.
	async fn failed_since(&self, since: DateTime<Utc>) -> usize;

	/// Drops terminal jobs that finished before `finished_before`.
	async fn evict_finished(&self, finished_before: DateTime<Utc>) -> usize;

	async fn pending(&self) -> Vec<JobView> {
		let mut pending: Vec<JobView> = self
			.list()
			.await
			.into_iter()
			.filter(|job| job.status == JobStatus::Pending)
			.collect();
		pending.sort_by(dispatch_order);
		pending
	}
}

/// Process-local [`JobStore`] guarded by a single mutex.
#[derive(Default)]
pub struct InMemoryJobStore {
	jobs: Mutex<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn len(&self) -> usize {
		self.jobs.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.jobs.lock().await.is_empty()
	}
}

fn not_found(id: &JobId) -> JobError {
	JobError::NotFound(id.to_string())
}

#[async_trait]
impl JobStore for InMemoryJobStore {
	async fn insert(&self, job: Job) -> JobView {
		let view = job.view();
		self.jobs.lock().await.insert(job.id().clone(), job);
		view
	}

	async fn get(&self, id: &JobId) -> Option<JobView> {
		self.jobs.lock().await.get(id).map(Job::view)
	}

	async fn list(&self) -> Vec<JobView> {
		self.jobs.lock().await.values().map(Job::view).collect()
	}

	async fn claim_due(&self, now: DateTime<Utc>) -> Vec<ClaimedJob> {
		let mut jobs = self.jobs.lock().await;

		let mut due: Vec<JobView> = jobs
			.values()
			.filter(|job| job.is_due(now))
			.map(Job::view)
			.collect();
		due.sort_by(dispatch_order);

		let mut claimed = Vec::with_capacity(due.len());
		for candidate in due {
			let Some(job) = jobs.get_mut(&candidate.id) else {
				continue;
			};
			if let Err(e) = job.start(now) {
				warn!(job_id = %candidate.id, error = %e, "Skipping job that could not be claimed");
				continue;
			}
			claimed.push(ClaimedJob {
				view: job.view(),
				payload: job.payload(),
			});
		}
		claimed
	}

	async fn complete(&self, id: &JobId, now: DateTime<Utc>) -> Result<JobView> {
		let mut jobs = self.jobs.lock().await;
		let job = jobs.get_mut(id).ok_or_else(|| not_found(id))?;
		job.complete(now)?;
		Ok(job.view())
	}

	async fn fail(
		&self,
		id: &JobId,
		now: DateTime<Utc>,
		message: &str,
		backoff: Duration,
	) -> Result<(FailureOutcome, JobView)> {
		let mut jobs = self.jobs.lock().await;
		let job = jobs.get_mut(id).ok_or_else(|| not_found(id))?;
		let outcome = job.fail(now, message, backoff)?;
		Ok((outcome, job.view()))
	}

	async fn cancel(&self, id: &JobId, now: DateTime<Utc>) -> Option<JobView> {
		let mut jobs = self.jobs.lock().await;
		let job = jobs.get_mut(id)?;
		job.cancel(now).ok()?;
		Some(job.view())
	}

	async fn force_fail(&self, id: &JobId, now: DateTime<Utc>, message: &str) -> Result<JobView> {
		let mut jobs = self.jobs.lock().await;
		let job = jobs.get_mut(id).ok_or_else(|| not_found(id))?;
		job.force_fail(now, message)?;
		Ok(job.view())
	}

	async fn running_since(&self, started_before: DateTime<Utc>) -> Vec<JobView> {
		self.jobs
			.lock()
			.await
			.values()
			.filter(|job| {
				job.status() == JobStatus::Running
					&& job.started_at().is_some_and(|started| started < started_before)
			})
			.map(Job::view)
			.collect()
	}

	async fn failed_since(&self, since: DateTime<Utc>) -> usize {
		self.jobs
			.lock()
			.await
			.values()
			.filter(|job| {
				job.status() == JobStatus::Failed
					&& job.completed_at().is_some_and(|finished| finished >= since)
			})
			.count()
	}

	async fn evict_finished(&self, finished_before: DateTime<Utc>) -> usize {
		let mut jobs = self.jobs.lock().await;
		let before = jobs.len();
		jobs.retain(|_, job| {
			!(job.status().is_terminal()
				&& job
					.completed_at()
					.is_some_and(|finished| finished < finished_before))
		});
		before - jobs.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::JobContext;
	use crate::types::{JobOutput, Priority};

	struct NoopPayload;

	#[async_trait]
	impl JobPayload for NoopPayload {
		async fn execute(&self, _ctx: &JobContext) -> std::result::Result<JobOutput, JobError> {
			Ok(JobOutput::message("noop"))
		}
	}

	fn job(name: &str, at: DateTime<Utc>, priority: Priority) -> Job {
		Job::new(name, Arc::new(NoopPayload), at, priority, 3, at).unwrap()
	}

	#[tokio::test]
	async fn test_claim_due_orders_and_marks_running() {
		let store = InMemoryJobStore::new();
		let now = Utc::now();

		store.insert(job("low", now, Priority::Low)).await;
		store.insert(job("urgent", now, Priority::Urgent)).await;
		store
			.insert(job("future", now + Duration::hours(1), Priority::Urgent))
			.await;

		let claimed = store.claim_due(now).await;
		let names: Vec<_> = claimed.iter().map(|c| c.view.name.as_str()).collect();
		assert_eq!(names, vec!["urgent", "low"]);
		assert!(claimed.iter().all(|c| c.view.status == JobStatus::Running));

		assert!(store.claim_due(now).await.is_empty());
	}

	#[tokio::test]
	async fn test_cancel_leaves_running_job_untouched() {
		let store = InMemoryJobStore::new();
		let now = Utc::now();
		let view = store.insert(job("report", now, Priority::Normal)).await;

		store.claim_due(now).await;
		assert!(store.cancel(&view.id, now).await.is_none());
		assert_eq!(
			store.get(&view.id).await.unwrap().status,
			JobStatus::Running
		);
	}

	#[tokio::test]
	async fn test_cancel_unknown_job_returns_none() {
		let store = InMemoryJobStore::new();
		assert!(store
			.cancel(&JobId::from("missing"), Utc::now())
			.await
			.is_none());
	}

	#[tokio::test]
	async fn test_complete_unknown_job_is_not_found() {
		let store = InMemoryJobStore::new();
		let err = store
			.complete(&JobId::from("missing"), Utc::now())
			.await
			.unwrap_err();
		assert!(matches!(err, JobError::NotFound(id) if id == "missing"));
	}

	#[tokio::test]
	async fn test_running_since_and_force_fail() {
		let store = InMemoryJobStore::new();
		let start = Utc::now() - Duration::hours(3);
		let view = store.insert(job("sync", start, Priority::Normal)).await;
		store.claim_due(start).await;

		let stuck = store.running_since(Utc::now() - Duration::hours(2)).await;
		assert_eq!(stuck.len(), 1);
		assert_eq!(stuck[0].id, view.id);

		let failed = store
			.force_fail(&view.id, Utc::now(), "stuck")
			.await
			.unwrap();
		assert_eq!(failed.status, JobStatus::Failed);
		assert_eq!(store.failed_since(Utc::now() - Duration::minutes(1)).await, 1);
		assert!(store
			.running_since(Utc::now() - Duration::hours(2))
			.await
			.is_empty());
	}

	#[tokio::test]
	async fn test_evict_finished_keeps_recent_and_active_jobs() {
		let store = InMemoryJobStore::new();
		let now = Utc::now();
		let old = now - Duration::days(10);

		let done = store.insert(job("old-done", old, Priority::Normal)).await;
		store.insert(job("still-pending", old, Priority::Low)).await;
		store.claim_due(old).await;
		store.complete(&done.id, old).await.unwrap();

		// "still-pending" was claimed as well and is now running, which is never evicted.
		let pending = store.insert(job("fresh", now, Priority::Normal)).await;

		let evicted = store.evict_finished(now - Duration::days(7)).await;
		assert_eq!(evicted, 1);
		assert!(store.get(&done.id).await.is_none());
		assert!(store.get(&pending.id).await.is_some());
		assert_eq!(store.len().await, 2);
	}

	#[tokio::test]
	async fn test_pending_sorted_by_priority_then_time() {
		let store = InMemoryJobStore::new();
		let now = Utc::now();
		store
			.insert(job("normal-later", now + Duration::minutes(10), Priority::Normal))
			.await;
		store
			.insert(job("normal-sooner", now + Duration::minutes(1), Priority::Normal))
			.await;
		store
			.insert(job("high", now + Duration::hours(5), Priority::High))
			.await;

		let names: Vec<_> = store
			.pending()
			.await
			.into_iter()
			.map(|v| v.name)
			.collect();
		assert_eq!(names, vec!["high", "normal-sooner", "normal-later"]);
	}
}
