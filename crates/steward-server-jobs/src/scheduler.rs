// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::context::{CancellationToken, JobContext};
use crate::error::{JobError, Result};
use crate::health::SchedulerSummary;
use crate::job::{FailureOutcome, Job, JobPayload};
use crate::observer::{notify, JobObserver};
use crate::store::{ClaimedJob, JobStore};
use crate::types::{JobId, JobOutput, JobView, Priority};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use steward_common_core::{Clock, SystemClock, Ticker, TickerHandle};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

const DEFAULT_TICK_INTERVAL_SECS: u64 = 30;
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 5 * 60;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 10 * 60;
const DEFAULT_RECURRING_HORIZON_SECS: u64 = 24 * 60 * 60;

/// Upper bound on the number of jobs a single recurring expansion may create.
pub const MAX_RECURRING_OCCURRENCES: u128 = 10_000;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
	pub tick_interval: Duration,
	/// Fixed delay before a failed job becomes eligible again.
	pub retry_backoff: Duration,
	pub default_max_retries: u32,
	pub max_concurrency: usize,
	pub job_timeout: Duration,
	pub recurring_horizon: Duration,
	/// Terminal jobs older than this are evicted at the end of each tick.
	pub history_retention: Option<Duration>,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
			retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
			default_max_retries: DEFAULT_MAX_RETRIES,
			max_concurrency: DEFAULT_MAX_CONCURRENCY,
			job_timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
			recurring_horizon: Duration::from_secs(DEFAULT_RECURRING_HORIZON_SECS),
			history_retention: None,
		}
	}
}

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
	pub claimed: usize,
	pub completed: usize,
	pub retried: usize,
	pub failed: usize,
	/// Jobs whose result could not be recorded, e.g. because they were
	/// force-failed while still executing.
	pub discarded: usize,
	pub evicted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
	Completed,
	Retrying,
	Failed,
	Discarded,
}

impl TickReport {
	fn record(&mut self, outcome: JobOutcome) {
		match outcome {
			JobOutcome::Completed => self.completed += 1,
			JobOutcome::Retrying => self.retried += 1,
			JobOutcome::Failed => self.failed += 1,
			JobOutcome::Discarded => self.discarded += 1,
		}
	}
}

pub(crate) fn chrono_duration(d: Duration) -> chrono::Duration {
	chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

pub struct JobScheduler {
	store: Arc<dyn JobStore>,
	clock: Arc<dyn Clock>,
	config: SchedulerConfig,
	observer: Option<Arc<dyn JobObserver>>,
	tick_lock: Mutex<()>,
	ticker: Mutex<Option<TickerHandle>>,
}

impl JobScheduler {
	pub fn new(store: Arc<dyn JobStore>, config: SchedulerConfig) -> Self {
		Self {
			store,
			clock: Arc::new(SystemClock),
			config,
			observer: None,
			tick_lock: Mutex::new(()),
			ticker: Mutex::new(None),
		}
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
		self.observer = Some(observer);
		self
	}

	pub fn store(&self) -> Arc<dyn JobStore> {
		Arc::clone(&self.store)
	}

	pub fn config(&self) -> &SchedulerConfig {
		&self.config
	}

	#[instrument(skip_all)]
	pub async fn submit(
		&self,
		name: impl Into<String>,
		payload: Arc<dyn JobPayload>,
		at: DateTime<Utc>,
		priority: Priority,
		max_retries: u32,
	) -> Result<JobId> {
		let job = Job::new(name, payload, at, priority, max_retries, self.clock.now())?;
		let view = self.store.insert(job).await;

		info!(
			job_id = %view.id,
			name = %view.name,
			scheduled_time = %view.scheduled_time,
			priority = %view.priority,
			max_retries,
			"Job scheduled"
		);
		notify(self.observer.as_ref(), &view).await;
		Ok(view.id)
	}

	/// Expands a recurring job into independent one-shot jobs, one every
	/// `interval` from now until `horizon` (the configured horizon when
	/// `None`). The first occurrence is due immediately.
	#[instrument(skip_all)]
	pub async fn submit_recurring(
		&self,
		name: impl Into<String>,
		payload: Arc<dyn JobPayload>,
		interval: Duration,
		priority: Priority,
		horizon: Option<Duration>,
	) -> Result<Vec<JobId>> {
		let name = name.into();
		let horizon = horizon.unwrap_or(self.config.recurring_horizon);

		if interval.is_zero() {
			return Err(JobError::InvalidInput(
				"recurring interval must be greater than zero".to_string(),
			));
		}
		if horizon.is_zero() {
			return Err(JobError::InvalidInput(
				"recurring horizon must be greater than zero".to_string(),
			));
		}

		let occurrences = horizon.as_nanos().div_ceil(interval.as_nanos());
		if occurrences > MAX_RECURRING_OCCURRENCES {
			return Err(JobError::InvalidInput(format!(
				"recurring schedule would create {occurrences} jobs (limit {MAX_RECURRING_OCCURRENCES})"
			)));
		}

		let now = self.clock.now();
		let step = chrono_duration(interval);
		let mut jobs = Vec::with_capacity(occurrences as usize);
		for k in 0..occurrences as i32 {
			let scheduled_time = step
				.checked_mul(k)
				.and_then(|offset| now.checked_add_signed(offset))
				.ok_or_else(|| {
					JobError::InvalidInput(format!(
						"recurring occurrence {k} is outside the representable time range"
					))
				})?;
			jobs.push(Job::new(
				format!("{name}_recurring_{k}"),
				Arc::clone(&payload),
				scheduled_time,
				priority,
				self.config.default_max_retries,
				now,
			)?);
		}

		let mut ids = Vec::with_capacity(jobs.len());
		for job in jobs {
			let view = self.store.insert(job).await;
			notify(self.observer.as_ref(), &view).await;
			ids.push(view.id);
		}

		info!(
			name = %name,
			interval_secs = interval.as_secs(),
			count = ids.len(),
			"Recurring job scheduled"
		);
		Ok(ids)
	}

	/// Cancels a pending job. Running and finished jobs are left alone.
	#[instrument(skip(self), fields(job_id = %id))]
	pub async fn cancel(&self, id: &JobId) -> bool {
		match self.store.cancel(id, self.clock.now()).await {
			Some(view) => {
				info!(job_id = %id, "Job cancelled");
				notify(self.observer.as_ref(), &view).await;
				true
			}
			None => {
				warn!(job_id = %id, "Job is not pending, cannot cancel");
				false
			}
		}
	}

	pub async fn status(&self, id: &JobId) -> Option<JobView> {
		self.store.get(id).await
	}

	pub async fn pending_jobs(&self) -> Vec<JobView> {
		self.store.pending().await
	}

	pub async fn summary(&self) -> SchedulerSummary {
		let jobs = self.store.list().await;
		SchedulerSummary::from_jobs(&jobs, self.clock.now(), self.is_running().await)
	}

	pub async fn evict_finished(&self, older_than: Duration) -> usize {
		let cutoff = self.clock.now() - chrono_duration(older_than);
		let evicted = self.store.evict_finished(cutoff).await;
		if evicted > 0 {
			info!(evicted, "Evicted finished jobs");
		}
		evicted
	}

	/// Runs one scheduling pass: claims every due job and executes the batch
	/// on a bounded worker pool. Only one tick runs at a time; a concurrent
	/// call waits for the current one to finish.
	#[instrument(skip(self))]
	pub async fn tick(&self) -> TickReport {
		let _guard = self.tick_lock.lock().await;

		let claimed = self.store.claim_due(self.clock.now()).await;
		let mut report = TickReport {
			claimed: claimed.len(),
			..Default::default()
		};

		if !claimed.is_empty() {
			debug!(count = claimed.len(), "Dispatching due jobs");
			self.dispatch(claimed, &mut report).await;
		}

		if let Some(retention) = self.config.history_retention {
			report.evicted = self.evict_finished(retention).await;
		}

		report
	}

	async fn dispatch(&self, claimed: Vec<ClaimedJob>, report: &mut TickReport) {
		let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
		let worker = Worker {
			store: Arc::clone(&self.store),
			clock: Arc::clone(&self.clock),
			observer: self.observer.clone(),
			backoff: chrono_duration(self.config.retry_backoff),
			timeout: self.config.job_timeout,
		};

		let mut workers = JoinSet::new();
		for job in claimed {
			// Acquired here so jobs start in dispatch order.
			let permit = Arc::clone(&semaphore).acquire_owned().await.ok();
			let worker = worker.clone();
			workers.spawn(async move {
				let _permit = permit;
				worker.run(job).await
			});
		}

		while let Some(joined) = workers.join_next().await {
			match joined {
				Ok(outcome) => report.record(outcome),
				Err(e) => warn!(error = %e, "Job worker ended abnormally"),
			}
		}
	}

	pub async fn is_running(&self) -> bool {
		self.ticker.lock().await.is_some()
	}

	/// Starts the periodic tick loop. The first tick runs immediately.
	#[instrument(skip(self))]
	pub async fn start(self: &Arc<Self>) {
		let mut ticker = self.ticker.lock().await;
		if ticker.is_some() {
			warn!("Job scheduler already running");
			return;
		}

		let scheduler = Arc::clone(self);
		*ticker = Some(
			Ticker::new("job-scheduler", self.config.tick_interval)
				.fire_immediately()
				.spawn(move || {
					let scheduler = Arc::clone(&scheduler);
					async move {
						let report = scheduler.tick().await;
						if report.claimed > 0 {
							info!(
								claimed = report.claimed,
								completed = report.completed,
								retried = report.retried,
								failed = report.failed,
								"Scheduler tick finished"
							);
						}
					}
				}),
		);

		info!(
			tick_interval_secs = self.config.tick_interval.as_secs(),
			max_concurrency = self.config.max_concurrency,
			"Job scheduler started"
		);
	}

	/// Stops the tick loop after the in-flight tick, if any, has finished.
	#[instrument(skip(self))]
	pub async fn stop(&self) {
		let handle = self.ticker.lock().await.take();
		match handle {
			Some(handle) => {
				handle.stop().await;
				info!("Job scheduler shut down");
			}
			None => debug!("Job scheduler was not running"),
		}
	}
}

#[derive(Clone)]
struct Worker {
	store: Arc<dyn JobStore>,
	clock: Arc<dyn Clock>,
	observer: Option<Arc<dyn JobObserver>>,
	backoff: chrono::Duration,
	timeout: Duration,
}

impl Worker {
	async fn run(self, job: ClaimedJob) -> JobOutcome {
		let ClaimedJob { view, payload } = job;
		notify(self.observer.as_ref(), &view).await;

		let ctx = JobContext {
			job_id: view.id.clone(),
			name: view.name.clone(),
			attempt: view.retry_count,
			cancellation_token: CancellationToken::new(),
		};

		info!(job_id = %view.id, name = %view.name, attempt = view.retry_count, "Executing job");
		let result = execute_with_timeout(payload, ctx, self.timeout).await;
		let now = self.clock.now();

		match result {
			Ok(output) => match self.store.complete(&view.id, now).await {
				Ok(done) => {
					info!(job_id = %done.id, name = %done.name, output = %output.message, "Job completed successfully");
					notify(self.observer.as_ref(), &done).await;
					JobOutcome::Completed
				}
				Err(e) => {
					info!(job_id = %view.id, error = %e, "Job finished but its result was discarded");
					JobOutcome::Discarded
				}
			},
			Err(err) => {
				let message = err.failure_message();
				match self
					.store
					.fail(&view.id, now, &message, self.backoff)
					.await
				{
					Ok((FailureOutcome::Retry { next_attempt_at }, updated)) => {
						warn!(
							job_id = %updated.id,
							name = %updated.name,
							retry_count = updated.retry_count,
							max_retries = updated.max_retries,
							next_attempt_at = %next_attempt_at,
							error = %message,
							"Job failed, retry scheduled"
						);
						notify(self.observer.as_ref(), &updated).await;
						JobOutcome::Retrying
					}
					Ok((FailureOutcome::Failed, updated)) => {
						warn!(
							job_id = %updated.id,
							name = %updated.name,
							retry_count = updated.retry_count,
							error = %message,
							"Job failed permanently"
						);
						notify(self.observer.as_ref(), &updated).await;
						JobOutcome::Failed
					}
					Err(e) => {
						info!(job_id = %view.id, error = %e, "Job failed but its result was discarded");
						JobOutcome::Discarded
					}
				}
			}
		}
	}
}

/// Runs the payload in its own task so a panic or hang stays contained.
async fn execute_with_timeout(
	payload: Arc<dyn JobPayload>,
	ctx: JobContext,
	timeout: Duration,
) -> Result<JobOutput> {
	let token = ctx.cancellation_token.clone();
	let mut handle = tokio::spawn(async move { payload.execute(&ctx).await });

	match tokio::time::timeout(timeout, &mut handle).await {
		Ok(Ok(result)) => result,
		Ok(Err(join_error)) => Err(JobError::failed(format!(
			"job execution aborted: {join_error}"
		))),
		Err(_) => {
			token.cancel();
			handle.abort();
			Err(JobError::Timeout(timeout))
		}
	}
}
