// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::{JobId, JobStatus, JobView, Priority};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Failed-job count at which the scheduler reports itself degraded.
pub const DEGRADED_FAILURE_COUNT: usize = 5;

/// Upcoming jobs listed in a summary.
pub const NEXT_JOBS_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingJob {
	pub id: JobId,
	pub name: String,
	pub scheduled_time: DateTime<Utc>,
	pub priority: Priority,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSummary {
	pub scheduler_running: bool,
	pub total_jobs: usize,
	pub pending_jobs: usize,
	pub running_jobs: usize,
	pub completed_jobs: usize,
	pub failed_jobs: usize,
	pub cancelled_jobs: usize,
	pub next_jobs: Vec<UpcomingJob>,
	pub health_status: HealthState,
}

impl SchedulerSummary {
	pub fn from_jobs(jobs: &[JobView], now: DateTime<Utc>, scheduler_running: bool) -> Self {
		let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();
		let failed_jobs = count(JobStatus::Failed);

		let mut upcoming: Vec<&JobView> = jobs
			.iter()
			.filter(|j| j.status == JobStatus::Pending && j.scheduled_time > now)
			.collect();
		upcoming.sort_by_key(|j| j.scheduled_time);

		Self {
			scheduler_running,
			total_jobs: jobs.len(),
			pending_jobs: count(JobStatus::Pending),
			running_jobs: count(JobStatus::Running),
			completed_jobs: count(JobStatus::Completed),
			failed_jobs,
			cancelled_jobs: count(JobStatus::Cancelled),
			next_jobs: upcoming
				.into_iter()
				.take(NEXT_JOBS_LIMIT)
				.map(|j| UpcomingJob {
					id: j.id.clone(),
					name: j.name.clone(),
					scheduled_time: j.scheduled_time,
					priority: j.priority,
				})
				.collect(),
			health_status: determine_health_state(failed_jobs),
		}
	}
}

fn determine_health_state(failed_jobs: usize) -> HealthState {
	if failed_jobs < DEGRADED_FAILURE_COUNT {
		HealthState::Healthy
	} else {
		HealthState::Degraded
	}
}
