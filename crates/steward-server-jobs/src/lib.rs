// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Priority job scheduler for Steward.
//!
//! Jobs are submitted with a due time and a priority. A periodic tick claims
//! every due job atomically and executes the batch on a bounded worker pool.
//! Failed attempts are re-queued after a fixed backoff until the job's retry
//! ceiling is reached.

pub mod context;
pub mod error;
pub mod health;
pub mod job;
pub mod observer;
pub mod repository;
pub mod scheduler;
pub mod store;
pub mod types;

pub use context::{CancellationToken, JobContext};
pub use error::{JobError, Result};
pub use health::{HealthState, SchedulerSummary, UpcomingJob};
pub use job::{payload_fn, FailureOutcome, Job, JobPayload};
pub use observer::JobObserver;
pub use repository::JobHistoryRepository;
pub use scheduler::{JobScheduler, SchedulerConfig, TickReport};
pub use store::{ClaimedJob, InMemoryJobStore, JobStore};
pub use types::{JobId, JobOutput, JobStatus, JobView, Priority};
