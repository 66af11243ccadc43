// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite-backed job history.
//!
//! The scheduler keeps live jobs in memory; this repository mirrors every
//! transition so finished jobs can be inspected after they are evicted or
//! after a restart.

use crate::error::{JobError, Result};
use crate::observer::JobObserver;
use crate::types::{JobId, JobStatus, JobView, Priority};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

type HistoryRow = (
	String,
	String,
	i64,
	String,
	String,
	String,
	Option<String>,
	Option<String>,
	Option<String>,
	i64,
	i64,
);

const SELECT_COLUMNS: &str = "SELECT id, name, priority, status, scheduled_time, created_at, started_at, completed_at, error_message, retry_count, max_retries FROM job_history";

fn format_time(t: DateTime<Utc>) -> String {
	t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s)
		.map(|t| t.with_timezone(&Utc))
		.map_err(|e| JobError::CorruptRecord(format!("bad timestamp {s:?}: {e}")))
}

fn parse_optional_time(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
	s.as_deref().map(parse_time).transpose()
}

fn row_to_view(row: HistoryRow) -> Result<JobView> {
	let (
		id,
		name,
		priority,
		status,
		scheduled_time,
		created_at,
		started_at,
		completed_at,
		error_message,
		retry_count,
		max_retries,
	) = row;

	let priority = u8::try_from(priority)
		.ok()
		.and_then(Priority::from_value)
		.ok_or_else(|| JobError::CorruptRecord(format!("bad priority {priority}")))?;

	Ok(JobView {
		id: JobId::from(id),
		name,
		priority,
		status: status.parse().map_err(JobError::CorruptRecord)?,
		scheduled_time: parse_time(&scheduled_time)?,
		created_at: parse_time(&created_at)?,
		started_at: parse_optional_time(started_at)?,
		completed_at: parse_optional_time(completed_at)?,
		error_message,
		retry_count: retry_count.max(0) as u32,
		max_retries: max_retries.max(0) as u32,
	})
}

#[derive(Clone)]
pub struct JobHistoryRepository {
	pool: SqlitePool,
}

impl JobHistoryRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Creates the history table if it does not exist yet.
	#[tracing::instrument(skip(self))]
	pub async fn migrate(&self) -> Result<()> {
		sqlx::query(
			r#"
			CREATE TABLE IF NOT EXISTS job_history (
				id TEXT PRIMARY KEY,
				name TEXT NOT NULL,
				priority INTEGER NOT NULL,
				status TEXT NOT NULL,
				scheduled_time TEXT NOT NULL,
				created_at TEXT NOT NULL,
				started_at TEXT,
				completed_at TEXT,
				error_message TEXT,
				retry_count INTEGER NOT NULL DEFAULT 0,
				max_retries INTEGER NOT NULL,
				updated_at TEXT NOT NULL
			)
			"#,
		)
		.execute(&self.pool)
		.await?;

		sqlx::query("CREATE INDEX IF NOT EXISTS idx_job_history_status ON job_history(status)")
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self, job), fields(job_id = %job.id, status = %job.status))]
	pub async fn record(&self, job: &JobView) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO job_history (id, name, priority, status, scheduled_time, created_at, started_at, completed_at, error_message, retry_count, max_retries, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				status = excluded.status,
				scheduled_time = excluded.scheduled_time,
				started_at = excluded.started_at,
				completed_at = excluded.completed_at,
				error_message = excluded.error_message,
				retry_count = excluded.retry_count,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(job.id.as_str())
		.bind(&job.name)
		.bind(job.priority.value() as i64)
		.bind(job.status.as_str())
		.bind(format_time(job.scheduled_time))
		.bind(format_time(job.created_at))
		.bind(job.started_at.map(format_time))
		.bind(job.completed_at.map(format_time))
		.bind(&job.error_message)
		.bind(job.retry_count as i64)
		.bind(job.max_retries as i64)
		.bind(format_time(Utc::now()))
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, id: &JobId) -> Result<Option<JobView>> {
		let row = sqlx::query_as::<_, HistoryRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
			.bind(id.as_str())
			.fetch_optional(&self.pool)
			.await?;

		row.map(row_to_view).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_by_status(&self, status: JobStatus, limit: u32) -> Result<Vec<JobView>> {
		let rows = sqlx::query_as::<_, HistoryRow>(&format!(
			"{SELECT_COLUMNS} WHERE status = ? ORDER BY scheduled_time DESC LIMIT ?"
		))
		.bind(status.as_str())
		.bind(limit as i64)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(row_to_view).collect()
	}

	/// Deletes terminal records that finished before `cutoff`.
	#[tracing::instrument(skip(self))]
	pub async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
		let result = sqlx::query(
			r#"
			DELETE FROM job_history
			WHERE completed_at IS NOT NULL
				AND completed_at < ?
				AND status IN ('completed', 'failed', 'cancelled')
			"#,
		)
		.bind(format_time(cutoff))
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected())
	}
}

#[async_trait]
impl JobObserver for JobHistoryRepository {
	async fn on_transition(&self, job: &JobView) -> Result<()> {
		self.record(job).await
	}
}
