// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Opaque job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
	pub fn new() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Default for JobId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<String> for JobId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

impl From<&str> for JobId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
	Low = 1,
	#[default]
	Normal = 2,
	High = 3,
	Urgent = 4,
}

impl Priority {
	pub fn as_str(&self) -> &'static str {
		match self {
			Priority::Low => "low",
			Priority::Normal => "normal",
			Priority::High => "high",
			Priority::Urgent => "urgent",
		}
	}

	pub fn value(&self) -> u8 {
		*self as u8
	}

	pub fn from_value(value: u8) -> Option<Self> {
		match value {
			1 => Some(Priority::Low),
			2 => Some(Priority::Normal),
			3 => Some(Priority::High),
			4 => Some(Priority::Urgent),
			_ => None,
		}
	}
}

impl fmt::Display for Priority {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Priority {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"low" => Ok(Priority::Low),
			"normal" => Ok(Priority::Normal),
			"high" => Ok(Priority::High),
			"urgent" => Ok(Priority::Urgent),
			_ => Err(format!("unknown priority: {s}")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Pending,
	Running,
	Completed,
	Failed,
	Cancelled,
}

impl JobStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobStatus::Pending => "pending",
			JobStatus::Running => "running",
			JobStatus::Completed => "completed",
			JobStatus::Failed => "failed",
			JobStatus::Cancelled => "cancelled",
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
		)
	}
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for JobStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(JobStatus::Pending),
			"running" => Ok(JobStatus::Running),
			"completed" => Ok(JobStatus::Completed),
			"failed" => Ok(JobStatus::Failed),
			"cancelled" => Ok(JobStatus::Cancelled),
			_ => Err(format!("unknown job status: {s}")),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
	pub message: String,
	pub metadata: Option<serde_json::Value>,
}

impl JobOutput {
	pub fn message(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			metadata: None,
		}
	}
}

/// Read-only snapshot of a job, without its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
	pub id: JobId,
	pub name: String,
	pub priority: Priority,
	pub status: JobStatus,
	pub scheduled_time: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub started_at: Option<DateTime<Utc>>,
	pub completed_at: Option<DateTime<Utc>>,
	pub error_message: Option<String>,
	pub retry_count: u32,
	pub max_retries: u32,
}

/// Order in which due jobs are dispatched: highest priority first, then the
/// earliest scheduled time, then creation order.
pub fn dispatch_order(a: &JobView, b: &JobView) -> Ordering {
	b.priority
		.cmp(&a.priority)
		.then_with(|| a.scheduled_time.cmp(&b.scheduled_time))
		.then_with(|| a.created_at.cmp(&b.created_at))
		.then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_priority_values_match_levels() {
		assert_eq!(Priority::Low.value(), 1);
		assert_eq!(Priority::Normal.value(), 2);
		assert_eq!(Priority::High.value(), 3);
		assert_eq!(Priority::Urgent.value(), 4);
		assert!(Priority::Urgent > Priority::High);
		assert!(Priority::Low < Priority::Normal);
	}

	#[test]
	fn test_priority_from_value_rejects_out_of_range() {
		assert_eq!(Priority::from_value(3), Some(Priority::High));
		assert_eq!(Priority::from_value(0), None);
		assert_eq!(Priority::from_value(5), None);
	}

	#[test]
	fn test_status_terminal() {
		assert!(!JobStatus::Pending.is_terminal());
		assert!(!JobStatus::Running.is_terminal());
		assert!(JobStatus::Completed.is_terminal());
		assert!(JobStatus::Failed.is_terminal());
		assert!(JobStatus::Cancelled.is_terminal());
	}

	#[test]
	fn test_status_serializes_snake_case() {
		let json = serde_json::to_string(&JobStatus::Cancelled).unwrap();
		assert_eq!(json, "\"cancelled\"");
		assert_eq!("running".parse::<JobStatus>().unwrap(), JobStatus::Running);
		assert!("stuck".parse::<JobStatus>().is_err());
	}

	fn view(id: &str, priority: Priority, offset_secs: i64) -> JobView {
		let base = DateTime::from_timestamp(1_750_000_000, 0).unwrap();
		JobView {
			id: JobId::from(id),
			name: id.to_string(),
			priority,
			status: JobStatus::Pending,
			scheduled_time: base + chrono::Duration::seconds(offset_secs),
			created_at: base,
			started_at: None,
			completed_at: None,
			error_message: None,
			retry_count: 0,
			max_retries: 3,
		}
	}

	#[test]
	fn test_dispatch_order_priority_then_time() {
		let mut views = vec![
			view("low-early", Priority::Low, 0),
			view("high-late", Priority::High, 60),
			view("high-early", Priority::High, 10),
		];
		views.sort_by(dispatch_order);
		let ids: Vec<_> = views.iter().map(|v| v.id.as_str()).collect();
		assert_eq!(ids, vec!["high-early", "high-late", "low-early"]);
	}

	proptest! {
		#[test]
		fn dispatch_order_never_places_lower_priority_first(
			entries in prop::collection::vec((1u8..=4, -3600i64..3600), 1..40)
		) {
			let mut views: Vec<JobView> = entries
				.iter()
				.enumerate()
				.map(|(i, (p, offset))| {
					view(&format!("job-{i}"), Priority::from_value(*p).unwrap(), *offset)
				})
				.collect();
			views.sort_by(dispatch_order);
			for pair in views.windows(2) {
				prop_assert!(pair[0].priority >= pair[1].priority);
				if pair[0].priority == pair[1].priority {
					prop_assert!(pair[0].scheduled_time <= pair[1].scheduled_time);
				}
			}
		}
	}
}
