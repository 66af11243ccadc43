// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::JobStatus;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
	#[error("Job failed: {message}")]
	Failed { message: String },

	#[error("Job cancelled")]
	Cancelled,

	#[error("Job timed out after {0:?}")]
	Timeout(Duration),

	#[error("Invalid input: {0}")]
	InvalidInput(String),

	#[error("Job not found: {0}")]
	NotFound(String),

	#[error("Invalid transition for job {id}: {from} -> {to}")]
	InvalidTransition {
		id: String,
		from: JobStatus,
		to: JobStatus,
	},

	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("Corrupt history record: {0}")]
	CorruptRecord(String),
}

impl JobError {
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed {
			message: message.into(),
		}
	}

	/// Message recorded on the job when this error ends it.
	pub fn failure_message(&self) -> String {
		match self {
			JobError::Failed { message } => message.clone(),
			other => other.to_string(),
		}
	}
}

pub type Result<T> = std::result::Result<T, JobError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_failure_message_strips_prefix_for_failed() {
		assert_eq!(JobError::failed("disk full").failure_message(), "disk full");
		assert_eq!(
			JobError::Cancelled.failure_message(),
			"Job cancelled".to_string()
		);
	}

	#[test]
	fn test_failure_message_keeps_variant_context() {
		assert_eq!(
			JobError::InvalidInput("missing template".to_string()).failure_message(),
			"Invalid input: missing template"
		);
		assert_eq!(
			JobError::Timeout(Duration::from_secs(3)).failure_message(),
			"Job timed out after 3s"
		);
	}
}
