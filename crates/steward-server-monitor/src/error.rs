// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::AlertId;
use std::time::Duration;
use steward_server_jobs::JobError;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
	#[error("Probe failed: {0}")]
	Probe(String),

	#[error("Probe already registered: {0}")]
	DuplicateProbe(String),

	#[error("Remediation failed: {0}")]
	Remediation(String),

	#[error("Timed out after {0:?}")]
	Timeout(Duration),

	#[error("Alert not found: {0}")]
	AlertNotFound(AlertId),

	#[error("Invalid input: {0}")]
	InvalidInput(String),

	#[error("Job store error: {0}")]
	Jobs(#[from] JobError),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
