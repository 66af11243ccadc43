// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use steward_server_config::ConfigError;
use steward_server_jobs::JobError;
use steward_server_monitor::MonitorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("invalid database URL: {0}")]
	InvalidDatabaseUrl(String),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("job scheduler error: {0}")]
	Jobs(#[from] JobError),

	#[error("monitor error: {0}")]
	Monitor(#[from] MonitorError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
