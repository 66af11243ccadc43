// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite pool for the job history sink and the reachability probe it backs.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use steward_server_monitor::probes::PingTarget;
use steward_server_monitor::MonitorError;

use crate::error::{Result, ServerError};

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| ServerError::InvalidDatabaseUrl(e.to_string()))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

/// Round-trips `SELECT 1` through the pool.
#[derive(Clone)]
pub struct SqlitePing {
	pool: SqlitePool,
}

impl SqlitePing {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl PingTarget for SqlitePing {
	async fn ping(&self) -> steward_server_monitor::Result<()> {
		sqlx::query("SELECT 1")
			.execute(&self.pool)
			.await
			.map_err(|e| MonitorError::Probe(e.to_string()))?;
		Ok(())
	}
}
