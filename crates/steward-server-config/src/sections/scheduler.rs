// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduler configuration section.

use serde::{Deserialize, Serialize};

const DEFAULT_TICK_INTERVAL_SECS: u64 = 30;
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 300;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;
const DEFAULT_RECURRING_HORIZON_HOURS: u64 = 24;
const DEFAULT_HISTORY_RETENTION_DAYS: u32 = 7;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfigLayer {
	pub tick_interval_secs: Option<u64>,
	pub retry_backoff_secs: Option<u64>,
	pub default_max_retries: Option<u32>,
	pub max_concurrency: Option<usize>,
	pub job_timeout_secs: Option<u64>,
	pub recurring_horizon_hours: Option<u64>,
	pub history_retention_days: Option<u32>,
}

impl SchedulerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.tick_interval_secs.is_some() {
			self.tick_interval_secs = other.tick_interval_secs;
		}
		if other.retry_backoff_secs.is_some() {
			self.retry_backoff_secs = other.retry_backoff_secs;
		}
		if other.default_max_retries.is_some() {
			self.default_max_retries = other.default_max_retries;
		}
		if other.max_concurrency.is_some() {
			self.max_concurrency = other.max_concurrency;
		}
		if other.job_timeout_secs.is_some() {
			self.job_timeout_secs = other.job_timeout_secs;
		}
		if other.recurring_horizon_hours.is_some() {
			self.recurring_horizon_hours = other.recurring_horizon_hours;
		}
		if other.history_retention_days.is_some() {
			self.history_retention_days = other.history_retention_days;
		}
	}

	pub fn finalize(self) -> SchedulerConfig {
		SchedulerConfig {
			tick_interval_secs: self.tick_interval_secs.unwrap_or(DEFAULT_TICK_INTERVAL_SECS),
			retry_backoff_secs: self.retry_backoff_secs.unwrap_or(DEFAULT_RETRY_BACKOFF_SECS),
			default_max_retries: self.default_max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
			max_concurrency: self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
			job_timeout_secs: self.job_timeout_secs.unwrap_or(DEFAULT_JOB_TIMEOUT_SECS),
			recurring_horizon_hours: self
				.recurring_horizon_hours
				.unwrap_or(DEFAULT_RECURRING_HORIZON_HOURS),
			history_retention_days: self
				.history_retention_days
				.unwrap_or(DEFAULT_HISTORY_RETENTION_DAYS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
	pub tick_interval_secs: u64,
	pub retry_backoff_secs: u64,
	pub default_max_retries: u32,
	pub max_concurrency: usize,
	pub job_timeout_secs: u64,
	pub recurring_horizon_hours: u64,
	/// Finished jobs are evicted after this many days; 0 keeps them forever.
	pub history_retention_days: u32,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		SchedulerConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = SchedulerConfig::default();
		assert_eq!(config.tick_interval_secs, 30);
		assert_eq!(config.retry_backoff_secs, 300);
		assert_eq!(config.default_max_retries, 3);
		assert_eq!(config.max_concurrency, 4);
		assert_eq!(config.recurring_horizon_hours, 24);
		assert_eq!(config.history_retention_days, 7);
	}

	#[test]
	fn test_merge_overwrites_only_set_fields() {
		let mut base = SchedulerConfigLayer {
			tick_interval_secs: Some(10),
			max_concurrency: Some(2),
			..Default::default()
		};
		base.merge(SchedulerConfigLayer {
			max_concurrency: Some(8),
			..Default::default()
		});
		assert_eq!(base.tick_interval_secs, Some(10));
		assert_eq!(base.max_concurrency, Some(8));
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let layer: SchedulerConfigLayer = toml::from_str("retry_backoff_secs = 60").unwrap();
		assert_eq!(layer.retry_backoff_secs, Some(60));
		assert!(layer.tick_interval_secs.is_none());
		assert_eq!(layer.finalize().tick_interval_secs, 30);
	}
}
