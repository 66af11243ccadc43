// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health monitor configuration section.

use serde::{Deserialize, Serialize};

const DEFAULT_TICK_INTERVAL_SECS: u64 = 300;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REMEDIATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ALERT_RETENTION_DAYS: u32 = 7;
const DEFAULT_STUCK_JOB_THRESHOLD_SECS: u64 = 2 * 60 * 60;
const DEFAULT_FAILURE_WINDOW_SECS: u64 = 24 * 60 * 60;
const DEFAULT_FAILURE_THRESHOLD: usize = 3;
const DEFAULT_NOTIFY_MIN_SEVERITY: &str = "error";

pub const SEVERITY_NAMES: [&str; 4] = ["info", "warning", "error", "critical"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfigLayer {
	pub tick_interval_secs: Option<u64>,
	pub probe_timeout_secs: Option<u64>,
	pub remediation_timeout_secs: Option<u64>,
	pub alert_retention_days: Option<u32>,
	pub stuck_job_threshold_secs: Option<u64>,
	pub stuck_job_auto_resolve: Option<bool>,
	pub failure_window_secs: Option<u64>,
	pub failure_threshold: Option<usize>,
	pub notify_min_severity: Option<String>,
}

impl MonitorConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.tick_interval_secs.is_some() {
			self.tick_interval_secs = other.tick_interval_secs;
		}
		if other.probe_timeout_secs.is_some() {
			self.probe_timeout_secs = other.probe_timeout_secs;
		}
		if other.remediation_timeout_secs.is_some() {
			self.remediation_timeout_secs = other.remediation_timeout_secs;
		}
		if other.alert_retention_days.is_some() {
			self.alert_retention_days = other.alert_retention_days;
		}
		if other.stuck_job_threshold_secs.is_some() {
			self.stuck_job_threshold_secs = other.stuck_job_threshold_secs;
		}
		if other.stuck_job_auto_resolve.is_some() {
			self.stuck_job_auto_resolve = other.stuck_job_auto_resolve;
		}
		if other.failure_window_secs.is_some() {
			self.failure_window_secs = other.failure_window_secs;
		}
		if other.failure_threshold.is_some() {
			self.failure_threshold = other.failure_threshold;
		}
		if other.notify_min_severity.is_some() {
			self.notify_min_severity = other.notify_min_severity;
		}
	}

	pub fn finalize(self) -> MonitorConfig {
		MonitorConfig {
			tick_interval_secs: self.tick_interval_secs.unwrap_or(DEFAULT_TICK_INTERVAL_SECS),
			probe_timeout_secs: self.probe_timeout_secs.unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS),
			remediation_timeout_secs: self
				.remediation_timeout_secs
				.unwrap_or(DEFAULT_REMEDIATION_TIMEOUT_SECS),
			alert_retention_days: self
				.alert_retention_days
				.unwrap_or(DEFAULT_ALERT_RETENTION_DAYS),
			stuck_job_threshold_secs: self
				.stuck_job_threshold_secs
				.unwrap_or(DEFAULT_STUCK_JOB_THRESHOLD_SECS),
			stuck_job_auto_resolve: self.stuck_job_auto_resolve.unwrap_or(true),
			failure_window_secs: self.failure_window_secs.unwrap_or(DEFAULT_FAILURE_WINDOW_SECS),
			failure_threshold: self.failure_threshold.unwrap_or(DEFAULT_FAILURE_THRESHOLD),
			notify_min_severity: self
				.notify_min_severity
				.map(|s| s.to_ascii_lowercase())
				.unwrap_or_else(|| DEFAULT_NOTIFY_MIN_SEVERITY.to_string()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
	pub tick_interval_secs: u64,
	pub probe_timeout_secs: u64,
	pub remediation_timeout_secs: u64,
	pub alert_retention_days: u32,
	pub stuck_job_threshold_secs: u64,
	pub stuck_job_auto_resolve: bool,
	pub failure_window_secs: u64,
	pub failure_threshold: usize,
	pub notify_min_severity: String,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		MonitorConfigLayer::default().finalize()
	}
}
