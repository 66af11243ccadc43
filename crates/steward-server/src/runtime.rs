// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wires the scheduler, the monitor and their built-in probes from configuration.

use std::sync::Arc;
use std::time::Duration;

use steward_common_core::{Clock, SystemClock, Ticker, TickerHandle};
use steward_server_config::{self as config, ConfigError, StewardConfig};
use steward_server_jobs::{
	InMemoryJobStore, JobHistoryRepository, JobScheduler, JobStore, SchedulerConfig,
};
use steward_server_monitor::probes::{
	FailureRateProbe, ForceFailStuckJob, PersistenceProbe, PingTarget, Recheck, StuckJobProbe,
	DATABASE_COMPONENT, STUCK_JOB_COMPONENT,
};
use steward_server_monitor::{
	Alert, BroadcastNotifier, InMemoryAlertStore, Monitor, MonitorConfig, Severity,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, instrument, warn};

use crate::db::{create_pool, SqlitePing};
use crate::error::Result;

pub const ALERT_CHANNEL_CAPACITY: usize = 256;
pub const HISTORY_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

const SECS_PER_HOUR: u64 = 60 * 60;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

fn retention_days(days: u32) -> Option<Duration> {
	(days > 0).then(|| Duration::from_secs(u64::from(days) * SECS_PER_DAY))
}

pub fn scheduler_config(section: &config::SchedulerConfig) -> SchedulerConfig {
	SchedulerConfig {
		tick_interval: Duration::from_secs(section.tick_interval_secs),
		retry_backoff: Duration::from_secs(section.retry_backoff_secs),
		default_max_retries: section.default_max_retries,
		max_concurrency: section.max_concurrency,
		job_timeout: Duration::from_secs(section.job_timeout_secs),
		recurring_horizon: Duration::from_secs(
			section.recurring_horizon_hours.saturating_mul(SECS_PER_HOUR),
		),
		history_retention: retention_days(section.history_retention_days),
	}
}

pub fn monitor_config(section: &config::MonitorConfig) -> Result<MonitorConfig> {
	let notify_min_severity: Severity =
		section
			.notify_min_severity
			.parse()
			.map_err(|message| ConfigError::InvalidValue {
				key: "monitor.notify_min_severity".to_string(),
				message,
			})?;

	Ok(MonitorConfig {
		tick_interval: Duration::from_secs(section.tick_interval_secs),
		probe_timeout: Duration::from_secs(section.probe_timeout_secs),
		remediation_timeout: Duration::from_secs(section.remediation_timeout_secs),
		alert_retention: retention_days(section.alert_retention_days),
		notify_min_severity,
	})
}

/// A fully wired scheduler and monitor sharing one job store.
pub struct Steward {
	scheduler: Arc<JobScheduler>,
	monitor: Arc<Monitor>,
	notifier: BroadcastNotifier,
	history: Option<JobHistoryRepository>,
	history_retention: Option<Duration>,
	clock: Arc<dyn Clock>,
	cleanup: Mutex<Option<TickerHandle>>,
}

impl Steward {
	pub async fn build(config: &StewardConfig) -> Result<Self> {
		Self::build_with_clock(config, Arc::new(SystemClock)).await
	}

	#[instrument(skip_all)]
	pub async fn build_with_clock(config: &StewardConfig, clock: Arc<dyn Clock>) -> Result<Self> {
		let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
		let mut scheduler = JobScheduler::new(Arc::clone(&store), scheduler_config(&config.scheduler))
			.with_clock(Arc::clone(&clock));

		let pool = match &config.database.url {
			Some(url) => Some(create_pool(url).await?),
			None => None,
		};

		let history = match &pool {
			Some(pool) => {
				let repo = JobHistoryRepository::new(pool.clone());
				repo.migrate().await?;
				scheduler = scheduler.with_observer(Arc::new(repo.clone()));
				Some(repo)
			}
			None => None,
		};

		let notifier = BroadcastNotifier::new(ALERT_CHANNEL_CAPACITY);
		let monitor = Monitor::new(
			Arc::new(InMemoryAlertStore::new()),
			monitor_config(&config.monitor)?,
		)
		.with_clock(Arc::clone(&clock))
		.with_notifier(Arc::new(notifier.clone()));

		let section = &config.monitor;
		monitor
			.register_probe(Arc::new(
				StuckJobProbe::new(Arc::clone(&store))
					.with_threshold(Duration::from_secs(section.stuck_job_threshold_secs))
					.with_auto_resolve(section.stuck_job_auto_resolve),
			))
			.await?;
		monitor
			.register_probe(Arc::new(
				FailureRateProbe::new(Arc::clone(&store))
					.with_window(Duration::from_secs(section.failure_window_secs))
					.with_threshold(section.failure_threshold),
			))
			.await?;
		let mut force_fail = ForceFailStuckJob::new(Arc::clone(&store), Arc::clone(&clock));
		if let Some(repo) = &history {
			force_fail = force_fail.with_observer(Arc::new(repo.clone()));
		}
		monitor
			.register_remediator(STUCK_JOB_COMPONENT, Arc::new(force_fail))
			.await;

		if let Some(pool) = pool {
			let target: Arc<dyn PingTarget> = Arc::new(SqlitePing::new(pool));
			monitor
				.register_probe(Arc::new(PersistenceProbe::new(Arc::clone(&target))))
				.await?;
			monitor
				.register_remediator(DATABASE_COMPONENT, Arc::new(Recheck::new(target)))
				.await;
		}

		info!(
			history = history.is_some(),
			probes = ?monitor.probe_names().await,
			"Steward runtime built"
		);

		Ok(Self {
			scheduler: Arc::new(scheduler),
			monitor: Arc::new(monitor),
			notifier,
			history,
			history_retention: retention_days(config.scheduler.history_retention_days),
			clock,
			cleanup: Mutex::new(None),
		})
	}

	pub fn scheduler(&self) -> &Arc<JobScheduler> {
		&self.scheduler
	}

	pub fn monitor(&self) -> &Arc<Monitor> {
		&self.monitor
	}

	pub fn history(&self) -> Option<&JobHistoryRepository> {
		self.history.as_ref()
	}

	/// Receives every alert at or above the configured notify severity.
	pub fn subscribe_alerts(&self) -> broadcast::Receiver<Alert> {
		self.notifier.subscribe()
	}

	/// Deletes history rows past the retention window. Returns rows removed.
	pub async fn cleanup_history(&self) -> Result<u64> {
		let (Some(repo), Some(retention)) = (&self.history, self.history_retention) else {
			return Ok(0);
		};
		let cutoff = self.clock.now()
			- chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::days(36_500));
		Ok(repo.cleanup_older_than(cutoff).await?)
	}

	#[instrument(skip(self))]
	pub async fn start(self: &Arc<Self>) {
		self.scheduler.start().await;
		self.monitor.start().await;

		if self.history.is_some() && self.history_retention.is_some() {
			let mut cleanup = self.cleanup.lock().await;
			if cleanup.is_none() {
				let steward = Arc::clone(self);
				*cleanup = Some(Ticker::new("history-cleanup", HISTORY_CLEANUP_INTERVAL).spawn(
					move || {
						let steward = Arc::clone(&steward);
						async move {
							match steward.cleanup_history().await {
								Ok(0) => {}
								Ok(deleted) => info!(deleted, "Pruned job history"),
								Err(e) => warn!(error = %e, "Job history cleanup failed"),
							}
						}
					},
				));
			}
		}

		info!("Steward started");
	}

	#[instrument(skip(self))]
	pub async fn stop(&self) {
		self.monitor.stop().await;
		self.scheduler.stop().await;
		if let Some(handle) = self.cleanup.lock().await.take() {
			handle.stop().await;
		}
		info!("Steward stopped");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_scheduler_config_conversion() {
		let section = config::SchedulerConfig {
			recurring_horizon_hours: 2,
			history_retention_days: 0,
			..Default::default()
		};
		let converted = scheduler_config(&section);
		assert_eq!(converted.tick_interval, Duration::from_secs(30));
		assert_eq!(converted.retry_backoff, Duration::from_secs(300));
		assert_eq!(converted.recurring_horizon, Duration::from_secs(7200));
		assert!(converted.history_retention.is_none());
	}

	#[test]
	fn test_history_retention_in_days() {
		let section = config::SchedulerConfig {
			history_retention_days: 3,
			..Default::default()
		};
		assert_eq!(
			scheduler_config(&section).history_retention,
			Some(Duration::from_secs(3 * 24 * 60 * 60))
		);
	}

	#[test]
	fn test_monitor_config_conversion() {
		let section = config::MonitorConfig {
			notify_min_severity: "warning".to_string(),
			..Default::default()
		};
		let converted = monitor_config(&section).unwrap();
		assert_eq!(converted.notify_min_severity, Severity::Warning);
		assert_eq!(converted.tick_interval, Duration::from_secs(300));
		assert_eq!(
			converted.alert_retention,
			Some(Duration::from_secs(7 * 24 * 60 * 60))
		);
	}

	#[test]
	fn test_zero_alert_retention_keeps_alerts_forever() {
		let section = config::MonitorConfig {
			alert_retention_days: 0,
			..Default::default()
		};
		assert!(monitor_config(&section).unwrap().alert_retention.is_none());
	}

	#[test]
	fn test_monitor_config_rejects_unknown_severity() {
		let section = config::MonitorConfig {
			notify_min_severity: "panic".to_string(),
			..Default::default()
		};
		assert!(monitor_config(&section).is_err());
	}
}
