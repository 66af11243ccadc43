// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::{Alert, Finding, Severity};
use crate::error::{MonitorError, Result};
use crate::notifier::AlertNotifier;
use crate::probe::{Probe, ProbeContext, ProbeRegistry};
use crate::remediation::{Remediator, RemediatorRegistry};
use crate::store::AlertStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use steward_common_core::{Clock, SystemClock, Ticker, TickerHandle};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_TICK_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REMEDIATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ALERT_RETENTION_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
	pub tick_interval: Duration,
	pub probe_timeout: Duration,
	pub remediation_timeout: Duration,
	/// Resolved alerts older than this are purged at the end of each tick.
	/// `None` keeps them forever.
	pub alert_retention: Option<Duration>,
	/// Alerts below this severity are not forwarded to the notifier.
	pub notify_min_severity: Severity,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self {
			tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
			probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
			remediation_timeout: Duration::from_secs(DEFAULT_REMEDIATION_TIMEOUT_SECS),
			alert_retention: Some(Duration::from_secs(DEFAULT_ALERT_RETENTION_SECS)),
			notify_min_severity: Severity::Error,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorTickReport {
	pub probes_run: usize,
	pub probes_failed: usize,
	pub alerts_raised: usize,
	pub alerts_resolved: usize,
	pub purged: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
	pub total_alerts: usize,
	pub active_alerts: usize,
	pub resolved_alerts: usize,
	/// Active alerts per severity.
	pub by_severity: BTreeMap<String, usize>,
	/// Active alerts per component.
	pub by_component: BTreeMap<String, usize>,
	pub last_run: BTreeMap<String, DateTime<Utc>>,
	pub last_check: Option<DateTime<Utc>>,
	pub monitoring_active: bool,
}

pub struct Monitor {
	store: Arc<dyn AlertStore>,
	clock: Arc<dyn Clock>,
	config: MonitorConfig,
	notifier: Option<Arc<dyn AlertNotifier>>,
	probes: RwLock<ProbeRegistry>,
	remediators: RwLock<RemediatorRegistry>,
	last_run: Mutex<HashMap<String, DateTime<Utc>>>,
	last_check: Mutex<Option<DateTime<Utc>>>,
	tick_lock: Mutex<()>,
	ticker: Mutex<Option<TickerHandle>>,
}

impl Monitor {
	pub fn new(store: Arc<dyn AlertStore>, config: MonitorConfig) -> Self {
		Self {
			store,
			clock: Arc::new(SystemClock),
			config,
			notifier: None,
			probes: RwLock::new(ProbeRegistry::new()),
			remediators: RwLock::new(RemediatorRegistry::new()),
			last_run: Mutex::new(HashMap::new()),
			last_check: Mutex::new(None),
			tick_lock: Mutex::new(()),
			ticker: Mutex::new(None),
		}
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn with_notifier(mut self, notifier: Arc<dyn AlertNotifier>) -> Self {
		self.notifier = Some(notifier);
		self
	}

	pub fn config(&self) -> &MonitorConfig {
		&self.config
	}

	pub fn store(&self) -> Arc<dyn AlertStore> {
		Arc::clone(&self.store)
	}

	#[instrument(skip_all, fields(probe = %probe.name()))]
	pub async fn register_probe(&self, probe: Arc<dyn Probe>) -> Result<()> {
		let name = probe.name().to_string();
		self.probes.write().await.register(probe)?;
		info!(probe = %name, "Probe registered");
		Ok(())
	}

	pub async fn probe_names(&self) -> Vec<String> {
		self.probes.read().await.names()
	}

	pub async fn register_remediator(
		&self,
		component: impl Into<String>,
		handler: Arc<dyn Remediator>,
	) {
		let component = component.into();
		let replaced = self
			.remediators
			.write()
			.await
			.insert(component.clone(), handler);
		info!(component = %component, replaced, "Remediation handler registered");
	}

	/// Runs every registered probe once, raising an alert per finding.
	#[instrument(skip(self))]
	pub async fn tick(&self) -> MonitorTickReport {
		let _guard = self.tick_lock.lock().await;
		let probes = self.probes.read().await.snapshot();
		let mut report = MonitorTickReport::default();

		for probe in probes {
			let name = probe.name().to_string();
			let ctx = ProbeContext {
				now: self.clock.now(),
				last_run: self.last_run.lock().await.get(&name).copied(),
			};
			report.probes_run += 1;

			let findings = match run_probe(probe, ctx, self.config.probe_timeout).await {
				Ok(findings) => {
					self.last_run.lock().await.insert(name.clone(), ctx.now);
					debug!(probe = %name, findings = findings.len(), "Probe finished");
					findings
				}
				Err(e) => {
					report.probes_failed += 1;
					warn!(probe = %name, error = %e, "Probe failed");
					vec![Finding::error(name.clone(), format!("probe {name} failed: {e}"))
						.auto_resolve(true)
						.with_metadata("probe", name.clone())]
				}
			};

			for finding in findings {
				let alert = self.raise(finding).await;
				report.alerts_raised += 1;
				if alert.resolved {
					report.alerts_resolved += 1;
				}
			}
		}

		let now = self.clock.now();
		report.purged = self.purge_resolved(now).await;
		*self.last_check.lock().await = Some(now);

		report
	}

	async fn purge_resolved(&self, now: DateTime<Utc>) -> usize {
		let Some(retention) = self.config.alert_retention else {
			return 0;
		};
		let retention =
			chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::days(36_500));
		let Some(cutoff) = now.checked_sub_signed(retention) else {
			return 0;
		};
		let purged = self.store.purge_resolved(cutoff).await;
		if purged > 0 {
			info!(purged, "Purged resolved alerts");
		}
		purged
	}

	/// Records an alert and, for auto-resolving alerts, attempts remediation
	/// once. Returns the alert as stored afterwards.
	#[instrument(skip_all, fields(component = %component, severity = %severity))]
	pub async fn raise_alert(
		&self,
		severity: Severity,
		component: &str,
		message: impl Into<String>,
		auto_resolve: bool,
		metadata: Map<String, Value>,
	) -> Alert {
		let mut finding = Finding::new(severity, component, message).auto_resolve(auto_resolve);
		finding.metadata = metadata;
		self.raise(finding).await
	}

	async fn raise(&self, finding: Finding) -> Alert {
		let alert = self.store.append(finding, self.clock.now()).await;
		log_alert(&alert);

		if let Some(notifier) = &self.notifier {
			if alert.severity >= self.config.notify_min_severity {
				if let Err(e) = notifier.notify(&alert).await {
					warn!(alert_id = %alert.id, error = %e, "Alert notification failed");
				}
			}
		}

		if !alert.auto_resolve {
			return alert;
		}

		self.remediate(&alert).await;
		self.store.get(alert.id).await.unwrap_or(alert)
	}

	/// Runs the remediation handler for the alert's component. Returns true
	/// when the alert ended up resolved.
	#[instrument(skip(self, alert), fields(alert_id = %alert.id, component = %alert.component))]
	pub async fn remediate(&self, alert: &Alert) -> bool {
		if alert.resolved {
			return true;
		}

		let Some(handler) = self.remediators.read().await.get(&alert.component) else {
			debug!(component = %alert.component, "No remediation handler for component");
			return false;
		};

		match run_remediation(handler, alert.clone(), self.config.remediation_timeout).await {
			Ok(resolution) => match self.store.resolve(alert.id, &resolution).await {
				Ok(resolved) => {
					info!(
						alert_id = %resolved.id,
						component = %resolved.component,
						resolution = %resolution,
						"Alert auto-resolved"
					);
					true
				}
				Err(e) => {
					warn!(alert_id = %alert.id, error = %e, "Could not record remediation");
					false
				}
			},
			Err(e) => {
				warn!(alert_id = %alert.id, component = %alert.component, error = %e, "Remediation failed");
				false
			}
		}
	}

	pub async fn alerts(&self) -> Vec<Alert> {
		self.store.all().await
	}

	pub async fn active_alerts(&self) -> Vec<Alert> {
		self.store.active().await
	}

	pub async fn summary(&self) -> AlertSummary {
		let alerts = self.store.all().await;
		let mut by_severity = BTreeMap::new();
		let mut by_component = BTreeMap::new();
		let mut active_alerts = 0;

		for alert in alerts.iter().filter(|a| !a.resolved) {
			active_alerts += 1;
			*by_severity
				.entry(alert.severity.as_str().to_string())
				.or_insert(0) += 1;
			*by_component.entry(alert.component.clone()).or_insert(0) += 1;
		}

		AlertSummary {
			total_alerts: alerts.len(),
			active_alerts,
			resolved_alerts: alerts.len() - active_alerts,
			by_severity,
			by_component,
			last_run: self
				.last_run
				.lock()
				.await
				.iter()
				.map(|(k, v)| (k.clone(), *v))
				.collect(),
			last_check: *self.last_check.lock().await,
			monitoring_active: self.is_running().await,
		}
	}

	pub async fn is_running(&self) -> bool {
		self.ticker.lock().await.is_some()
	}

	/// Starts the periodic probe loop. The first tick runs immediately.
	#[instrument(skip(self))]
	pub async fn start(self: &Arc<Self>) {
		let mut ticker = self.ticker.lock().await;
		if ticker.is_some() {
			warn!("Monitor already running");
			return;
		}

		let monitor = Arc::clone(self);
		*ticker = Some(
			Ticker::new("health-monitor", self.config.tick_interval)
				.fire_immediately()
				.spawn(move || {
					let monitor = Arc::clone(&monitor);
					async move {
						let report = monitor.tick().await;
						debug!(
							probes_run = report.probes_run,
							probes_failed = report.probes_failed,
							alerts_raised = report.alerts_raised,
							"Monitor tick finished"
						);
					}
				}),
		);

		info!(
			tick_interval_secs = self.config.tick_interval.as_secs(),
			"Health monitor started"
		);
	}

	#[instrument(skip(self))]
	pub async fn stop(&self) {
		let handle = self.ticker.lock().await.take();
		match handle {
			Some(handle) => {
				handle.stop().await;
				info!("Health monitor shut down");
			}
			None => debug!("Health monitor was not running"),
		}
	}
}

fn log_alert(alert: &Alert) {
	match alert.severity {
		Severity::Critical | Severity::Error => error!(
			alert_id = %alert.id,
			severity = %alert.severity,
			component = %alert.component,
			"{}",
			alert.message
		),
		Severity::Warning => warn!(
			alert_id = %alert.id,
			component = %alert.component,
			"{}",
			alert.message
		),
		Severity::Info => info!(
			alert_id = %alert.id,
			component = %alert.component,
			"{}",
			alert.message
		),
	}
}

async fn run_probe(
	probe: Arc<dyn Probe>,
	ctx: ProbeContext,
	timeout: Duration,
) -> Result<Vec<Finding>> {
	let mut handle = tokio::spawn(async move { probe.check(&ctx).await });
	match tokio::time::timeout(timeout, &mut handle).await {
		Ok(Ok(result)) => result,
		Ok(Err(join_error)) => Err(MonitorError::Probe(format!(
			"probe task aborted: {join_error}"
		))),
		Err(_) => {
			handle.abort();
			Err(MonitorError::Timeout(timeout))
		}
	}
}

async fn run_remediation(
	handler: Arc<dyn Remediator>,
	alert: Alert,
	timeout: Duration,
) -> Result<String> {
	let mut handle = tokio::spawn(async move { handler.remediate(&alert).await });
	match tokio::time::timeout(timeout, &mut handle).await {
		Ok(Ok(result)) => result,
		Ok(Err(join_error)) => Err(MonitorError::Remediation(format!(
			"remediation task aborted: {join_error}"
		))),
		Err(_) => {
			handle.abort();
			Err(MonitorError::Timeout(timeout))
		}
	}
}
