// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::{Alert, Finding};
use crate::error::{MonitorError, Result};
use crate::probe::{Probe, ProbeContext};
use crate::remediation::Remediator;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DATABASE_COMPONENT: &str = "database";
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(5);

/// Something that can be reached with a cheap round trip.
#[async_trait]
pub trait PingTarget: Send + Sync {
	async fn ping(&self) -> Result<()>;
}

/// Checks that the persistence store is reachable and responsive.
pub struct PersistenceProbe {
	component: String,
	target: Arc<dyn PingTarget>,
	slow_threshold: Duration,
}

impl PersistenceProbe {
	pub fn new(target: Arc<dyn PingTarget>) -> Self {
		Self {
			component: DATABASE_COMPONENT.to_string(),
			target,
			slow_threshold: DEFAULT_SLOW_THRESHOLD,
		}
	}

	pub fn with_component(mut self, component: impl Into<String>) -> Self {
		self.component = component.into();
		self
	}

	pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
		self.slow_threshold = threshold;
		self
	}
}

#[async_trait]
impl Probe for PersistenceProbe {
	fn name(&self) -> &str {
		&self.component
	}

	async fn check(&self, _ctx: &ProbeContext) -> Result<Vec<Finding>> {
		let start = Instant::now();
		let result = self.target.ping().await;
		let elapsed = start.elapsed();

		match result {
			Err(e) => Ok(vec![Finding::critical(
				self.component.clone(),
				format!("{} unreachable: {e}", self.component),
			)
			.auto_resolve(true)]),
			Ok(()) if elapsed > self.slow_threshold => Ok(vec![Finding::warning(
				self.component.clone(),
				format!("slow query {:.2}s", elapsed.as_secs_f64()),
			)
			.with_metadata("latency_ms", elapsed.as_millis() as u64)]),
			Ok(()) => Ok(Vec::new()),
		}
	}
}

/// Resolves an alert when the target answers again.
pub struct Recheck {
	target: Arc<dyn PingTarget>,
}

impl Recheck {
	pub fn new(target: Arc<dyn PingTarget>) -> Self {
		Self { target }
	}
}

#[async_trait]
impl Remediator for Recheck {
	async fn remediate(&self, alert: &Alert) -> Result<String> {
		self.target.ping().await.map_err(|e| {
			MonitorError::Remediation(format!("{} still unreachable: {e}", alert.component))
		})?;
		Ok("connection re-established".to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::alert::{AlertId, Severity};
	use chrono::Utc;
	use std::sync::atomic::{AtomicBool, Ordering};

	struct FakeDb {
		up: AtomicBool,
		delay: Duration,
	}

	impl FakeDb {
		fn new(up: bool, delay: Duration) -> Arc<Self> {
			Arc::new(Self {
				up: AtomicBool::new(up),
				delay,
			})
		}
	}

	#[async_trait]
	impl PingTarget for FakeDb {
		async fn ping(&self) -> Result<()> {
			tokio::time::sleep(self.delay).await;
			if self.up.load(Ordering::SeqCst) {
				Ok(())
			} else {
				Err(MonitorError::Probe("connection refused".to_string()))
			}
		}
	}

	fn ctx() -> ProbeContext {
		ProbeContext {
			now: Utc::now(),
			last_run: None,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_healthy_database_reports_nothing() {
		let probe = PersistenceProbe::new(FakeDb::new(true, Duration::from_millis(20)));
		assert!(probe.check(&ctx()).await.unwrap().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_unreachable_database_is_critical_and_auto_resolving() {
		let probe = PersistenceProbe::new(FakeDb::new(false, Duration::ZERO));
		let findings = probe.check(&ctx()).await.unwrap();
		assert_eq!(findings.len(), 1);
		assert_eq!(findings[0].severity, Severity::Critical);
		assert_eq!(findings[0].component, "database");
		assert!(findings[0].auto_resolve);
	}

	#[tokio::test(start_paused = true)]
	async fn test_slow_database_is_warning() {
		let probe = PersistenceProbe::new(FakeDb::new(true, Duration::from_millis(6200)));
		let findings = probe.check(&ctx()).await.unwrap();
		assert_eq!(findings.len(), 1);
		assert_eq!(findings[0].severity, Severity::Warning);
		assert!(!findings[0].auto_resolve);
		assert!(findings[0].message.starts_with("slow query 6.2"));
	}

	#[tokio::test]
	async fn test_recheck_resolves_only_when_reachable() {
		let db = FakeDb::new(false, Duration::ZERO);
		let recheck = Recheck::new(db.clone());
		let alert = Alert::from_finding(
			AlertId::new(1),
			Finding::critical("database", "database unreachable"),
			Utc::now(),
		);

		assert!(recheck.remediate(&alert).await.is_err());
		db.up.store(true, Ordering::SeqCst);
		assert_eq!(
			recheck.remediate(&alert).await.unwrap(),
			"connection re-established"
		);
	}
}
