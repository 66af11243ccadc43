// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::{Alert, Finding};
use crate::error::{MonitorError, Result};
use crate::probe::{Probe, ProbeContext};
use crate::remediation::Remediator;
use async_trait::async_trait;
use std::sync::Arc;

pub const AUTH_COMPONENT: &str = "auth";

/// Credentials for an external provider.
#[async_trait]
pub trait CredentialCheck: Send + Sync {
	/// Fails when the current credentials are missing, expired or rejected.
	async fn validate(&self) -> Result<()>;

	/// Obtains fresh credentials.
	async fn refresh(&self) -> Result<()>;
}

pub struct CredentialProbe {
	component: String,
	check: Arc<dyn CredentialCheck>,
}

impl CredentialProbe {
	pub fn new(check: Arc<dyn CredentialCheck>) -> Self {
		Self {
			component: AUTH_COMPONENT.to_string(),
			check,
		}
	}

	pub fn with_component(mut self, component: impl Into<String>) -> Self {
		self.component = component.into();
		self
	}
}

#[async_trait]
impl Probe for CredentialProbe {
	fn name(&self) -> &str {
		&self.component
	}

	async fn check(&self, _ctx: &ProbeContext) -> Result<Vec<Finding>> {
		match self.check.validate().await {
			Ok(()) => Ok(Vec::new()),
			Err(e) => Ok(vec![Finding::error(
				self.component.clone(),
				format!("credential check failed: {e}"),
			)
			.auto_resolve(true)]),
		}
	}
}

/// Refreshes credentials for the alerting component.
pub struct Reauthenticate {
	check: Arc<dyn CredentialCheck>,
}

impl Reauthenticate {
	pub fn new(check: Arc<dyn CredentialCheck>) -> Self {
		Self { check }
	}
}

#[async_trait]
impl Remediator for Reauthenticate {
	async fn remediate(&self, alert: &Alert) -> Result<String> {
		self.check
			.refresh()
			.await
			.map_err(|e| MonitorError::Remediation(format!("refresh failed: {e}")))?;
		self.check.validate().await.map_err(|e| {
			MonitorError::Remediation(format!("{} credentials still invalid: {e}", alert.component))
		})?;
		Ok("credentials refreshed".to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::alert::{AlertId, Severity};
	use chrono::Utc;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

	struct FakeOAuth {
		valid: AtomicBool,
		refresh_works: bool,
		refreshes: AtomicUsize,
	}

	#[async_trait]
	impl CredentialCheck for FakeOAuth {
		async fn validate(&self) -> Result<()> {
			if self.valid.load(Ordering::SeqCst) {
				Ok(())
			} else {
				Err(MonitorError::Probe("token expired".to_string()))
			}
		}

		async fn refresh(&self) -> Result<()> {
			self.refreshes.fetch_add(1, Ordering::SeqCst);
			if self.refresh_works {
				self.valid.store(true, Ordering::SeqCst);
				Ok(())
			} else {
				Err(MonitorError::Probe("refresh token revoked".to_string()))
			}
		}
	}

	fn fake(valid: bool, refresh_works: bool) -> Arc<FakeOAuth> {
		Arc::new(FakeOAuth {
			valid: AtomicBool::new(valid),
			refresh_works,
			refreshes: AtomicUsize::new(0),
		})
	}

	#[tokio::test]
	async fn test_invalid_credentials_raise_auto_resolving_error() {
		let probe = CredentialProbe::new(fake(false, true)).with_component("google_auth");
		let findings = probe
			.check(&ProbeContext {
				now: Utc::now(),
				last_run: None,
			})
			.await
			.unwrap();

		assert_eq!(probe.name(), "google_auth");
		assert_eq!(findings.len(), 1);
		assert_eq!(findings[0].severity, Severity::Error);
		assert_eq!(findings[0].component, "google_auth");
		assert!(findings[0].auto_resolve);
	}

	#[tokio::test]
	async fn test_reauthenticate_refreshes() {
		let oauth = fake(false, true);
		let remediator = Reauthenticate::new(oauth.clone());
		let alert = Alert::from_finding(AlertId::new(1), Finding::error("auth", "expired"), Utc::now());

		assert_eq!(remediator.remediate(&alert).await.unwrap(), "credentials refreshed");
		assert_eq!(oauth.refreshes.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_reauthenticate_reports_refresh_failure() {
		let remediator = Reauthenticate::new(fake(false, false));
		let alert = Alert::from_finding(AlertId::new(1), Finding::error("auth", "expired"), Utc::now());
		assert!(matches!(
			remediator.remediate(&alert).await,
			Err(MonitorError::Remediation(_))
		));
	}
}
