// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::{Alert, AlertId, Finding};
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

#[async_trait]
pub trait AlertStore: Send + Sync {
	/// Stores a finding as a new alert with the next id.
	async fn append(&self, finding: Finding, timestamp: DateTime<Utc>) -> Alert;

	async fn get(&self, id: AlertId) -> Option<Alert>;

	async fn resolve(&self, id: AlertId, resolution: &str) -> Result<Alert>;

	/// Every stored alert in insertion order.
	async fn all(&self) -> Vec<Alert>;

	/// Drops resolved alerts raised before `raised_before`.
	async fn purge_resolved(&self, raised_before: DateTime<Utc>) -> usize;

	async fn active(&self) -> Vec<Alert> {
		self.all()
			.await
			.into_iter()
			.filter(|alert| !alert.resolved)
			.collect()
	}
}

#[derive(Debug, Default)]
struct AlertLog {
	last_id: u64,
	alerts: Vec<Alert>,
}

/// Append-only in-memory alert log. Ids are never reused, even after a purge.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
	log: Mutex<AlertLog>,
}

impl InMemoryAlertStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
	async fn append(&self, finding: Finding, timestamp: DateTime<Utc>) -> Alert {
		let mut log = self.log.lock().await;
		log.last_id += 1;
		let alert = Alert::from_finding(AlertId::new(log.last_id), finding, timestamp);
		log.alerts.push(alert.clone());
		alert
	}

	async fn get(&self, id: AlertId) -> Option<Alert> {
		self.log
			.lock()
			.await
			.alerts
			.iter()
			.find(|alert| alert.id == id)
			.cloned()
	}

	async fn resolve(&self, id: AlertId, resolution: &str) -> Result<Alert> {
		let mut log = self.log.lock().await;
		let alert = log
			.alerts
			.iter_mut()
			.find(|alert| alert.id == id)
			.ok_or(MonitorError::AlertNotFound(id))?;
		alert.resolve(resolution)?;
		Ok(alert.clone())
	}

	async fn all(&self) -> Vec<Alert> {
		self.log.lock().await.alerts.clone()
	}

	async fn purge_resolved(&self, raised_before: DateTime<Utc>) -> usize {
		let mut log = self.log.lock().await;
		let before = log.alerts.len();
		log.alerts
			.retain(|alert| !(alert.resolved && alert.timestamp < raised_before));
		before - log.alerts.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use proptest::prelude::*;

	#[tokio::test]
	async fn test_append_assigns_increasing_ids_from_one() {
		let store = InMemoryAlertStore::new();
		let now = Utc::now();
		let first = store.append(Finding::warning("a", "one"), now).await;
		let second = store.append(Finding::warning("b", "two"), now).await;
		assert_eq!(first.id, AlertId::new(1));
		assert_eq!(second.id, AlertId::new(2));
		assert!(!first.resolved);
	}

	#[tokio::test]
	async fn test_resolve_and_active() {
		let store = InMemoryAlertStore::new();
		let now = Utc::now();
		let a = store.append(Finding::error("auth", "expired"), now).await;
		store.append(Finding::warning("drive", "full"), now).await;

		let resolved = store.resolve(a.id, "refreshed").await.unwrap();
		assert!(resolved.resolved);

		let active = store.active().await;
		assert_eq!(active.len(), 1);
		assert_eq!(active[0].component, "drive");
	}

	#[tokio::test]
	async fn test_resolve_unknown_alert() {
		let store = InMemoryAlertStore::new();
		let err = store.resolve(AlertId::new(9), "x").await.unwrap_err();
		assert!(matches!(err, MonitorError::AlertNotFound(id) if id == AlertId::new(9)));
	}

	#[tokio::test]
	async fn test_purge_resolved_keeps_recent_and_open_alerts() {
		let store = InMemoryAlertStore::new();
		let now = Utc::now();
		let old = now - Duration::days(10);

		let stale = store.append(Finding::warning("a", "old"), old).await;
		store.resolve(stale.id, "fixed").await.unwrap();
		store.append(Finding::warning("b", "old but open"), old).await;
		let recent = store.append(Finding::warning("c", "new"), now).await;
		store.resolve(recent.id, "fixed").await.unwrap();

		assert_eq!(store.purge_resolved(now - Duration::days(7)).await, 1);
		assert_eq!(store.all().await.len(), 2);

		let next = store.append(Finding::warning("d", "after purge"), now).await;
		assert_eq!(next.id, AlertId::new(4));
	}

	proptest! {
		#[test]
		fn alert_ids_strictly_increase(count in 1usize..50) {
			let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
			let ids = rt.block_on(async {
				let store = InMemoryAlertStore::new();
				let mut ids = Vec::new();
				for i in 0..count {
					let alert = store.append(Finding::warning("c", format!("m{i}")), Utc::now()).await;
					ids.push(alert.id);
				}
				ids
			});
			prop_assert_eq!(ids[0], AlertId::new(1));
			for pair in ids.windows(2) {
				prop_assert!(pair[0] < pair[1]);
			}
		}
	}
}
