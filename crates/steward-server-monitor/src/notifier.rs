// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::Alert;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Outbound sink for raised alerts.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
	async fn notify(&self, alert: &Alert) -> Result<()>;
}

/// Fans alerts out to any number of in-process subscribers.
///
/// Sending never fails: with no subscribers the alert is dropped, and slow
/// subscribers observe a lag error on their receiver.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
	tx: broadcast::Sender<Alert>,
}

impl BroadcastNotifier {
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity.max(1));
		Self { tx }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
		self.tx.subscribe()
	}
}

#[async_trait]
impl AlertNotifier for BroadcastNotifier {
	async fn notify(&self, alert: &Alert) -> Result<()> {
		let _ = self.tx.send(alert.clone());
		Ok(())
	}
}
