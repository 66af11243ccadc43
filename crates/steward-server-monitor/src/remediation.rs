// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::Alert;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Attempts to fix the condition behind an alert.
///
/// Returns the resolution text recorded on the alert when the fix worked.
#[async_trait]
pub trait Remediator: Send + Sync {
	async fn remediate(&self, alert: &Alert) -> Result<String>;
}

/// Remediation handlers keyed by alert component.
#[derive(Default)]
pub struct RemediatorRegistry {
	handlers: HashMap<String, Arc<dyn Remediator>>,
}

impl RemediatorRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Installs a handler, returning true if it replaced an existing one.
	pub fn insert(&mut self, component: impl Into<String>, handler: Arc<dyn Remediator>) -> bool {
		self.handlers.insert(component.into(), handler).is_some()
	}

	pub fn get(&self, component: &str) -> Option<Arc<dyn Remediator>> {
		self.handlers.get(component).cloned()
	}

	pub fn components(&self) -> Vec<String> {
		let mut components: Vec<String> = self.handlers.keys().cloned().collect();
		components.sort();
		components
	}
}
