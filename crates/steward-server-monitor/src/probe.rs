// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::Finding;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Inputs handed to a probe on every run.
#[derive(Debug, Clone, Copy)]
pub struct ProbeContext {
	pub now: DateTime<Utc>,
	/// When this probe last returned normally, if ever.
	pub last_run: Option<DateTime<Utc>>,
}

/// A named health check. An empty result means healthy.
#[async_trait]
pub trait Probe: Send + Sync {
	fn name(&self) -> &str;

	async fn check(&self, ctx: &ProbeContext) -> Result<Vec<Finding>>;
}

#[derive(Default)]
pub struct ProbeRegistry {
	probes: Vec<Arc<dyn Probe>>,
}

impl ProbeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, probe: Arc<dyn Probe>) -> Result<()> {
		if self.contains(probe.name()) {
			return Err(MonitorError::DuplicateProbe(probe.name().to_string()));
		}
		self.probes.push(probe);
		Ok(())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.probes.iter().any(|p| p.name() == name)
	}

	pub fn names(&self) -> Vec<String> {
		self.probes.iter().map(|p| p.name().to_string()).collect()
	}

	/// Registered probes in registration order.
	pub fn snapshot(&self) -> Vec<Arc<dyn Probe>> {
		self.probes.clone()
	}

	pub fn len(&self) -> usize {
		self.probes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.probes.is_empty()
	}
}
