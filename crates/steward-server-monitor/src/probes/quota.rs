// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::Finding;
use crate::error::Result;
use crate::probe::{Probe, ProbeContext};
use async_trait::async_trait;
use std::sync::Arc;

pub const DEFAULT_QUOTA_THRESHOLD_PERCENT: f64 = 85.0;

/// A metered resource such as a storage quota.
#[async_trait]
pub trait UsageGauge: Send + Sync {
	/// Component name used on alerts, e.g. `drive`.
	fn component(&self) -> &str;

	/// Current usage as a percentage of the limit.
	async fn usage_percent(&self) -> Result<f64>;
}

pub struct QuotaProbe {
	name: String,
	gauge: Arc<dyn UsageGauge>,
	threshold_percent: f64,
}

impl QuotaProbe {
	pub fn new(gauge: Arc<dyn UsageGauge>) -> Self {
		Self {
			name: format!("{}_usage", gauge.component()),
			gauge,
			threshold_percent: DEFAULT_QUOTA_THRESHOLD_PERCENT,
		}
	}

	pub fn with_threshold(mut self, percent: f64) -> Self {
		self.threshold_percent = percent;
		self
	}
}

#[async_trait]
impl Probe for QuotaProbe {
	fn name(&self) -> &str {
		&self.name
	}

	async fn check(&self, _ctx: &ProbeContext) -> Result<Vec<Finding>> {
		let usage = self.gauge.usage_percent().await?;
		if usage <= self.threshold_percent {
			return Ok(Vec::new());
		}

		Ok(vec![Finding::warning(
			self.gauge.component(),
			format!(
				"{} usage at {usage:.1}% (threshold {:.0}%)",
				self.gauge.component(),
				self.threshold_percent
			),
		)
		.with_metadata("usage_percent", usage)])
	}
}
