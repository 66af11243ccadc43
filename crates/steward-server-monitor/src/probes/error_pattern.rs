// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::alert::Finding;
use crate::error::{MonitorError, Result};
use crate::probe::{Probe, ProbeContext};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ERROR_THRESHOLD: usize = 5;
pub const DEFAULT_ERROR_LOOKBACK: Duration = Duration::from_secs(60 * 60);

/// Source of recorded application errors.
#[async_trait]
pub trait ErrorLog: Send + Sync {
	/// Error counts per component recorded at or after `since`.
	async fn errors_since(&self, since: DateTime<Utc>) -> Result<BTreeMap<String, usize>>;
}

/// Warns about components that logged an unusual number of errors within a
/// sliding lookback window ending now.
pub struct ErrorPatternProbe {
	log: Arc<dyn ErrorLog>,
	threshold: usize,
	lookback: Duration,
}

impl ErrorPatternProbe {
	pub fn new(log: Arc<dyn ErrorLog>) -> Self {
		Self {
			log,
			threshold: DEFAULT_ERROR_THRESHOLD,
			lookback: DEFAULT_ERROR_LOOKBACK,
		}
	}

	pub fn with_threshold(mut self, threshold: usize) -> Self {
		self.threshold = threshold;
		self
	}

	/// Width of the sliding window, one hour by default.
	pub fn with_lookback(mut self, lookback: Duration) -> Self {
		self.lookback = lookback;
		self
	}
}

#[async_trait]
impl Probe for ErrorPatternProbe {
	fn name(&self) -> &str {
		"error_patterns"
	}

	async fn check(&self, ctx: &ProbeContext) -> Result<Vec<Finding>> {
		let lookback = chrono::Duration::from_std(self.lookback)
			.map_err(|e| MonitorError::InvalidInput(format!("error lookback: {e}")))?;
		let since = ctx.now.checked_sub_signed(lookback).ok_or_else(|| {
			MonitorError::InvalidInput("error lookback is out of range".to_string())
		})?;

		let counts = self.log.errors_since(since).await?;
		Ok(counts
			.into_iter()
			.filter(|(_, count)| *count > self.threshold)
			.map(|(component, count)| {
				Finding::warning(
					component.clone(),
					format!("{count} errors from {component} since {}", since.to_rfc3339()),
				)
				.auto_resolve(true)
				.with_metadata("error_count", count as u64)
			})
			.collect())
	}
}
