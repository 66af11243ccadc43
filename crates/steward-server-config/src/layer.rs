// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by each source.

use serde::{Deserialize, Serialize};

use crate::sections::{
	DatabaseConfigLayer, LoggingConfigLayer, MonitorConfigLayer, SchedulerConfigLayer,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StewardConfigLayer {
	#[serde(default)]
	pub scheduler: Option<SchedulerConfigLayer>,
	#[serde(default)]
	pub monitor: Option<MonitorConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(existing), Some(other)) => merge(existing, other),
		(None, Some(other)) => *base = Some(other),
		(_, None) => {}
	}
}

impl StewardConfigLayer {
	/// Overlays `other` on top of `self`; fields set in `other` win.
	pub fn merge(&mut self, other: StewardConfigLayer) {
		merge_section(&mut self.scheduler, other.scheduler, SchedulerConfigLayer::merge);
		merge_section(&mut self.monitor, other.monitor, MonitorConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
	}
}
