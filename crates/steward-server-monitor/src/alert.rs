// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{MonitorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(u64);

impl AlertId {
	pub fn new(id: u64) -> Self {
		Self(id)
	}

	pub fn value(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for AlertId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	Info,
	Warning,
	Error,
	Critical,
}

impl Severity {
	pub fn as_str(&self) -> &'static str {
		match self {
			Severity::Info => "info",
			Severity::Warning => "warning",
			Severity::Error => "error",
			Severity::Critical => "critical",
		}
	}
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Severity {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"info" => Ok(Severity::Info),
			"warning" | "warn" => Ok(Severity::Warning),
			"error" => Ok(Severity::Error),
			"critical" => Ok(Severity::Critical),
			_ => Err(format!("unknown severity: {s}")),
		}
	}
}

/// A problem reported by a probe, not yet stored as an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
	pub severity: Severity,
	pub component: String,
	pub message: String,
	pub auto_resolve: bool,
	pub metadata: Map<String, Value>,
}

impl Finding {
	pub fn new(severity: Severity, component: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			severity,
			component: component.into(),
			message: message.into(),
			auto_resolve: false,
			metadata: Map::new(),
		}
	}

	pub fn warning(component: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(Severity::Warning, component, message)
	}

	pub fn error(component: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(Severity::Error, component, message)
	}

	pub fn critical(component: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(Severity::Critical, component, message)
	}

	pub fn auto_resolve(mut self, auto_resolve: bool) -> Self {
		self.auto_resolve = auto_resolve;
		self
	}

	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
	pub id: AlertId,
	pub severity: Severity,
	pub component: String,
	pub message: String,
	pub timestamp: DateTime<Utc>,
	pub auto_resolve: bool,
	pub resolved: bool,
	pub resolution: Option<String>,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

impl Alert {
	pub fn from_finding(id: AlertId, finding: Finding, timestamp: DateTime<Utc>) -> Self {
		Self {
			id,
			severity: finding.severity,
			component: finding.component,
			message: finding.message,
			timestamp,
			auto_resolve: finding.auto_resolve,
			resolved: false,
			resolution: None,
			metadata: finding.metadata,
		}
	}

	/// Marks the alert resolved. An already resolved alert keeps its first
	/// resolution.
	pub fn resolve(&mut self, resolution: impl Into<String>) -> Result<()> {
		let resolution = resolution.into();
		if resolution.trim().is_empty() {
			return Err(MonitorError::InvalidInput(
				"resolution must not be empty".to_string(),
			));
		}
		if self.resolved {
			return Ok(());
		}
		self.resolved = true;
		self.resolution = Some(resolution);
		Ok(())
	}

	pub fn metadata_str(&self, key: &str) -> Option<&str> {
		self.metadata.get(key).and_then(Value::as_str)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn alert() -> Alert {
		Alert::from_finding(
			AlertId::new(1),
			Finding::warning("database", "slow query 6.20s").with_metadata("latency_ms", 6200),
			Utc::now(),
		)
	}

	#[test]
	fn test_severity_ordering() {
		assert!(Severity::Info < Severity::Warning);
		assert!(Severity::Warning < Severity::Error);
		assert!(Severity::Error < Severity::Critical);
	}

	#[test]
	fn test_severity_parse() {
		assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
		assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
		assert!("fatal".parse::<Severity>().is_err());
	}

	#[test]
	fn test_resolve_requires_text() {
		let mut alert = alert();
		assert!(matches!(
			alert.resolve("  "),
			Err(MonitorError::InvalidInput(_))
		));
		assert!(!alert.resolved);
		assert!(alert.resolution.is_none());
	}

	#[test]
	fn test_resolve_keeps_first_resolution() {
		let mut alert = alert();
		alert.resolve("reconnected").unwrap();
		alert.resolve("something else").unwrap();
		assert!(alert.resolved);
		assert_eq!(alert.resolution.as_deref(), Some("reconnected"));
	}

	#[test]
	fn test_alert_serializes_lowercase_severity() {
		let json = serde_json::to_value(alert()).unwrap();
		assert_eq!(json["severity"], "warning");
		assert_eq!(json["id"], 1);
		assert_eq!(json["metadata"]["latency_ms"], 6200);
	}
}
