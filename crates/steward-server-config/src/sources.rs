// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::StewardConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, LoggingConfigLayer, MonitorConfigLayer, SchedulerConfigLayer,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/steward/steward.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<StewardConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<StewardConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(StewardConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is treated as empty.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(DEFAULT_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<StewardConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(StewardConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: StewardConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: STEWARD_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<StewardConfigLayer, ConfigError> {
		debug!("loading environment variables");
		load_from_lookup(&|name| std::env::var(name).ok())
	}
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn load_from_lookup(lookup: Lookup<'_>) -> Result<StewardConfigLayer, ConfigError> {
	Ok(StewardConfigLayer {
		scheduler: Some(load_scheduler(lookup)?),
		monitor: Some(load_monitor(lookup)?),
		logging: Some(load_logging(lookup)),
		database: Some(load_database(lookup)),
	})
}

fn env_var(lookup: Lookup<'_>, name: &str) -> Option<String> {
	lookup(name).filter(|s| !s.is_empty())
}

fn env_bool(lookup: Lookup<'_>, name: &str) -> Option<bool> {
	env_var(lookup, name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_num<T: FromStr>(lookup: Lookup<'_>, name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(lookup, name) {
		Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid number '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_scheduler(lookup: Lookup<'_>) -> Result<SchedulerConfigLayer, ConfigError> {
	Ok(SchedulerConfigLayer {
		tick_interval_secs: env_num(lookup, "STEWARD_SCHEDULER_TICK_INTERVAL_SECS")?,
		retry_backoff_secs: env_num(lookup, "STEWARD_SCHEDULER_RETRY_BACKOFF_SECS")?,
		default_max_retries: env_num(lookup, "STEWARD_SCHEDULER_DEFAULT_MAX_RETRIES")?,
		max_concurrency: env_num(lookup, "STEWARD_SCHEDULER_MAX_CONCURRENCY")?,
		job_timeout_secs: env_num(lookup, "STEWARD_SCHEDULER_JOB_TIMEOUT_SECS")?,
		recurring_horizon_hours: env_num(lookup, "STEWARD_SCHEDULER_RECURRING_HORIZON_HOURS")?,
		history_retention_days: env_num(lookup, "STEWARD_SCHEDULER_HISTORY_RETENTION_DAYS")?,
	})
}

fn load_monitor(lookup: Lookup<'_>) -> Result<MonitorConfigLayer, ConfigError> {
	Ok(MonitorConfigLayer {
		tick_interval_secs: env_num(lookup, "STEWARD_MONITOR_TICK_INTERVAL_SECS")?,
		probe_timeout_secs: env_num(lookup, "STEWARD_MONITOR_PROBE_TIMEOUT_SECS")?,
		remediation_timeout_secs: env_num(lookup, "STEWARD_MONITOR_REMEDIATION_TIMEOUT_SECS")?,
		alert_retention_days: env_num(lookup, "STEWARD_MONITOR_ALERT_RETENTION_DAYS")?,
		stuck_job_threshold_secs: env_num(lookup, "STEWARD_MONITOR_STUCK_JOB_THRESHOLD_SECS")?,
		stuck_job_auto_resolve: env_bool(lookup, "STEWARD_MONITOR_STUCK_JOB_AUTO_RESOLVE"),
		failure_window_secs: env_num(lookup, "STEWARD_MONITOR_FAILURE_WINDOW_SECS")?,
		failure_threshold: env_num(lookup, "STEWARD_MONITOR_FAILURE_THRESHOLD")?,
		notify_min_severity: env_var(lookup, "STEWARD_MONITOR_NOTIFY_MIN_SEVERITY"),
	})
}

fn load_logging(lookup: Lookup<'_>) -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var(lookup, "STEWARD_LOG_LEVEL"),
		json: env_bool(lookup, "STEWARD_LOG_JSON"),
	}
}

fn load_database(lookup: Lookup<'_>) -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var(lookup, "STEWARD_DATABASE_URL"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| vars.get(name).cloned()
	}

	#[test]
	fn test_env_values_are_parsed() {
		let lookup = lookup_from(&[
			("STEWARD_SCHEDULER_MAX_CONCURRENCY", "12"),
			("STEWARD_MONITOR_STUCK_JOB_AUTO_RESOLVE", "false"),
			("STEWARD_LOG_JSON", "1"),
			("STEWARD_DATABASE_URL", "sqlite:./history.db"),
			("STEWARD_LOG_LEVEL", ""),
		]);
		let layer = load_from_lookup(&lookup).unwrap();

		assert_eq!(layer.scheduler.unwrap().max_concurrency, Some(12));
		assert_eq!(layer.monitor.unwrap().stuck_job_auto_resolve, Some(false));
		let logging = layer.logging.unwrap();
		assert_eq!(logging.json, Some(true));
		assert!(logging.level.is_none());
		assert_eq!(
			layer.database.unwrap().url.as_deref(),
			Some("sqlite:./history.db")
		);
	}

	#[test]
	fn test_env_rejects_bad_numbers() {
		let lookup = lookup_from(&[("STEWARD_SCHEDULER_TICK_INTERVAL_SECS", "soon")]);
		let err = load_from_lookup(&lookup).unwrap_err();
		assert!(matches!(
			err,
			ConfigError::InvalidValue { key, .. } if key == "STEWARD_SCHEDULER_TICK_INTERVAL_SECS"
		));
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[monitor]
tick_interval_secs = 60
notify_min_severity = "warning"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let monitor = layer.monitor.unwrap();
		assert_eq!(monitor.tick_interval_secs, Some(60));
		assert_eq!(monitor.notify_min_severity.as_deref(), Some("warning"));
	}

	#[test]
	fn test_toml_source_missing_file_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let layer = TomlSource::new(dir.path().join("absent.toml")).load().unwrap();
		assert_eq!(layer, StewardConfigLayer::default());
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[scheduler\ntick_interval_secs = ").unwrap();
		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}
}
