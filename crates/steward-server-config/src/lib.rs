// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Steward server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`STEWARD_*`)
//!
//! # Usage
//!
//! ```ignore
//! use steward_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Scheduler ticks every {}s", config.scheduler.tick_interval_secs);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::StewardConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, DEFAULT_CONFIG_PATH,
};

use tracing::{debug, info};

/// Fully resolved Steward configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StewardConfig {
	pub scheduler: SchedulerConfig,
	pub monitor: MonitorConfig,
	pub logging: LoggingConfig,
	pub database: DatabaseConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`STEWARD_*`)
/// 2. Config file (`/etc/steward/steward.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<StewardConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<StewardConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and finalize the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<StewardConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = StewardConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: StewardConfigLayer) -> Result<StewardConfig, ConfigError> {
	let config = StewardConfig {
		scheduler: layer.scheduler.unwrap_or_default().finalize(),
		monitor: layer.monitor.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		scheduler_tick_secs = config.scheduler.tick_interval_secs,
		max_concurrency = config.scheduler.max_concurrency,
		monitor_tick_secs = config.monitor.tick_interval_secs,
		history_database = config.database.url.is_some(),
		"Steward configuration loaded"
	);

	Ok(config)
}

fn require_non_zero(key: &str, value: u64) -> Result<(), ConfigError> {
	if value == 0 {
		return Err(ConfigError::validation(format!("{key} must be greater than zero")));
	}
	Ok(())
}

/// Validate cross-field configuration rules.
fn validate_config(config: &StewardConfig) -> Result<(), ConfigError> {
	let scheduler = &config.scheduler;
	require_non_zero("scheduler.tick_interval_secs", scheduler.tick_interval_secs)?;
	require_non_zero("scheduler.job_timeout_secs", scheduler.job_timeout_secs)?;
	require_non_zero("scheduler.recurring_horizon_hours", scheduler.recurring_horizon_hours)?;
	if scheduler.max_concurrency == 0 {
		return Err(ConfigError::validation(
			"scheduler.max_concurrency must be at least 1",
		));
	}

	let monitor = &config.monitor;
	require_non_zero("monitor.tick_interval_secs", monitor.tick_interval_secs)?;
	require_non_zero("monitor.probe_timeout_secs", monitor.probe_timeout_secs)?;
	require_non_zero("monitor.remediation_timeout_secs", monitor.remediation_timeout_secs)?;
	require_non_zero("monitor.failure_window_secs", monitor.failure_window_secs)?;
	require_non_zero("monitor.stuck_job_threshold_secs", monitor.stuck_job_threshold_secs)?;
	if !SEVERITY_NAMES.contains(&monitor.notify_min_severity.as_str()) {
		return Err(ConfigError::validation(format!(
			"monitor.notify_min_severity must be one of {}, got '{}'",
			SEVERITY_NAMES.join(", "),
			monitor.notify_min_severity
		)));
	}

	Ok(())
}
