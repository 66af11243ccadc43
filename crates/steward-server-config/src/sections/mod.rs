// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod database;
mod logging;
mod monitor;
mod scheduler;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use monitor::{MonitorConfig, MonitorConfigLayer, SEVERITY_NAMES};
pub use scheduler::{SchedulerConfig, SchedulerConfigLayer};
