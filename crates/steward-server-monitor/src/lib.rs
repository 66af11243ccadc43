// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Self-healing health monitor for Steward.
//!
//! The [`Monitor`] periodically runs registered [`Probe`]s. Each problem a
//! probe reports becomes an [`Alert`]; alerts flagged `auto_resolve` are
//! handed to the [`Remediator`] registered for their component, and a
//! successful remediation resolves the alert.

pub mod alert;
pub mod error;
pub mod monitor;
pub mod notifier;
pub mod probe;
pub mod probes;
pub mod remediation;
pub mod store;

pub use alert::{Alert, AlertId, Finding, Severity};
pub use error::{MonitorError, Result};
pub use monitor::{AlertSummary, Monitor, MonitorConfig, MonitorTickReport};
pub use notifier::{AlertNotifier, BroadcastNotifier};
pub use probe::{Probe, ProbeContext, ProbeRegistry};
pub use remediation::{Remediator, RemediatorRegistry};
pub use store::{AlertStore, InMemoryAlertStore};
