// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Built-in probes and the remediators that pair with them.

pub mod credential;
pub mod error_pattern;
pub mod failure_rate;
pub mod persistence;
pub mod quota;
pub mod stuck_job;

pub use credential::{CredentialCheck, CredentialProbe, Reauthenticate, AUTH_COMPONENT};
pub use error_pattern::{ErrorLog, ErrorPatternProbe};
pub use failure_rate::{FailureRateProbe, JOB_FAILURES_COMPONENT};
pub use persistence::{PersistenceProbe, PingTarget, Recheck, DATABASE_COMPONENT};
pub use quota::{QuotaProbe, UsageGauge};
pub use stuck_job::{ForceFailStuckJob, StuckJobProbe, STUCK_JOB_COMPONENT, STUCK_JOB_MESSAGE};
