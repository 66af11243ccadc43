// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Steward server library: builds the job scheduler and health monitor from
//! configuration and runs them side by side.

pub mod db;
pub mod error;
pub mod runtime;

pub use error::{Result, ServerError};
pub use runtime::{monitor_config, scheduler_config, Steward};
