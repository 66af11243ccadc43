// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::JobId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-attempt execution context handed to a job payload.
#[derive(Debug, Clone)]
pub struct JobContext {
	pub job_id: JobId,
	pub name: String,
	/// Number of failed attempts before this one.
	pub attempt: u32,
	/// Tripped when the attempt exceeds its timeout. Long-running payloads
	/// should poll it and bail out with [`crate::JobError::Cancelled`].
	pub cancellation_token: CancellationToken,
}

#[derive(Debug, Clone)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self {
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}
