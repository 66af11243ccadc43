// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use crate::types::JobView;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Receives a snapshot after every job status change.
///
/// Used to mirror job state into durable storage. Failures are logged by the
/// scheduler and never affect the job itself.
#[async_trait]
pub trait JobObserver: Send + Sync {
	async fn on_transition(&self, job: &JobView) -> Result<()>;
}

pub(crate) async fn notify(observer: Option<&Arc<dyn JobObserver>>, job: &JobView) {
	let Some(observer) = observer else {
		return;
	};
	if let Err(e) = observer.on_transition(job).await {
		warn!(job_id = %job.id, status = %job.status, error = %e, "Job observer failed");
	}
}
