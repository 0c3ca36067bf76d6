// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduler adapter for the deletion sweep.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use roster_server_jobs::{Job, JobContext, JobError, JobOutcome};

use crate::sweeper::DeletionSweeper;

/// Runs the deletion sweep on the server's job scheduler. The sweep itself
/// is idempotent, so a failed run needs nothing beyond the next tick.
pub struct DeletionSweepJob {
	sweeper: Arc<DeletionSweeper>,
}

impl DeletionSweepJob {
	pub fn new(sweeper: Arc<DeletionSweeper>) -> Self {
		Self { sweeper }
	}
}

#[async_trait]
impl Job for DeletionSweepJob {
	fn id(&self) -> &str {
		"email-deletion-sweep"
	}

	fn name(&self) -> &str {
		"Email deletion sweep"
	}

	fn description(&self) -> &str {
		"Removes email addresses whose removal mark has passed and reconciles the external systems"
	}

	async fn run(&self, _ctx: &JobContext) -> Result<JobOutcome, JobError> {
		let outcome = self
			.sweeper
			.run_deletion_sweep()
			.await
			.map_err(|e| JobError::Failed(e.to_string()))?;

		Ok(JobOutcome {
			message: format!(
				"processed {} of {} eligible addresses",
				outcome.processed, outcome.total_eligible
			),
			metadata: Some(json!({
				"processed": outcome.processed,
				"total_eligible": outcome.total_eligible,
			})),
		})
	}
}
