// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::JobContext;
use crate::error::Result;

/// A unit of background work driven by the scheduler.
///
/// Runs must be idempotent: the scheduler does not retry in process, it
/// re-attempts the work on the next interval tick.
#[async_trait]
pub trait Job: Send + Sync {
	/// Stable identifier, used as the `job_runs` foreign key.
	fn id(&self) -> &str;

	fn name(&self) -> &str;

	fn description(&self) -> &str;

	async fn run(&self, ctx: &JobContext) -> Result<JobOutcome>;
}

/// What a finished run reports back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
	pub message: String,
	pub metadata: Option<serde_json::Value>,
}
