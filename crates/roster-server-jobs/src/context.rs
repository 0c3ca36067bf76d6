// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tokio_util::sync::CancellationToken;

use crate::store::TriggerSource;

/// Per-run state handed to a job. Long-running jobs should poll the
/// cancellation token between units of work.
pub struct JobContext {
	pub run_id: String,
	pub triggered_by: TriggerSource,
	pub cancellation: CancellationToken,
}
