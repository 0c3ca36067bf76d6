// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type for job scheduling operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors that can occur while scheduling or running jobs.
#[derive(Debug, Error)]
pub enum JobError {
	#[error("job not found: {0}")]
	NotFound(String),

	#[error("job was cancelled")]
	Cancelled,

	#[error("job failed: {0}")]
	Failed(String),

	#[error("database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("internal error: {0}")]
	Internal(String),
}
