// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the email lifecycle core.

use thiserror::Error;

/// Result type for core email operations.
pub type Result<T> = std::result::Result<T, EmailError>;

/// Errors that can occur while constructing email address candidates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
	#[error("name is too short")]
	InvalidLength,

	#[error("name contains characters outside the permitted set")]
	InvalidCharacterSet,

	#[error("name does not yield a usable local part")]
	InvalidName,

	#[error("exceeded the maximum number of address generation attempts")]
	GenerationAttemptsExceeded,

	#[error("unknown email address status: {0}")]
	InvalidStatus(String),
}
