// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the email lifecycle engine.

use thiserror::Error;

use roster_email_core::{EmailError, PersonId};

/// Result type for email lifecycle operations.
pub type Result<T> = std::result::Result<T, EmailServerError>;

/// Errors that can occur in the email lifecycle engine.
#[derive(Debug, Error)]
pub enum EmailServerError {
	#[error("database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error(transparent)]
	Email(#[from] EmailError),

	#[error("email address not found: {0}")]
	AddressNotFound(String),

	#[error("person not found: {0}")]
	PersonNotFound(PersonId),

	#[error("mail platform request failed: {0}")]
	MailPlatform(String),

	#[error("directory request failed: {0}")]
	Directory(String),

	#[error("event publish failed: {0}")]
	Publish(String),

	#[error("internal error: {0}")]
	Internal(String),
}
