// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Contracts for the external systems of record.
//!
//! The mail platform hosts the mailboxes, the directory exposes person and
//! email attributes for lookup and authentication. Production
//! implementations wrap the respective client libraries and are wired in by
//! the server; the lifecycle engine only depends on these traits.

use async_trait::async_trait;

use roster_email_core::OxAccountId;

use crate::error::Result;

/// Mail-platform operations used by the lifecycle engine.
#[async_trait]
pub trait MailPlatformClient: Send + Sync {
	/// Point the account's alternate-address field at `new_alternate`.
	async fn change_user_alternate_address(
		&self,
		account_id: OxAccountId,
		new_alternate: &str,
	) -> Result<()>;
}

/// Directory operations used by the lifecycle engine.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
	/// Rewrite the email attributes of the entry correlated via
	/// `external_id`. Returns the distinguished name the directory reports
	/// for the updated entry.
	async fn update_person_emails(
		&self,
		external_id: &str,
		domain: &str,
		primary_address: &str,
		alternate_address: Option<&str>,
	) -> Result<String>;
}
