// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `EmailAddress` aggregate and its status state machine.
//!
//! An address belongs to at most one person and carries an append-only
//! status history; the most recent entry is the current status. Deletion is
//! confirmed independently by the directory and by the mail platform, in
//! either order, so the terminal transition is expressed as a symmetric
//! pair of merge operations rather than a linear chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EmailError;
use crate::person::PersonId;

/// Rank of a person's current address.
pub const PRIMARY_RANK: u32 = 0;

/// Rank of the previous address kept for transition purposes.
pub const ALTERNATE_RANK: u32 = 1;

/// Unique identifier for an email address row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddressId(pub Uuid);

impl EmailAddressId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for EmailAddressId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for EmailAddressId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for EmailAddressId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Numeric account counter on the mail platform.
///
/// Required to request mailbox deletion there; addresses whose counter was
/// never recorded cannot be forwarded to the mail platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OxAccountId(pub i64);

impl fmt::Display for OxAccountId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Lifecycle status of an email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailAddressStatus {
	/// Requested but not yet provisioned.
	Pending,
	/// The person's current, working address.
	Active,
	/// Deactivated without being scheduled for removal.
	Disabled,
	/// Temporarily suspended by an administrator.
	Suspended,
	/// Provisioning failed.
	Failed,
	/// Scheduled for removal from all systems.
	ToBeDeleted,
	/// The directory confirmed deletion; the mail platform has not.
	DeletedLdap,
	/// The mail platform confirmed deletion; the directory has not.
	DeletedOx,
	/// Both external systems confirmed deletion; the row is removed.
	Deleted,
}

impl EmailAddressStatus {
	/// Whether the status marks an address that is on its way out but whose
	/// row must be kept until both external systems have confirmed.
	#[must_use]
	pub fn is_terminal_pending(&self) -> bool {
		matches!(
			self,
			EmailAddressStatus::ToBeDeleted
				| EmailAddressStatus::DeletedLdap
				| EmailAddressStatus::DeletedOx
		)
	}
}

impl fmt::Display for EmailAddressStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			EmailAddressStatus::Pending => "pending",
			EmailAddressStatus::Active => "active",
			EmailAddressStatus::Disabled => "disabled",
			EmailAddressStatus::Suspended => "suspended",
			EmailAddressStatus::Failed => "failed",
			EmailAddressStatus::ToBeDeleted => "to_be_deleted",
			EmailAddressStatus::DeletedLdap => "deleted_ldap",
			EmailAddressStatus::DeletedOx => "deleted_ox",
			EmailAddressStatus::Deleted => "deleted",
		};
		write!(f, "{s}")
	}
}

impl FromStr for EmailAddressStatus {
	type Err = EmailError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(EmailAddressStatus::Pending),
			"active" => Ok(EmailAddressStatus::Active),
			"disabled" => Ok(EmailAddressStatus::Disabled),
			"suspended" => Ok(EmailAddressStatus::Suspended),
			"failed" => Ok(EmailAddressStatus::Failed),
			"to_be_deleted" => Ok(EmailAddressStatus::ToBeDeleted),
			"deleted_ldap" => Ok(EmailAddressStatus::DeletedLdap),
			"deleted_ox" => Ok(EmailAddressStatus::DeletedOx),
			"deleted" => Ok(EmailAddressStatus::Deleted),
			other => Err(EmailError::InvalidStatus(other.to_string())),
		}
	}
}

/// One entry in an address's append-only status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
	pub status: EmailAddressStatus,
	pub created_at: DateTime<Utc>,
}

/// An email address belonging to a person, with its status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
	pub id: EmailAddressId,

	/// Full address, `local@domain`.
	pub address: String,

	/// Rank among the person's addresses: 0 = primary, 1 = alternate,
	/// 2 and above = historical, removed without external coordination.
	pub priority: u32,

	/// Owning person. Absent when the owner was already removed; such
	/// orphaned rows must still be purged from the external systems.
	pub person_id: Option<PersonId>,

	/// Identifier the directory uses to correlate this address with an
	/// account entry.
	pub external_id: String,

	/// Mail-platform account counter, when known.
	pub ox_account_id: Option<OxAccountId>,

	/// When set and in the past at sweep time, the address is eligible for
	/// removal.
	pub marked_for_removal_at: Option<DateTime<Utc>>,

	/// Append-only status history; the last entry is the current status.
	pub statuses: Vec<StatusEntry>,

	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl EmailAddress {
	/// Create a new address with a single initial status entry.
	#[must_use]
	pub fn new(
		address: impl Into<String>,
		priority: u32,
		person_id: Option<PersonId>,
		external_id: impl Into<String>,
		status: EmailAddressStatus,
	) -> Self {
		let now = Utc::now();
		Self {
			id: EmailAddressId::new(),
			address: address.into(),
			priority,
			person_id,
			external_id: external_id.into(),
			ox_account_id: None,
			marked_for_removal_at: None,
			statuses: vec![StatusEntry {
				status,
				created_at: now,
			}],
			created_at: now,
			updated_at: now,
		}
	}

	/// The current status, or `None` when no history exists.
	#[must_use]
	pub fn status(&self) -> Option<EmailAddressStatus> {
		self.statuses.last().map(|entry| entry.status)
	}

	/// Append `new_status` to the history unless it already is the current
	/// status. Re-applying the current status is a no-op; no other
	/// sequencing is enforced here, callers own the ordering.
	pub fn set_status(&mut self, new_status: EmailAddressStatus) -> EmailAddressStatus {
		if self.status() != Some(new_status) {
			self.statuses.push(StatusEntry {
				status: new_status,
				created_at: Utc::now(),
			});
		}
		new_status
	}

	/// Record the directory's deletion confirmation. When the mail platform
	/// already confirmed, the address becomes `Deleted`; otherwise it waits
	/// in `DeletedLdap`.
	pub fn deleted_from_ldap(&mut self) -> EmailAddressStatus {
		if self.status() == Some(EmailAddressStatus::DeletedOx) {
			self.set_status(EmailAddressStatus::Deleted)
		} else {
			self.set_status(EmailAddressStatus::DeletedLdap)
		}
	}

	/// Record the mail platform's deletion confirmation, symmetric to
	/// [`EmailAddress::deleted_from_ldap`].
	pub fn deleted_from_ox(&mut self) -> EmailAddressStatus {
		if self.status() == Some(EmailAddressStatus::DeletedLdap) {
			self.set_status(EmailAddressStatus::Deleted)
		} else {
			self.set_status(EmailAddressStatus::DeletedOx)
		}
	}

	/// The domain part of the address: everything after the last `'@'`.
	///
	/// An address without `'@'` has no domain. An address that ends in
	/// `'@'` has the empty domain, which is distinct from having none.
	#[must_use]
	pub fn domain(&self) -> Option<&str> {
		self.address.rfind('@').map(|at| &self.address[at + 1..])
	}

	/// Whether this address ranks below the alternate and is removed in
	/// bulk, without coordinating with the external systems.
	#[must_use]
	pub fn is_decommissioned(&self) -> bool {
		self.priority > ALTERNATE_RANK
	}

	/// Whether the removal mark is set and has passed.
	#[must_use]
	pub fn is_removal_due(&self, now: DateTime<Utc>) -> bool {
		self.marked_for_removal_at
			.is_some_and(|marked| marked <= now)
	}
}
