// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event payloads exchanged over the pub/sub transports.
//!
//! Each logical event has one canonical payload type. The publish boundary
//! fans a payload out to both transports: the modern transport carries the
//! tagged envelope produced by serializing [`EmailEvent`], the legacy
//! transport carries a flat camelCase object assembled by the bus adapter.
//!
//! # Events
//!
//! Published by this engine:
//! - `email.address.marked_for_deletion` - an address was handed to the external systems for removal
//! - `email.addresses.purged` - a person has no email address rows left
//!
//! Consumed by this engine:
//! - `email.address.deleted.ldap` - the directory confirmed deletion
//! - `email.address.deleted.ox` - the mail platform confirmed deletion
//! - `email.address.deleted.database` - the local row was removed

use serde::{Deserialize, Serialize};

use crate::address::{EmailAddressId, EmailAddressStatus, OxAccountId};
use crate::person::PersonId;

/// An address has been marked for deletion and forwarded to the external
/// systems. The username is absent when the owning person was already
/// removed; such addresses are still purged everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddressMarkedForDeletion {
	pub person_id: Option<PersonId>,
	pub username: Option<String>,
	pub ox_account_id: OxAccountId,
	pub address_id: EmailAddressId,
	pub status: EmailAddressStatus,
	pub address: String,
}

/// A person's email presence is fully retired: no address rows remain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddressesPurged {
	pub person_id: Option<PersonId>,
	pub username: Option<String>,
	pub ox_account_id: OxAccountId,
}

/// The directory confirmed that it no longer carries the address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdapEmailAddressDeleted {
	pub person_id: PersonId,
	pub username: Option<String>,
	pub address: String,
}

/// The mail platform confirmed that the mailbox address is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxEmailAddressDeleted {
	pub person_id: PersonId,
	pub username: Option<String>,
	pub ox_account_id: OxAccountId,
	pub address: String,
}

/// The local row was removed; triggers the purge check for the person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddressDeletedInDatabase {
	pub person_id: Option<PersonId>,
	pub ox_account_id: OxAccountId,
	pub address_id: EmailAddressId,
	pub status: EmailAddressStatus,
	pub address: String,
}

/// Envelope over every logical event carried on the transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum EmailEvent {
	#[serde(rename = "email.address.marked_for_deletion")]
	MarkedForDeletion(EmailAddressMarkedForDeletion),

	#[serde(rename = "email.addresses.purged")]
	Purged(EmailAddressesPurged),

	#[serde(rename = "email.address.deleted.ldap")]
	LdapDeleted(LdapEmailAddressDeleted),

	#[serde(rename = "email.address.deleted.ox")]
	OxDeleted(OxEmailAddressDeleted),

	#[serde(rename = "email.address.deleted.database")]
	DatabaseDeleted(EmailAddressDeletedInDatabase),
}

impl EmailEvent {
	/// Event type tag on the modern transport.
	#[must_use]
	pub fn event_type(&self) -> &'static str {
		match self {
			EmailEvent::MarkedForDeletion(_) => "email.address.marked_for_deletion",
			EmailEvent::Purged(_) => "email.addresses.purged",
			EmailEvent::LdapDeleted(_) => "email.address.deleted.ldap",
			EmailEvent::OxDeleted(_) => "email.address.deleted.ox",
			EmailEvent::DatabaseDeleted(_) => "email.address.deleted.database",
		}
	}

	/// Event name on the legacy transport, which addresses subscribers by
	/// class-style event names.
	#[must_use]
	pub fn legacy_type(&self) -> &'static str {
		match self {
			EmailEvent::MarkedForDeletion(_) => "EmailAddressMarkedForDeletionEvent",
			EmailEvent::Purged(_) => "EmailAddressesPurgedEvent",
			EmailEvent::LdapDeleted(_) => "LdapEmailAddressDeletedEvent",
			EmailEvent::OxDeleted(_) => "OxEmailAddressDeletedEvent",
			EmailEvent::DatabaseDeleted(_) => "EmailAddressDeletedInDatabaseEvent",
		}
	}
}

impl From<EmailAddressMarkedForDeletion> for EmailEvent {
	fn from(payload: EmailAddressMarkedForDeletion) -> Self {
		EmailEvent::MarkedForDeletion(payload)
	}
}

impl From<EmailAddressesPurged> for EmailEvent {
	fn from(payload: EmailAddressesPurged) -> Self {
		EmailEvent::Purged(payload)
	}
}

impl From<LdapEmailAddressDeleted> for EmailEvent {
	fn from(payload: LdapEmailAddressDeleted) -> Self {
		EmailEvent::LdapDeleted(payload)
	}
}

impl From<OxEmailAddressDeleted> for EmailEvent {
	fn from(payload: OxEmailAddressDeleted) -> Self {
		EmailEvent::OxDeleted(payload)
	}
}

impl From<EmailAddressDeletedInDatabase> for EmailEvent {
	fn from(payload: EmailAddressDeletedInDatabase) -> Self {
		EmailEvent::DatabaseDeleted(payload)
	}
}
