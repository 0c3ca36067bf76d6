// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Roster email identity lifecycle.
//!
//! This crate holds the domain model shared by the email provisioning and
//! deletion services: the `EmailAddress` aggregate with its status history,
//! the local-part candidate construction rules, the person record, and the
//! event payloads exchanged with the mail platform and the directory.

pub mod address;
pub mod candidate;
pub mod error;
pub mod events;
pub mod person;

pub use address::{
	EmailAddress, EmailAddressId, EmailAddressStatus, OxAccountId, StatusEntry, ALTERNATE_RANK,
	PRIMARY_RANK,
};
pub use candidate::{LatinNameCharacterSet, NameCharacterSet};
pub use error::{EmailError, Result};
pub use events::{
	EmailAddressDeletedInDatabase, EmailAddressMarkedForDeletion, EmailAddressesPurged, EmailEvent,
	LdapEmailAddressDeleted, OxEmailAddressDeleted,
};
pub use person::{Person, PersonId};
