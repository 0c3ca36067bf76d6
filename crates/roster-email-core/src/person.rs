// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The directory-managed person owning email addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonId(pub Uuid);

impl PersonId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for PersonId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for PersonId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for PersonId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// A person as known to the institutional directory.
///
/// The username is the directory account name; how it is generated is owned
/// by the account provisioning service, this crate only carries it along so
/// downstream systems can act on deletion notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
	pub id: PersonId,
	pub username: Option<String>,
	pub given_name: String,
	pub family_name: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Person {
	#[must_use]
	pub fn new(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id: PersonId::new(),
			username: None,
			given_name: given_name.into(),
			family_name: family_name.into(),
			created_at: now,
			updated_at: now,
		}
	}
}
