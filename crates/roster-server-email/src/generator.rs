// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Collision-free address generation.
//!
//! The core crate builds the canonical candidate from a person's name; this
//! module probes the store for a free variant, appending a counter when the
//! plain candidate is taken. Each probe is a point lookup, never a scan.

use std::sync::Arc;

use tracing::{debug, instrument};

use roster_email_core::{candidate, EmailError, NameCharacterSet};

use crate::error::Result;
use crate::repository::EmailAddressRepository;

/// Upper bound of probes per candidate, the plain candidate included.
const MAX_GENERATION_ATTEMPTS: u32 = 50;

/// Turns a person's name into a local part that is free on a given domain.
pub struct AddressCandidateGenerator {
	repository: Arc<dyn EmailAddressRepository>,
	character_set: Arc<dyn NameCharacterSet>,
}

impl AddressCandidateGenerator {
	pub fn new(
		repository: Arc<dyn EmailAddressRepository>,
		character_set: Arc<dyn NameCharacterSet>,
	) -> Self {
		Self {
			repository,
			character_set,
		}
	}

	/// The canonical local-part candidate for a name, without any
	/// availability check.
	pub fn generate(&self, given_name: &str, family_name: &str) -> Result<String> {
		Ok(candidate::local_part(
			&*self.character_set,
			given_name,
			family_name,
		)?)
	}

	/// Probe `local_part@domain`, then `local_part1@domain` and so on until
	/// a free address is found. Returns the local part that was free.
	#[instrument(skip(self))]
	pub async fn ensure_available(&self, local_part: &str, domain: &str) -> Result<String> {
		for attempt in 0..MAX_GENERATION_ATTEMPTS {
			let probe = if attempt == 0 {
				local_part.to_string()
			} else {
				format!("{local_part}{attempt}")
			};

			if self
				.repository
				.find_by_address(&format!("{probe}@{domain}"))
				.await?
				.is_none()
			{
				debug!(local_part = %probe, attempt, "found available local part");
				return Ok(probe);
			}
		}

		Err(EmailError::GenerationAttemptsExceeded.into())
	}

	/// Candidate construction and availability probing in one step.
	#[instrument(skip(self))]
	pub async fn generate_available(
		&self,
		given_name: &str,
		family_name: &str,
		domain: &str,
	) -> Result<String> {
		let candidate = self.generate(given_name, family_name)?;
		self.ensure_available(&candidate, domain).await
	}

	/// Whether `address` is the canonical candidate for the name.
	pub fn is_equal(&self, address: &str, given_name: &str, family_name: &str) -> bool {
		candidate::is_equal(&*self.character_set, address, given_name, family_name)
	}

	/// Like [`AddressCandidateGenerator::is_equal`], but tolerating the
	/// counter suffixes produced by the probing loop.
	pub fn is_equal_ignore_count(&self, address: &str, given_name: &str, family_name: &str) -> bool {
		candidate::is_equal_ignore_count(&*self.character_set, address, given_name, family_name)
	}
}
