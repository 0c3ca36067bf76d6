// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cross-system deletion orchestration.
//!
//! The coordinator resolves the owning person for deletion-eligible
//! addresses and notifies the external systems via the dual publisher. It
//! also owns the terminal purge check that fires once a person's last row
//! is gone. Failures are contained per address; a batch never aborts as a
//! whole.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, instrument, warn};

use roster_email_core::{
	EmailAddress, EmailAddressMarkedForDeletion, EmailAddressStatus, EmailAddressesPurged,
	OxAccountId, PersonId,
};

use crate::bus::EventPublisher;
use crate::config::EmailLifecycleConfig;
use crate::error::Result;
use crate::repository::{EmailAddressRepository, PersonRepository};

/// Counts reported by one deletion batch. Informational; the authoritative
/// state lives in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionBatchOutcome {
	pub processed: u64,
	pub total: u64,
}

pub struct DeletionCoordinator {
	addresses: Arc<dyn EmailAddressRepository>,
	persons: Arc<dyn PersonRepository>,
	publisher: Arc<EventPublisher>,
	config: EmailLifecycleConfig,
}

impl DeletionCoordinator {
	pub fn new(
		addresses: Arc<dyn EmailAddressRepository>,
		persons: Arc<dyn PersonRepository>,
		publisher: Arc<EventPublisher>,
		config: EmailLifecycleConfig,
	) -> Self {
		Self {
			addresses,
			persons,
			publisher,
			config,
		}
	}

	/// Fetch up to `limit` addresses that are terminal-pending or stale and
	/// hand each of them to the external systems.
	#[instrument(skip(self))]
	pub async fn delete_email_addresses(&self, limit: u32) -> Result<DeletionBatchOutcome> {
		let stale_before = Utc::now() - Duration::days(self.config.staleness_days);
		let due = self.addresses.find_due_for_deletion(stale_before, limit).await?;

		let total = due.len() as u64;
		let mut processed = 0;
		for address in &due {
			if self.forward_for_deletion(address).await {
				processed += 1;
			}
		}

		info!(processed, total, "deletion batch finished");
		Ok(DeletionBatchOutcome { processed, total })
	}

	/// Forward every address of a person for deletion. This is the sweeper's
	/// delegation target when a person keeps no address at all. Returns the
	/// number of addresses actually forwarded.
	#[instrument(skip(self), fields(person_id = %person_id))]
	pub async fn request_person_removal(&self, person_id: PersonId) -> Result<u64> {
		let all = self.addresses.find_by_person(person_id).await?;

		let mut forwarded = 0;
		for address in &all {
			if self.forward_for_deletion(address).await {
				forwarded += 1;
			}
		}

		Ok(forwarded)
	}

	/// Publish the marked-for-deletion notification for one address.
	///
	/// An address without a mail-platform account cannot be processed
	/// downstream and is skipped. A missing owner does not stop the
	/// forwarding: orphaned addresses must still be purged from the
	/// external systems, they just go out without a username.
	async fn forward_for_deletion(&self, address: &EmailAddress) -> bool {
		let Some(ox_account_id) = address.ox_account_id else {
			warn!(
				address = %address.address,
				"no mail-platform account recorded, cannot forward for deletion"
			);
			return false;
		};

		let username = match address.person_id {
			Some(person_id) => match self.persons.find_by_id(person_id).await {
				Ok(Some(person)) => person.username,
				Ok(None) => {
					info!(
						%person_id,
						address = %address.address,
						"owner no longer exists, forwarding orphaned address"
					);
					None
				}
				Err(e) => {
					error!(%person_id, error = %e, "failed to resolve owner, skipping address");
					return false;
				}
			},
			None => None,
		};

		let status = address
			.status()
			.unwrap_or(EmailAddressStatus::ToBeDeleted);

		self.publisher
			.publish(
				EmailAddressMarkedForDeletion {
					person_id: address.person_id,
					username,
					ox_account_id,
					address_id: address.id,
					status,
					address: address.address.clone(),
				}
				.into(),
			)
			.await;

		true
	}

	/// Re-check a person's remaining addresses after an external deletion
	/// confirmation and publish the purge notification once none remain.
	///
	/// An absent `person_id` still publishes the purge signal as best-effort
	/// cleanup; a known id whose person record is gone aborts with an error
	/// log instead, because "no addresses" and "broken reference" cannot be
	/// told apart there.
	#[instrument(skip(self))]
	pub async fn check_remaining_addresses(
		&self,
		person_id: Option<PersonId>,
		ox_account_id: OxAccountId,
	) -> Result<()> {
		let Some(person_id) = person_id else {
			self.publisher
				.publish(
					EmailAddressesPurged {
						person_id: None,
						username: None,
						ox_account_id,
					}
					.into(),
				)
				.await;
			return Ok(());
		};

		let person = match self.persons.find_by_id(person_id).await? {
			Some(person) => person,
			None => {
				error!(%person_id, "person not found during purge check");
				return Ok(());
			}
		};

		let remaining = self.addresses.find_by_person(person_id).await?;
		if !remaining.is_empty() {
			return Ok(());
		}

		self.publisher
			.publish(
				EmailAddressesPurged {
					person_id: Some(person_id),
					username: person.username,
					ox_account_id,
				}
				.into(),
			)
			.await;

		Ok(())
	}
}
