// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reactions to deletion confirmations from the external systems.
//!
//! The directory and the mail platform confirm independently and in any
//! order; each confirmation advances the address state machine, and the
//! second one makes the row disappear. Handlers are idempotent: a duplicate
//! confirmation for an already removed address simply finds nothing to act
//! on. Each invocation is handed to the transport in isolation and shares
//! no mutable state with other in-flight events.

use std::sync::Arc;

use tracing::{error, info, instrument};

use roster_email_core::{
	EmailAddress, EmailAddressDeletedInDatabase, EmailAddressStatus, LdapEmailAddressDeleted,
	OxEmailAddressDeleted,
};

use crate::bus::EventPublisher;
use crate::coordinator::DeletionCoordinator;
use crate::error::Result;
use crate::repository::EmailAddressRepository;

pub struct DeletionEventHandler {
	addresses: Arc<dyn EmailAddressRepository>,
	coordinator: Arc<DeletionCoordinator>,
	publisher: Arc<EventPublisher>,
}

impl DeletionEventHandler {
	pub fn new(
		addresses: Arc<dyn EmailAddressRepository>,
		coordinator: Arc<DeletionCoordinator>,
		publisher: Arc<EventPublisher>,
	) -> Self {
		Self {
			addresses,
			coordinator,
			publisher,
		}
	}

	/// The directory no longer carries the address.
	#[instrument(skip(self, event), fields(address = %event.address))]
	pub async fn handle_ldap_deleted(&self, event: &LdapEmailAddressDeleted) -> Result<()> {
		let Some(mut address) = self.addresses.find_by_address(&event.address).await? else {
			info!(address = %event.address, "address not found, possibly already purged");
			return Ok(());
		};

		let new_status = address.deleted_from_ldap();
		self.apply_transition(address, new_status).await;
		Ok(())
	}

	/// The mail platform no longer carries the mailbox address.
	#[instrument(skip(self, event), fields(address = %event.address))]
	pub async fn handle_ox_deleted(&self, event: &OxEmailAddressDeleted) -> Result<()> {
		let Some(mut address) = self.addresses.find_by_address(&event.address).await? else {
			info!(address = %event.address, "address not found, possibly already purged");
			return Ok(());
		};

		let new_status = address.deleted_from_ox();
		self.apply_transition(address, new_status).await;
		Ok(())
	}

	/// The local row is gone; run the purge check for the owner.
	#[instrument(skip(self, event), fields(address = %event.address))]
	pub async fn handle_database_deleted(&self, event: &EmailAddressDeletedInDatabase) -> Result<()> {
		self.coordinator
			.check_remaining_addresses(event.person_id, event.ox_account_id)
			.await
	}

	/// Shared post-transition step: a terminal status removes the row and
	/// announces the database deletion, anything else persists the new
	/// history. Failures are logged, not retried; the row is revisited when
	/// the next duplicate confirmation arrives.
	async fn apply_transition(&self, address: EmailAddress, new_status: EmailAddressStatus) {
		if new_status == EmailAddressStatus::Deleted {
			if let Err(e) = self.addresses.delete(&address).await {
				error!(address = %address.address, error = %e, "failed to delete address row");
				return;
			}

			let Some(ox_account_id) = address.ox_account_id else {
				info!(
					address = %address.address,
					"row deleted but no mail-platform account recorded, skipping confirmation event"
				);
				return;
			};
			self.publisher
				.publish(
					EmailAddressDeletedInDatabase {
						person_id: address.person_id,
						ox_account_id,
						address_id: address.id,
						status: new_status,
						address: address.address.clone(),
					}
					.into(),
				)
				.await;
			return;
		}

		if let Err(e) = self.addresses.save(&address).await {
			error!(address = %address.address, error = %e, "failed to persist status change");
		}
	}
}
