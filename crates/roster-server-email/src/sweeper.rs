// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic deletion sweep.
//!
//! One sweep fast-deletes the decommissioned (priority >= 2) rows in bulk,
//! then walks the affected persons one at a time; the external systems are
//! rate-sensitive, so there is no parallelism across persons. Per-person
//! failures are contained and the rows stay marked, which makes the next
//! sweep the retry mechanism.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use roster_email_core::{
	EmailAddress, EmailAddressStatus, PersonId, ALTERNATE_RANK, PRIMARY_RANK,
};

use crate::clients::{DirectoryClient, MailPlatformClient};
use crate::coordinator::DeletionCoordinator;
use crate::error::Result;
use crate::repository::EmailAddressRepository;

/// Counts reported by one sweep. Informational; the store is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepOutcome {
	pub processed: u64,
	pub total_eligible: u64,
}

pub struct DeletionSweeper {
	addresses: Arc<dyn EmailAddressRepository>,
	mail_platform: Arc<dyn MailPlatformClient>,
	directory: Arc<dyn DirectoryClient>,
	coordinator: Arc<DeletionCoordinator>,
}

impl DeletionSweeper {
	pub fn new(
		addresses: Arc<dyn EmailAddressRepository>,
		mail_platform: Arc<dyn MailPlatformClient>,
		directory: Arc<dyn DirectoryClient>,
		coordinator: Arc<DeletionCoordinator>,
	) -> Self {
		Self {
			addresses,
			mail_platform,
			directory,
			coordinator,
		}
	}

	/// Run one sweep over everything whose removal mark has passed.
	#[instrument(skip(self))]
	pub async fn run_deletion_sweep(&self) -> Result<SweepOutcome> {
		let now = Utc::now();

		let fast_deleted = self.addresses.delete_decommissioned_eligible(now).await?;
		let mut outcome = SweepOutcome {
			processed: fast_deleted,
			total_eligible: fast_deleted,
		};

		let person_ids = self.addresses.find_person_ids_eligible(now).await?;
		for person_id in person_ids {
			match self.sweep_person(person_id, now).await {
				Ok(person_outcome) => {
					outcome.processed += person_outcome.processed;
					outcome.total_eligible += person_outcome.total_eligible;
				}
				Err(e) => {
					error!(%person_id, error = %e, "sweep failed for person, will retry next sweep");
				}
			}
		}

		info!(
			processed = outcome.processed,
			total_eligible = outcome.total_eligible,
			"deletion sweep finished"
		);
		Ok(outcome)
	}

	/// Resolve one person's eligible addresses.
	///
	/// Either the whole address set is due, in which case removal is
	/// delegated to the cross-system deletion path, or exactly the alternate
	/// is leaving while the primary stays. Anything else is a data-integrity
	/// anomaly: logged, no side effects for this person.
	async fn sweep_person(&self, person_id: PersonId, now: DateTime<Utc>) -> Result<SweepOutcome> {
		let all = self.addresses.find_by_person(person_id).await?;
		let eligible: Vec<&EmailAddress> =
			all.iter().filter(|a| a.is_removal_due(now)).collect();
		let eligible_count = eligible.len() as u64;

		if eligible.is_empty() {
			return Ok(SweepOutcome::default());
		}

		if eligible.len() == all.len() {
			let forwarded = self.coordinator.request_person_removal(person_id).await?;
			return Ok(SweepOutcome {
				processed: forwarded,
				total_eligible: eligible_count,
			});
		}

		let &[alternate] = eligible.as_slice() else {
			warn!(
				%person_id,
				eligible = eligible_count,
				"more than one address due while others remain, aborting for person"
			);
			return Ok(SweepOutcome {
				processed: 0,
				total_eligible: eligible_count,
			});
		};
		if alternate.priority != ALTERNATE_RANK {
			warn!(
				%person_id,
				priority = alternate.priority,
				"due address is not the alternate, aborting for person"
			);
			return Ok(SweepOutcome {
				processed: 0,
				total_eligible: eligible_count,
			});
		}
		let Some(primary) = all
			.iter()
			.find(|a| a.priority == PRIMARY_RANK && !a.is_removal_due(now))
		else {
			warn!(%person_id, "no primary address remains, aborting for person");
			return Ok(SweepOutcome {
				processed: 0,
				total_eligible: eligible_count,
			});
		};

		let removed = self.remove_alternate(person_id, alternate, primary).await?;
		Ok(SweepOutcome {
			processed: u64::from(removed),
			total_eligible: eligible_count,
		})
	}

	/// Mark the alternate, reconcile both external systems onto the primary
	/// and delete the row only when both updates succeeded. A failed update
	/// leaves the row in `ToBeDeleted` with its mark intact for the next
	/// sweep.
	async fn remove_alternate(
		&self,
		person_id: PersonId,
		alternate: &EmailAddress,
		primary: &EmailAddress,
	) -> Result<bool> {
		let mut alternate = alternate.clone();
		alternate.set_status(EmailAddressStatus::ToBeDeleted);
		let alternate = self.addresses.save(&alternate).await?;

		let Some(account_id) = alternate.ox_account_id.or(primary.ox_account_id) else {
			warn!(
				%person_id,
				address = %alternate.address,
				"no mail-platform account on either row, leaving alternate for follow-up"
			);
			return Ok(false);
		};
		let Some(domain) = primary.domain() else {
			warn!(
				%person_id,
				address = %primary.address,
				"primary address has no domain, leaving alternate for follow-up"
			);
			return Ok(false);
		};

		let mail_ok = match self
			.mail_platform
			.change_user_alternate_address(account_id, &primary.address)
			.await
		{
			Ok(()) => true,
			Err(e) => {
				warn!(%person_id, error = %e, "mail platform update failed");
				false
			}
		};

		let directory_ok = match self
			.directory
			.update_person_emails(
				&primary.external_id,
				domain,
				&primary.address,
				Some(&primary.address),
			)
			.await
		{
			Ok(entry) => {
				info!(%person_id, entry = %entry, "directory entry updated");
				true
			}
			Err(e) => {
				warn!(%person_id, error = %e, "directory update failed");
				false
			}
		};

		if !(mail_ok && directory_ok) {
			warn!(
				%person_id,
				address = %alternate.address,
				"external systems inconsistent, alternate stays in to_be_deleted until the next sweep"
			);
			return Ok(false);
		}

		self.addresses.delete(&alternate).await?;
		Ok(true)
	}
}
