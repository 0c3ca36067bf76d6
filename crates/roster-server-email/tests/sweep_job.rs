// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The deletion sweep wired through the job scheduler.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;

use roster_email_core::{EmailAddress, EmailAddressStatus, OxAccountId, PersonId};
use roster_server_email::{
	init_schema, DeletionCoordinator, DeletionSweepJob, DeletionSweeper, DirectoryClient,
	EmailAddressRepository, EmailLifecycleConfig, EventPublisher, EventTransport,
	MailPlatformClient, Result, SqliteEmailAddressRepository, SqlitePersonRepository,
};
use roster_server_jobs::{JobRunStore, JobScheduler, JobStatus};

struct NullTransport;

#[async_trait]
impl EventTransport for NullTransport {
	async fn publish(&self, _event_type: &str, _payload: Value) -> Result<()> {
		Ok(())
	}
}

struct OkMailPlatform;

#[async_trait]
impl MailPlatformClient for OkMailPlatform {
	async fn change_user_alternate_address(
		&self,
		_account_id: OxAccountId,
		_new_alternate: &str,
	) -> Result<()> {
		Ok(())
	}
}

struct OkDirectory;

#[async_trait]
impl DirectoryClient for OkDirectory {
	async fn update_person_emails(
		&self,
		external_id: &str,
		_domain: &str,
		_primary_address: &str,
		_alternate_address: Option<&str>,
	) -> Result<String> {
		Ok(format!("uid=test,{external_id}"))
	}
}

#[tokio::test]
async fn test_triggered_sweep_job_records_its_counts() {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.expect("Failed to create test pool");
	init_schema(&pool).await.unwrap();
	roster_server_jobs::init_schema(&pool).await.unwrap();

	let addresses = Arc::new(SqliteEmailAddressRepository::new(pool.clone()));
	let persons = Arc::new(SqlitePersonRepository::new(pool.clone()));
	let publisher = Arc::new(EventPublisher::new(
		Arc::new(NullTransport),
		Arc::new(NullTransport),
	));
	let coordinator = Arc::new(DeletionCoordinator::new(
		addresses.clone(),
		persons,
		publisher,
		EmailLifecycleConfig::default(),
	));
	let sweeper = Arc::new(DeletionSweeper::new(
		addresses.clone(),
		Arc::new(OkMailPlatform),
		Arc::new(OkDirectory),
		coordinator,
	));

	// One decommissioned row that the sweep fast-deletes.
	let mut old = EmailAddress::new(
		"ancient@example.org",
		2,
		Some(PersonId::new()),
		"ext-1",
		EmailAddressStatus::Disabled,
	);
	old.ox_account_id = Some(OxAccountId(1001));
	old.marked_for_removal_at = Some(Utc::now() - Duration::days(3));
	addresses.save(&old).await.unwrap();

	let store = Arc::new(JobRunStore::new(pool));
	let mut scheduler = JobScheduler::new(store.clone());
	scheduler.register(
		Arc::new(DeletionSweepJob::new(sweeper)),
		StdDuration::from_secs(3600),
	);

	let run_id = scheduler.trigger("email-deletion-sweep").await.unwrap();

	let last = store.last_run("email-deletion-sweep").await.unwrap().unwrap();
	assert_eq!(last.id, run_id);
	assert_eq!(last.status, JobStatus::Succeeded);
	let metadata = last.metadata.expect("sweep job reports counts");
	assert_eq!(metadata["processed"], 1);
	assert_eq!(metadata["total_eligible"], 1);

	assert!(addresses
		.find_by_address("ancient@example.org")
		.await
		.unwrap()
		.is_none());
}
