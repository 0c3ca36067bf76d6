// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Repository layer for email addresses and persons.
//!
//! Every mutation is a discrete, independently committed statement; there is
//! no transaction spanning a sweep or an event-handling call, so a crash
//! leaves a partial state that the next run resumes safely. The full status
//! history rides in a JSON column while the current status is denormalized
//! into its own column for filtering.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use roster_email_core::{EmailAddress, OxAccountId, Person, PersonId, StatusEntry};

use crate::error::{EmailServerError, Result};

/// Persistence boundary for [`EmailAddress`] rows.
#[async_trait]
pub trait EmailAddressRepository: Send + Sync {
	/// Point lookup by the literal address string.
	async fn find_by_address(&self, address: &str) -> Result<Option<EmailAddress>>;

	/// All addresses of a person, any priority and status, lowest priority
	/// first.
	async fn find_by_person(&self, person_id: PersonId) -> Result<Vec<EmailAddress>>;

	/// All addresses whose removal mark is set and has passed.
	async fn find_eligible_for_removal(&self, now: DateTime<Utc>) -> Result<Vec<EmailAddress>>;

	/// Bulk-delete the decommissioned (priority >= 2) addresses whose
	/// removal mark has passed. Returns the number of deleted rows.
	async fn delete_decommissioned_eligible(&self, now: DateTime<Utc>) -> Result<u64>;

	/// Distinct owners of primary/alternate addresses whose removal mark
	/// has passed.
	async fn find_person_ids_eligible(&self, now: DateTime<Utc>) -> Result<Vec<PersonId>>;

	/// Up to `limit` addresses that sit in a terminal-pending status or
	/// have not been touched since `stale_before`.
	async fn find_due_for_deletion(
		&self,
		stale_before: DateTime<Utc>,
		limit: u32,
	) -> Result<Vec<EmailAddress>>;

	/// Upsert the aggregate and return it with a refreshed update time.
	async fn save(&self, address: &EmailAddress) -> Result<EmailAddress>;

	/// Remove the row. Removing an already absent row is not an error.
	async fn delete(&self, address: &EmailAddress) -> Result<()>;
}

/// Persistence boundary for [`Person`] rows.
#[async_trait]
pub trait PersonRepository: Send + Sync {
	async fn find_by_id(&self, id: PersonId) -> Result<Option<Person>>;
	async fn save(&self, person: &Person) -> Result<Person>;
}

/// SQLite implementation of the email address repository.
#[derive(Clone)]
pub struct SqliteEmailAddressRepository {
	pool: SqlitePool,
}

impl SqliteEmailAddressRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl EmailAddressRepository for SqliteEmailAddressRepository {
	#[instrument(skip(self))]
	async fn find_by_address(&self, address: &str) -> Result<Option<EmailAddress>> {
		let row = sqlx::query_as::<_, EmailAddressRow>(
			"SELECT * FROM email_addresses WHERE address = ?",
		)
		.bind(address)
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self), fields(person_id = %person_id))]
	async fn find_by_person(&self, person_id: PersonId) -> Result<Vec<EmailAddress>> {
		let rows = sqlx::query_as::<_, EmailAddressRow>(
			"SELECT * FROM email_addresses WHERE person_id = ? ORDER BY priority ASC",
		)
		.bind(person_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self))]
	async fn find_eligible_for_removal(&self, now: DateTime<Utc>) -> Result<Vec<EmailAddress>> {
		let rows = sqlx::query_as::<_, EmailAddressRow>(
			r#"
			SELECT * FROM email_addresses
			WHERE marked_for_removal_at IS NOT NULL AND marked_for_removal_at <= ?
			ORDER BY priority ASC
			"#,
		)
		.bind(now.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self))]
	async fn delete_decommissioned_eligible(&self, now: DateTime<Utc>) -> Result<u64> {
		let result = sqlx::query(
			r#"
			DELETE FROM email_addresses
			WHERE priority >= 2
				AND marked_for_removal_at IS NOT NULL
				AND marked_for_removal_at <= ?
			"#,
		)
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected())
	}

	#[instrument(skip(self))]
	async fn find_person_ids_eligible(&self, now: DateTime<Utc>) -> Result<Vec<PersonId>> {
		let ids: Vec<(String,)> = sqlx::query_as(
			r#"
			SELECT DISTINCT person_id FROM email_addresses
			WHERE priority <= 1
				AND person_id IS NOT NULL
				AND marked_for_removal_at IS NOT NULL
				AND marked_for_removal_at <= ?
			"#,
		)
		.bind(now.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		ids.into_iter()
			.map(|(id,)| {
				id.parse()
					.map_err(|_| EmailServerError::Internal(format!("Invalid person ID: {id}")))
			})
			.collect()
	}

	#[instrument(skip(self))]
	async fn find_due_for_deletion(
		&self,
		stale_before: DateTime<Utc>,
		limit: u32,
	) -> Result<Vec<EmailAddress>> {
		let rows = sqlx::query_as::<_, EmailAddressRow>(
			r#"
			SELECT * FROM email_addresses
			WHERE current_status IN ('to_be_deleted', 'deleted_ldap', 'deleted_ox')
				OR updated_at < ?
			ORDER BY updated_at ASC
			LIMIT ?
			"#,
		)
		.bind(stale_before.to_rfc3339())
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, address), fields(address = %address.address))]
	async fn save(&self, address: &EmailAddress) -> Result<EmailAddress> {
		let mut stored = address.clone();
		stored.updated_at = Utc::now();

		let statuses_json = serde_json::to_string(&stored.statuses)?;

		sqlx::query(
			r#"
			INSERT INTO email_addresses (
				id, address, priority, person_id, external_id, ox_account_id,
				marked_for_removal_at, current_status, statuses, created_at, updated_at
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				address = excluded.address,
				priority = excluded.priority,
				person_id = excluded.person_id,
				external_id = excluded.external_id,
				ox_account_id = excluded.ox_account_id,
				marked_for_removal_at = excluded.marked_for_removal_at,
				current_status = excluded.current_status,
				statuses = excluded.statuses,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(stored.id.to_string())
		.bind(&stored.address)
		.bind(stored.priority as i64)
		.bind(stored.person_id.map(|id| id.to_string()))
		.bind(&stored.external_id)
		.bind(stored.ox_account_id.map(|id| id.0))
		.bind(stored.marked_for_removal_at.map(|dt| dt.to_rfc3339()))
		.bind(stored.status().map(|s| s.to_string()))
		.bind(statuses_json)
		.bind(stored.created_at.to_rfc3339())
		.bind(stored.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(stored)
	}

	#[instrument(skip(self, address), fields(address = %address.address))]
	async fn delete(&self, address: &EmailAddress) -> Result<()> {
		sqlx::query("DELETE FROM email_addresses WHERE id = ?")
			.bind(address.id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(())
	}
}

/// SQLite implementation of the person repository.
#[derive(Clone)]
pub struct SqlitePersonRepository {
	pool: SqlitePool,
}

impl SqlitePersonRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl PersonRepository for SqlitePersonRepository {
	#[instrument(skip(self), fields(person_id = %id))]
	async fn find_by_id(&self, id: PersonId) -> Result<Option<Person>> {
		let row = sqlx::query_as::<_, PersonRow>("SELECT * FROM persons WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, person), fields(person_id = %person.id))]
	async fn save(&self, person: &Person) -> Result<Person> {
		let mut stored = person.clone();
		stored.updated_at = Utc::now();

		sqlx::query(
			r#"
			INSERT INTO persons (id, username, given_name, family_name, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				username = excluded.username,
				given_name = excluded.given_name,
				family_name = excluded.family_name,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(stored.id.to_string())
		.bind(&stored.username)
		.bind(&stored.given_name)
		.bind(&stored.family_name)
		.bind(stored.created_at.to_rfc3339())
		.bind(stored.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(stored)
	}
}

#[derive(sqlx::FromRow)]
struct EmailAddressRow {
	id: String,
	address: String,
	priority: i64,
	person_id: Option<String>,
	external_id: String,
	ox_account_id: Option<i64>,
	marked_for_removal_at: Option<String>,
	#[allow(dead_code)]
	current_status: Option<String>,
	statuses: String,
	created_at: String,
	updated_at: String,
}

impl TryFrom<EmailAddressRow> for EmailAddress {
	type Error = EmailServerError;

	fn try_from(row: EmailAddressRow) -> Result<Self> {
		let statuses: Vec<StatusEntry> = serde_json::from_str(&row.statuses)?;

		Ok(EmailAddress {
			id: row
				.id
				.parse()
				.map_err(|_| EmailServerError::Internal("Invalid address ID".to_string()))?,
			address: row.address,
			priority: row.priority as u32,
			person_id: row
				.person_id
				.map(|id| {
					id.parse()
						.map_err(|_| EmailServerError::Internal("Invalid person ID".to_string()))
				})
				.transpose()?,
			external_id: row.external_id,
			ox_account_id: row.ox_account_id.map(OxAccountId),
			marked_for_removal_at: row
				.marked_for_removal_at
				.map(|ts| parse_timestamp(&ts))
				.transpose()?,
			statuses,
			created_at: parse_timestamp(&row.created_at)?,
			updated_at: parse_timestamp(&row.updated_at)?,
		})
	}
}

#[derive(sqlx::FromRow)]
struct PersonRow {
	id: String,
	username: Option<String>,
	given_name: String,
	family_name: String,
	created_at: String,
	updated_at: String,
}

impl TryFrom<PersonRow> for Person {
	type Error = EmailServerError;

	fn try_from(row: PersonRow) -> Result<Self> {
		Ok(Person {
			id: row
				.id
				.parse()
				.map_err(|_| EmailServerError::Internal("Invalid person ID".to_string()))?,
			username: row.username,
			given_name: row.given_name,
			family_name: row.family_name,
			created_at: parse_timestamp(&row.created_at)?,
			updated_at: parse_timestamp(&row.updated_at)?,
		})
	}
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|_| EmailServerError::Internal(format!("Invalid timestamp: {value}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pool::init_schema;
	use chrono::Duration;
	use roster_email_core::{EmailAddressStatus, PRIMARY_RANK};
	use sqlx::sqlite::SqlitePoolOptions;

	async fn setup_db() -> SqlitePool {
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.connect("sqlite::memory:")
			.await
			.expect("Failed to create test pool");
		init_schema(&pool).await.unwrap();
		pool
	}

	fn address(
		literal: &str,
		priority: u32,
		person_id: Option<PersonId>,
		status: EmailAddressStatus,
	) -> EmailAddress {
		EmailAddress::new(literal, priority, person_id, "ext-1", status)
	}

	#[tokio::test]
	async fn test_save_and_find_by_address_round_trip() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool);

		let mut addr = address(
			"erika.musterfrau@example.org",
			PRIMARY_RANK,
			Some(PersonId::new()),
			EmailAddressStatus::Active,
		);
		addr.ox_account_id = Some(OxAccountId(1001));
		repo.save(&addr).await.unwrap();

		let found = repo
			.find_by_address("erika.musterfrau@example.org")
			.await
			.unwrap()
			.expect("address should exist");
		assert_eq!(found.id, addr.id);
		assert_eq!(found.ox_account_id, Some(OxAccountId(1001)));
		assert_eq!(found.status(), Some(EmailAddressStatus::Active));
		assert_eq!(found.statuses.len(), 1);
	}

	#[tokio::test]
	async fn test_find_by_address_missing_returns_none() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool);

		let found = repo.find_by_address("nobody@example.org").await.unwrap();
		assert!(found.is_none());
	}

	#[tokio::test]
	async fn test_save_updates_existing_row() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool);

		let mut addr = address(
			"a@example.org",
			PRIMARY_RANK,
			None,
			EmailAddressStatus::Active,
		);
		repo.save(&addr).await.unwrap();

		addr.set_status(EmailAddressStatus::ToBeDeleted);
		repo.save(&addr).await.unwrap();

		let found = repo.find_by_address("a@example.org").await.unwrap().unwrap();
		assert_eq!(found.status(), Some(EmailAddressStatus::ToBeDeleted));
		assert_eq!(found.statuses.len(), 2);
	}

	#[tokio::test]
	async fn test_find_by_person_orders_by_priority() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool);
		let person = PersonId::new();

		for (literal, priority) in [("old@example.org", 2), ("new@example.org", 0), ("alt@example.org", 1)] {
			repo.save(&address(
				literal,
				priority,
				Some(person),
				EmailAddressStatus::Active,
			))
			.await
			.unwrap();
		}

		let found = repo.find_by_person(person).await.unwrap();
		let priorities: Vec<u32> = found.iter().map(|a| a.priority).collect();
		assert_eq!(priorities, vec![0, 1, 2]);
	}

	#[tokio::test]
	async fn test_eligibility_respects_the_removal_mark() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool);
		let now = Utc::now();

		let mut due = address("due@example.org", 1, None, EmailAddressStatus::Disabled);
		due.marked_for_removal_at = Some(now - Duration::days(1));
		repo.save(&due).await.unwrap();

		let mut future = address("future@example.org", 1, None, EmailAddressStatus::Disabled);
		future.marked_for_removal_at = Some(now + Duration::days(1));
		repo.save(&future).await.unwrap();

		let unmarked = address("unmarked@example.org", 1, None, EmailAddressStatus::Active);
		repo.save(&unmarked).await.unwrap();

		let eligible = repo.find_eligible_for_removal(now).await.unwrap();
		let literals: Vec<&str> = eligible.iter().map(|a| a.address.as_str()).collect();
		assert_eq!(literals, vec!["due@example.org"]);
	}

	#[tokio::test]
	async fn test_bulk_delete_only_hits_decommissioned_rows() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool);
		let now = Utc::now();
		let person = PersonId::new();

		let mut primary = address(
			"primary@example.org",
			0,
			Some(person),
			EmailAddressStatus::Active,
		);
		primary.marked_for_removal_at = Some(now - Duration::days(1));
		repo.save(&primary).await.unwrap();

		let mut old_one = address(
			"old1@example.org",
			2,
			Some(person),
			EmailAddressStatus::Disabled,
		);
		old_one.marked_for_removal_at = Some(now - Duration::days(2));
		repo.save(&old_one).await.unwrap();

		let mut old_two = address(
			"old2@example.org",
			3,
			Some(person),
			EmailAddressStatus::Disabled,
		);
		old_two.marked_for_removal_at = Some(now + Duration::days(2));
		repo.save(&old_two).await.unwrap();

		let deleted = repo.delete_decommissioned_eligible(now).await.unwrap();
		assert_eq!(deleted, 1);

		assert!(repo.find_by_address("old1@example.org").await.unwrap().is_none());
		assert!(repo.find_by_address("old2@example.org").await.unwrap().is_some());
		assert!(repo.find_by_address("primary@example.org").await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_distinct_person_ids_for_eligible_rows() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool);
		let now = Utc::now();
		let person = PersonId::new();

		for (literal, priority) in [("p0@example.org", 0), ("p1@example.org", 1)] {
			let mut addr = address(literal, priority, Some(person), EmailAddressStatus::Disabled);
			addr.marked_for_removal_at = Some(now - Duration::hours(1));
			repo.save(&addr).await.unwrap();
		}

		// Decommissioned rows never contribute to the per-person path.
		let mut old = address("p2@example.org", 2, Some(PersonId::new()), EmailAddressStatus::Disabled);
		old.marked_for_removal_at = Some(now - Duration::hours(1));
		repo.save(&old).await.unwrap();

		// Orphaned rows have no person to resolve.
		let mut orphan = address("orphan@example.org", 1, None, EmailAddressStatus::Disabled);
		orphan.marked_for_removal_at = Some(now - Duration::hours(1));
		repo.save(&orphan).await.unwrap();

		let ids = repo.find_person_ids_eligible(now).await.unwrap();
		assert_eq!(ids, vec![person]);
	}

	#[tokio::test]
	async fn test_due_for_deletion_by_status_and_staleness() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool.clone());
		let now = Utc::now();

		let pending = address(
			"pending@example.org",
			0,
			None,
			EmailAddressStatus::ToBeDeleted,
		);
		repo.save(&pending).await.unwrap();

		let fresh = address("fresh@example.org", 0, None, EmailAddressStatus::Active);
		repo.save(&fresh).await.unwrap();

		let stale = address("stale@example.org", 0, None, EmailAddressStatus::Active);
		repo.save(&stale).await.unwrap();
		sqlx::query("UPDATE email_addresses SET updated_at = ? WHERE address = ?")
			.bind((now - Duration::days(90)).to_rfc3339())
			.bind("stale@example.org")
			.execute(&pool)
			.await
			.unwrap();

		let due = repo
			.find_due_for_deletion(now - Duration::days(30), 10)
			.await
			.unwrap();
		let mut literals: Vec<&str> = due.iter().map(|a| a.address.as_str()).collect();
		literals.sort_unstable();
		assert_eq!(literals, vec!["pending@example.org", "stale@example.org"]);
	}

	#[tokio::test]
	async fn test_due_for_deletion_honors_the_limit() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool);

		for i in 0..5 {
			repo.save(&address(
				&format!("due{i}@example.org"),
				0,
				None,
				EmailAddressStatus::ToBeDeleted,
			))
			.await
			.unwrap();
		}

		let due = repo
			.find_due_for_deletion(Utc::now() - Duration::days(30), 3)
			.await
			.unwrap();
		assert_eq!(due.len(), 3);
	}

	#[tokio::test]
	async fn test_delete_removes_the_row() {
		let pool = setup_db().await;
		let repo = SqliteEmailAddressRepository::new(pool);

		let addr = address("gone@example.org", 0, None, EmailAddressStatus::Deleted);
		repo.save(&addr).await.unwrap();
		repo.delete(&addr).await.unwrap();

		assert!(repo.find_by_address("gone@example.org").await.unwrap().is_none());

		// Deleting again is a no-op.
		repo.delete(&addr).await.unwrap();
	}

	#[tokio::test]
	async fn test_person_save_and_find_round_trip() {
		let pool = setup_db().await;
		let repo = SqlitePersonRepository::new(pool);

		let mut person = Person::new("Erika", "Musterfrau");
		person.username = Some("emusterfrau".to_string());
		repo.save(&person).await.unwrap();

		let found = repo.find_by_id(person.id).await.unwrap().expect("person should exist");
		assert_eq!(found.username.as_deref(), Some("emusterfrau"));
		assert_eq!(found.given_name, "Erika");

		assert!(repo.find_by_id(PersonId::new()).await.unwrap().is_none());
	}
}
