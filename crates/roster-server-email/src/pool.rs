// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database pool construction and schema for the email lifecycle tables.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::{EmailServerError, Result};

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Errors
/// Returns `EmailServerError::Internal` if the URL is invalid, or the
/// underlying connection error.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| EmailServerError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

/// Create the email lifecycle tables when they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS persons (
			id TEXT PRIMARY KEY,
			username TEXT UNIQUE,
			given_name TEXT NOT NULL,
			family_name TEXT NOT NULL,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS email_addresses (
			id TEXT PRIMARY KEY,
			address TEXT UNIQUE NOT NULL,
			priority INTEGER NOT NULL,
			person_id TEXT REFERENCES persons(id),
			external_id TEXT NOT NULL,
			ox_account_id INTEGER,
			marked_for_removal_at TEXT,
			current_status TEXT,
			statuses TEXT NOT NULL,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE INDEX IF NOT EXISTS idx_email_addresses_person
		ON email_addresses(person_id, priority)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE INDEX IF NOT EXISTS idx_email_addresses_removal
		ON email_addresses(marked_for_removal_at)
		"#,
	)
	.execute(pool)
	.await?;

	Ok(())
}
