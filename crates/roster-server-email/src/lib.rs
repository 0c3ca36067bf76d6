// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Email identity lifecycle engine for the Roster server.
//!
//! Provisions and retires email addresses for directory-managed persons,
//! keeping the local store, the mail platform and the directory consistent.
//! Address generation probes the store for collisions, the periodic sweep
//! removes overdue addresses, and the event handlers advance each address
//! through its deletion state machine as the external systems confirm.

pub mod bus;
pub mod clients;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod generator;
pub mod handler;
pub mod job;
pub mod pool;
pub mod repository;
pub mod sweeper;

pub use bus::{EventPublisher, EventTransport};
pub use clients::{DirectoryClient, MailPlatformClient};
pub use config::EmailLifecycleConfig;
pub use coordinator::{DeletionBatchOutcome, DeletionCoordinator};
pub use error::{EmailServerError, Result};
pub use generator::AddressCandidateGenerator;
pub use handler::DeletionEventHandler;
pub use job::DeletionSweepJob;
pub use pool::{create_pool, init_schema};
pub use repository::{
	EmailAddressRepository, PersonRepository, SqliteEmailAddressRepository, SqlitePersonRepository,
};
pub use sweeper::{DeletionSweeper, SweepOutcome};
