// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background job scheduler for the Roster server.
//!
//! Runs registered jobs on a fixed interval and records every run in SQLite.
//! There is no in-process retry: a failed run is simply attempted again on
//! the next tick, so jobs must be idempotent.

pub mod context;
pub mod error;
pub mod job;
pub mod scheduler;
pub mod store;

pub use context::JobContext;
pub use error::{JobError, Result};
pub use job::{Job, JobOutcome};
pub use scheduler::JobScheduler;
pub use store::{init_schema, JobRun, JobRunStore, JobStatus, TriggerSource};
pub use tokio_util::sync::CancellationToken;
