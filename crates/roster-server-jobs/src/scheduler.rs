// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interval-driven job execution.
//!
//! Each registered job gets one spawned loop that races its interval tick
//! against the shutdown broadcast. A failed run is recorded and left alone;
//! the next tick attempts the work again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::context::JobContext;
use crate::error::{JobError, Result};
use crate::job::Job;
use crate::store::{JobRun, JobRunStore, JobStatus, TriggerSource};

struct RegisteredJob {
	job: Arc<dyn Job>,
	interval: Duration,
	cancellation: CancellationToken,
}

pub struct JobScheduler {
	jobs: HashMap<String, RegisteredJob>,
	store: Arc<JobRunStore>,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl JobScheduler {
	pub fn new(store: Arc<JobRunStore>) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: HashMap::new(),
			store,
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	pub fn register(&mut self, job: Arc<dyn Job>, interval: Duration) {
		let id = job.id().to_string();
		self.jobs.insert(
			id,
			RegisteredJob {
				job,
				interval,
				cancellation: CancellationToken::new(),
			},
		);
	}

	#[instrument(skip(self))]
	pub async fn start(&self) {
		let mut handles = self.handles.lock().await;

		for (job_id, registered) in &self.jobs {
			let job = Arc::clone(&registered.job);
			let store = Arc::clone(&self.store);
			let interval = registered.interval;
			let cancellation = registered.cancellation.clone();
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let job_id = job_id.clone();

			let handle = tokio::spawn(async move {
				loop {
					tokio::select! {
						_ = tokio::time::sleep(interval) => {
							if cancellation.is_cancelled() {
								continue;
							}
							let _ = run_job(&job, &store, TriggerSource::Schedule, &cancellation).await;
						}
						_ = shutdown_rx.recv() => {
							info!(job_id = %job_id, "shutting down periodic job");
							break;
						}
					}
				}
			});

			handles.push(handle);
		}

		info!(job_count = handles.len(), "job scheduler started");
	}

	/// Run a registered job once, outside its schedule.
	#[instrument(skip(self))]
	pub async fn trigger(&self, job_id: &str) -> Result<String> {
		let registered = self
			.jobs
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		run_job(
			&registered.job,
			&self.store,
			TriggerSource::Manual,
			&registered.cancellation,
		)
		.await
	}

	#[instrument(skip(self))]
	pub async fn cancel(&self, job_id: &str) -> Result<()> {
		let registered = self
			.jobs
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		registered.cancellation.cancel();
		Ok(())
	}

	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("job scheduler shut down");
	}

	pub fn job_ids(&self) -> Vec<String> {
		self.jobs.keys().cloned().collect()
	}
}

async fn run_job(
	job: &Arc<dyn Job>,
	store: &Arc<JobRunStore>,
	triggered_by: TriggerSource,
	cancellation: &CancellationToken,
) -> Result<String> {
	let run_id = uuid::Uuid::new_v4().to_string();

	let run = JobRun {
		id: run_id.clone(),
		job_id: job.id().to_string(),
		status: JobStatus::Running,
		started_at: Utc::now(),
		completed_at: None,
		duration_ms: None,
		error_message: None,
		triggered_by,
		metadata: None,
	};
	store.record_start(&run).await?;

	let ctx = JobContext {
		run_id: run_id.clone(),
		triggered_by,
		cancellation: cancellation.clone(),
	};

	match job.run(&ctx).await {
		Ok(outcome) => {
			store
				.record_finish(&run_id, JobStatus::Succeeded, None, outcome.metadata)
				.await?;
			info!(job_id = %job.id(), run_id = %run_id, message = %outcome.message, "job completed");
			Ok(run_id)
		}
		Err(JobError::Cancelled) => {
			store
				.record_finish(&run_id, JobStatus::Cancelled, None, None)
				.await?;
			info!(job_id = %job.id(), run_id = %run_id, "job cancelled");
			Err(JobError::Cancelled)
		}
		Err(e) => {
			let message = e.to_string();
			store
				.record_finish(&run_id, JobStatus::Failed, Some(message.clone()), None)
				.await?;
			warn!(job_id = %job.id(), run_id = %run_id, error = %message, "job failed, next tick will attempt it again");
			Err(e)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::job::JobOutcome;
	use crate::store::init_schema;
	use async_trait::async_trait;
	use sqlx::SqlitePool;
	use std::sync::atomic::{AtomicU32, Ordering};

	async fn setup_store() -> Arc<JobRunStore> {
		let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
		init_schema(&pool).await.unwrap();
		Arc::new(JobRunStore::new(pool))
	}

	struct CountingJob {
		id: String,
		runs: AtomicU32,
		fail: bool,
	}

	impl CountingJob {
		fn new(id: &str, fail: bool) -> Self {
			Self {
				id: id.to_string(),
				runs: AtomicU32::new(0),
				fail,
			}
		}
	}

	#[async_trait]
	impl Job for CountingJob {
		fn id(&self) -> &str {
			&self.id
		}

		fn name(&self) -> &str {
			"Counting job"
		}

		fn description(&self) -> &str {
			"Counts its runs"
		}

		async fn run(&self, _ctx: &JobContext) -> Result<JobOutcome> {
			let count = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
			if self.fail {
				return Err(JobError::Failed("boom".to_string()));
			}
			Ok(JobOutcome {
				message: format!("run {count}"),
				metadata: Some(serde_json::json!({"count": count})),
			})
		}
	}

	#[tokio::test]
	async fn test_register_and_list_jobs() {
		let store = setup_store().await;
		let mut scheduler = JobScheduler::new(store);

		scheduler.register(
			Arc::new(CountingJob::new("job-1", false)),
			Duration::from_secs(60),
		);

		assert!(scheduler.job_ids().contains(&"job-1".to_string()));
	}

	#[tokio::test]
	async fn test_trigger_records_a_successful_run() {
		let store = setup_store().await;
		let mut scheduler = JobScheduler::new(store.clone());
		let job = Arc::new(CountingJob::new("job-1", false));
		scheduler.register(job.clone(), Duration::from_secs(3600));

		let run_id = scheduler.trigger("job-1").await.unwrap();

		let last = store.last_run("job-1").await.unwrap().unwrap();
		assert_eq!(last.id, run_id);
		assert_eq!(last.status, JobStatus::Succeeded);
		assert_eq!(last.triggered_by, TriggerSource::Manual);
		assert_eq!(job.runs.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_trigger_records_a_failed_run() {
		let store = setup_store().await;
		let mut scheduler = JobScheduler::new(store.clone());
		scheduler.register(
			Arc::new(CountingJob::new("job-1", true)),
			Duration::from_secs(3600),
		);

		let result = scheduler.trigger("job-1").await;
		assert!(matches!(result, Err(JobError::Failed(_))));

		let last = store.last_run("job-1").await.unwrap().unwrap();
		assert_eq!(last.status, JobStatus::Failed);
		assert_eq!(last.error_message.as_deref(), Some("job failed: boom"));
	}

	#[tokio::test]
	async fn test_trigger_unknown_job_is_not_found() {
		let store = setup_store().await;
		let scheduler = JobScheduler::new(store);

		let result = scheduler.trigger("nope").await;
		assert!(matches!(result, Err(JobError::NotFound(id)) if id == "nope"));
	}

	#[tokio::test]
	async fn test_shutdown_stops_the_loops() {
		let store = setup_store().await;
		let mut scheduler = JobScheduler::new(store);
		scheduler.register(
			Arc::new(CountingJob::new("job-1", false)),
			Duration::from_millis(10),
		);

		scheduler.start().await;
		scheduler.shutdown().await;

		assert!(scheduler.handles.lock().await.is_empty());
	}
}
