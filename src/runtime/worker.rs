//! Background fetch thread.
//!
//! The UI thread owns the state and never blocks on the network: it submits
//! [`Job`]s and drains the resulting [`CatalogAction`]s once per tick.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use crate::catalog::{CatalogAction, FetchExecutor, FetchPlan};
use crate::transport::CatalogRequest;

#[derive(Debug, Clone)]
pub enum Job {
    Categories(CatalogRequest),
    Listing(FetchPlan),
}

/// Turns a job into the action that completes it.
pub fn run_job(executor: &FetchExecutor, job: Job) -> CatalogAction {
    match job {
        Job::Categories(request) => match executor.fetch_categories(&request) {
            Ok(categories) => CatalogAction::CategoriesLoaded(categories),
            Err(err) => CatalogAction::CategoriesFailed(err.user_message()),
        },
        Job::Listing(plan) => match executor.execute(&plan) {
            Ok(outcome) => CatalogAction::FetchSucceeded(outcome),
            Err(err) => CatalogAction::FetchFailed {
                query: plan.query,
                message: err.user_message(),
            },
        },
    }
}

/// Keeps only the newest listing of a batch; category jobs all survive.
/// Older listings would be fenced out by the store anyway.
fn coalesce(jobs: Vec<Job>) -> Vec<Job> {
    let newest_listing = jobs.iter().rposition(|job| matches!(job, Job::Listing(_)));
    let queued = jobs.len();
    let kept: Vec<Job> = jobs
        .into_iter()
        .enumerate()
        .filter(|(idx, job)| !matches!(job, Job::Listing(_)) || Some(*idx) == newest_listing)
        .map(|(_, job)| job)
        .collect();
    if kept.len() < queued {
        debug!(dropped = queued - kept.len(), "skipping superseded listings");
    }
    kept
}

pub struct FetchWorker {
    jobs: Option<Sender<Job>>,
    results: Receiver<CatalogAction>,
    handle: Option<JoinHandle<()>>,
}

impl FetchWorker {
    pub fn spawn(executor: FetchExecutor) -> io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("fetch-worker".to_string())
            .spawn(move || {
                'jobs: while let Ok(first) = job_rx.recv() {
                    let mut batch = vec![first];
                    batch.extend(job_rx.try_iter());
                    for job in coalesce(batch) {
                        if result_tx.send(run_job(&executor, job)).is_err() {
                            break 'jobs;
                        }
                    }
                }
                debug!("fetch worker stopped");
            })?;

        info!("fetch worker started");
        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }

    /// Queues a job. Returns `false` if the worker thread is gone.
    pub fn submit(&self, job: Job) -> bool {
        self.jobs
            .as_ref()
            .is_some_and(|jobs| jobs.send(job).is_ok())
    }

    /// Completed actions, without blocking.
    pub fn drain(&self) -> Vec<CatalogAction> {
        self.results.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<CatalogAction> {
        self.results.recv_timeout(timeout).ok()
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
