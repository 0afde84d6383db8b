//! Bounded fan-out of repository updates.
//!
//! Tasks are queued on a fixed-size rayon pool, so at most `limit` updates
//! run at once and the rest wait for a free worker. Outcomes are appended to
//! one shared collection in the order they finish, and the batch only
//! returns once every task has reported.

use crate::config::Config;
use crate::git::Vcs;
use crate::repo::{self, RepositoryOutcome, RepositoryTask, UpdateCallbacks, UpdateOptions};
use anyhow::Context;
use rayon::ThreadPoolBuilder;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Outcomes of a finished batch, split by success flag.
///
/// Order within each list is completion order, which varies between runs.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<RepositoryOutcome>,
    pub failed: Vec<RepositoryOutcome>,
}

impl BatchReport {
    fn partition(outcomes: Vec<RepositoryOutcome>) -> Self {
        let (succeeded, failed) = outcomes.into_iter().partition(|o| o.is_success());
        Self { succeeded, failed }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs `worker` once per task with at most `limit` running concurrently.
///
/// A `limit` of zero is treated as one. A panicking worker is recorded as a
/// failed outcome for its task; it never costs the batch an outcome.
pub fn run_batch<W, C>(
    tasks: &[RepositoryTask],
    limit: usize,
    callbacks: &C,
    worker: W,
) -> anyhow::Result<BatchReport>
where
    W: Fn(&RepositoryTask) -> RepositoryOutcome + Sync,
    C: UpdateCallbacks + ?Sized,
{
    let limit = limit.max(1);
    let pool = ThreadPoolBuilder::new()
        .num_threads(limit)
        .thread_name(|i| format!("pullio-worker-{i}"))
        .build()
        .context("Failed to build worker pool")?;

    info!(tasks = tasks.len(), workers = limit, "starting batch");

    let collected = Mutex::new(Vec::with_capacity(tasks.len()));
    pool.scope(|scope| {
        for task in tasks {
            let collected = &collected;
            let worker = &worker;
            scope.spawn(move |_| {
                callbacks.on_update_start(task);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| worker(task)))
                    .unwrap_or_else(|payload| {
                        RepositoryOutcome::failure(
                            task.path(),
                            "",
                            format!("Worker panicked: {}", panic_message(payload.as_ref())),
                        )
                    });
                callbacks.on_complete(&outcome);
                collected
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(outcome);
            });
        }
    });

    let outcomes = collected
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    debug!(outcomes = outcomes.len(), "batch drained");

    Ok(BatchReport::partition(outcomes))
}

/// Updates every task with the real update sequence and the run's settings.
pub fn update_repositories<V, C>(
    vcs: &V,
    tasks: &[RepositoryTask],
    config: &Config,
    callbacks: &C,
) -> anyhow::Result<BatchReport>
where
    V: Vcs + ?Sized,
    C: UpdateCallbacks + ?Sized,
{
    let options = UpdateOptions {
        fallback_branches: &config.fallback_branches,
        sync_policy: config.sync_policy,
    };
    run_batch(tasks, config.concurrency, callbacks, |task| {
        repo::process_repository(vcs, task, &options, callbacks)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
