//! A deterministic shared-queue worker pool.
//!
//! Tasks are handed out one at a time from a single cursor behind a mutex,
//! in slice order. The calling thread participates as worker 0; workers
//! `1..n` run on scoped threads. Every worker owns a scratch value created
//! by [`Job::before_thread`]; after all workers have joined, the scratch
//! values are returned in worker-index order, so merging them yields the
//! same result for every worker count.
//!
//! An error returned by [`Job::process`] raises a cancellation flag. Workers
//! check the flag before pulling the next task, so remaining tasks are
//! drained without executing. Because tasks are pulled in slice order, the
//! error with the lowest task index is the one reported, which keeps the
//! error path deterministic as well. Panics are not caught; a panicking
//! worker aborts the whole group.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use log::trace;

#[cfg(test)]
mod tests;

/// Work description for [`perform`].
pub trait Job: Sync {
    /// One unit of work. Units are processed in parallel and must not
    /// require mutable access to shared state.
    type Task: Sync;

    /// Per-worker scratch data. All mutation during processing goes here.
    type WorkerData: Send;

    /// Error type of a failed task.
    type Error: Send;

    /// Creates the scratch data of one worker. Called on the worker's own
    /// thread, before its first task.
    fn before_thread(&self, worker: usize) -> Self::WorkerData;

    /// Processes one task using the worker's scratch data.
    fn process(
        &self,
        task: &Self::Task,
        data: &mut Self::WorkerData,
    ) -> Result<(), Self::Error>;
}

/// What [`perform`] produced: one scratch value per worker, in worker-index
/// order, and the first (lowest task index) error, if any task failed.
pub struct Outcome<W, E> {
    pub worker_data: Vec<W>,
    pub error: Option<E>,
}

struct Shared<E> {
    cursor: AtomicUsize,
    cancelled: AtomicBool,
    // Error of the failed task with the lowest index.
    error: Mutex<Option<(usize, E)>>,
}

impl<E> Shared<E> {
    fn record_error(&self, task_index: usize, error: E) {
        self.cancelled.store(true, Ordering::SeqCst);
        let mut slot = self.error.lock().unwrap();
        match &*slot {
            Some((recorded, _)) if *recorded <= task_index => {}
            _ => *slot = Some((task_index, error)),
        }
    }
}

fn work<J: Job>(job: &J, tasks: &[J::Task], shared: &Shared<J::Error>, worker: usize) -> J::WorkerData {
    let mut data = job.before_thread(worker);
    loop {
        if shared.cancelled.load(Ordering::SeqCst) {
            break;
        }
        let task_index = shared.cursor.fetch_add(1, Ordering::SeqCst);
        if task_index >= tasks.len() {
            break;
        }
        if let Err(error) = job.process(&tasks[task_index], &mut data) {
            shared.record_error(task_index, error);
            break;
        }
    }
    data
}

/// Number of workers matching the machine, used when the caller does not
/// request a specific count.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs every task of `tasks` on `workers` workers and returns the
/// per-worker scratch data in worker-index order.
pub fn perform<J: Job>(
    job: &J,
    tasks: &[J::Task],
    workers: usize,
) -> Outcome<J::WorkerData, J::Error> {
    let workers = workers.max(1);
    trace!("performing {} tasks on {} workers", tasks.len(), workers);
    let shared = Shared {
        cursor: AtomicUsize::new(0),
        cancelled: AtomicBool::new(false),
        error: Mutex::new(None),
    };
    let mut worker_data = Vec::with_capacity(workers);
    if workers == 1 {
        worker_data.push(work(job, tasks, &shared, 0));
    } else {
        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers - 1);
            for worker in 1..workers {
                let shared = &shared;
                handles.push(scope.spawn(move || work(job, tasks, shared, worker)));
            }
            worker_data.push(work(job, tasks, &shared, 0));
            for handle in handles {
                worker_data.push(handle.join().expect("worker thread panicked"));
            }
        });
    }
    let error = shared
        .error
        .into_inner()
        .unwrap()
        .map(|(_, error)| error);
    Outcome { worker_data, error }
}
