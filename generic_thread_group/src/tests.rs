use crate::{perform, Job};

struct Summing;

impl Job for Summing {
    type Task = u64;
    type WorkerData = (u64, Vec<u64>);
    type Error = String;

    fn before_thread(&self, _worker: usize) -> Self::WorkerData {
        (0, Vec::new())
    }

    fn process(&self, task: &u64, data: &mut Self::WorkerData) -> Result<(), String> {
        data.0 += *task;
        data.1.push(*task);
        Ok(())
    }
}

#[test]
fn merged_result_is_independent_of_worker_count() {
    let tasks: Vec<u64> = (1..=100).collect();
    let mut merged_sums = Vec::new();
    for workers in [1, 2, 3, 8] {
        let outcome = perform(&Summing, &tasks, workers);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.worker_data.len(), workers);
        let sum: u64 = outcome.worker_data.iter().map(|(sum, _)| sum).sum();
        let mut seen: Vec<u64> = outcome
            .worker_data
            .iter()
            .flat_map(|(_, seen)| seen.iter().copied())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, tasks);
        merged_sums.push(sum);
    }
    assert!(merged_sums.iter().all(|&sum| sum == 5050));
}

struct FailingAt(Vec<u64>);

impl Job for FailingAt {
    type Task = u64;
    type WorkerData = Vec<u64>;
    type Error = String;

    fn before_thread(&self, _worker: usize) -> Self::WorkerData {
        Vec::new()
    }

    fn process(&self, task: &u64, data: &mut Self::WorkerData) -> Result<(), String> {
        if self.0.contains(task) {
            Err(format!("task {task} failed"))
        } else {
            data.push(*task);
            Ok(())
        }
    }
}

#[test]
fn first_error_wins_and_cancels_the_rest() {
    let tasks: Vec<u64> = (0..1000).collect();
    for workers in [1, 2, 4] {
        let outcome = perform(&FailingAt(vec![3, 700]), &tasks, workers);
        assert_eq!(outcome.error.as_deref(), Some("task 3 failed"));
        let executed: usize = outcome.worker_data.iter().map(Vec::len).sum();
        // Everything after the cancellation is drained without executing.
        assert!(executed < tasks.len());
    }
}

#[test]
fn single_worker_runs_in_submission_order() {
    let tasks: Vec<u64> = (0..10).collect();
    let outcome = perform(&Summing, &tasks, 1);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.worker_data[0].1, tasks);
}
