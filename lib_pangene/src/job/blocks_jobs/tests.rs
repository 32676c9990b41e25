use std::sync::Arc;

use crate::error::{Error, Result};
use crate::job::{run_blocks_jobs, BlocksJobs};
use crate::model::{Block, BlockId, BlockSet, Fragment, Ori, Sequence, SequenceKind};

fn fixture(blocks: usize) -> BlockSet {
    let sequence = Arc::new(Sequence::from_letters(
        SequenceKind::AsIs,
        "s",
        &vec![b'A'; 10 * blocks],
    ));
    let mut block_set = BlockSet::new();
    block_set.add_sequence(sequence.clone());
    for index in 0..blocks {
        let mut block = Block::with_name(format!("b{index}"));
        block.insert(Fragment::new(
            sequence.clone(),
            10 * index,
            10 * index + index % 7,
            Ori::Forward,
        ));
        block_set.insert(block);
    }
    block_set
}

// Sums fragment lengths per thread, merges in worker order.
struct LengthSum {
    merged: Vec<Vec<usize>>,
    total: usize,
    finished: bool,
}

impl BlocksJobs for LengthSum {
    type ThreadData = Vec<usize>;

    fn before_thread(&self, _worker: usize, _seed: u64) -> Self::ThreadData {
        Vec::new()
    }

    fn process_block(
        &self,
        block_set: &BlockSet,
        id: BlockId,
        data: &mut Self::ThreadData,
    ) -> Result<()> {
        data.push(block_set.block(id).fragment(0).length());
        Ok(())
    }

    fn after_thread(&mut self, data: Self::ThreadData) -> Result<()> {
        self.total += data.iter().sum::<usize>();
        self.merged.push(data);
        Ok(())
    }

    fn finish_work(&mut self, _block_set: &mut BlockSet) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[test]
fn results_are_identical_for_any_worker_count() {
    let mut totals = Vec::new();
    for workers in [1, 2, 5] {
        let mut block_set = fixture(50);
        let mut jobs = LengthSum {
            merged: Vec::new(),
            total: 0,
            finished: false,
        };
        run_blocks_jobs(&mut jobs, &mut block_set, workers, 7).unwrap();
        assert!(jobs.finished);
        assert_eq!(jobs.merged.len(), workers);
        totals.push(jobs.total);
    }
    assert!(totals.windows(2).all(|pair| pair[0] == pair[1]));
}

struct FailOn {
    block_name: String,
    finished: bool,
    processed: usize,
}

impl BlocksJobs for FailOn {
    type ThreadData = usize;

    fn before_thread(&self, _worker: usize, _seed: u64) -> Self::ThreadData {
        0
    }

    fn process_block(
        &self,
        block_set: &BlockSet,
        id: BlockId,
        data: &mut Self::ThreadData,
    ) -> Result<()> {
        if block_set.block(id).name() == self.block_name {
            return Err(Error::malformed("block", self.block_name.clone()));
        }
        *data += 1;
        Ok(())
    }

    fn after_thread(&mut self, data: Self::ThreadData) -> Result<()> {
        self.processed += data;
        Ok(())
    }

    fn finish_work(&mut self, _block_set: &mut BlockSet) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[test]
fn a_failing_task_cancels_but_finish_work_still_runs() {
    for workers in [1, 4] {
        let mut block_set = fixture(100);
        let mut jobs = FailOn {
            block_name: "b42".to_string(),
            finished: false,
            processed: 0,
        };
        let outcome = run_blocks_jobs(&mut jobs, &mut block_set, workers, 0);
        assert!(matches!(outcome, Err(Error::MalformedInput { .. })));
        assert!(jobs.finished);
        assert!(jobs.processed < 100);
    }
}

// Records the dispatch order to check the pre-sort contract.
struct OrderProbe {
    order: Vec<String>,
}

impl BlocksJobs for OrderProbe {
    type ThreadData = Vec<String>;

    fn sorted(&self) -> bool {
        true
    }

    fn before_thread(&self, _worker: usize, _seed: u64) -> Self::ThreadData {
        Vec::new()
    }

    fn process_block(
        &self,
        block_set: &BlockSet,
        id: BlockId,
        data: &mut Self::ThreadData,
    ) -> Result<()> {
        data.push(block_set.block(id).name().to_string());
        Ok(())
    }

    fn after_thread(&mut self, data: Self::ThreadData) -> Result<()> {
        self.order.extend(data);
        Ok(())
    }
}

#[test]
fn sorted_jobs_follow_the_pre_sort_even_with_many_workers() {
    let mut block_set = fixture(10);
    let mut jobs = OrderProbe { order: Vec::new() };
    run_blocks_jobs(&mut jobs, &mut block_set, 8, 0).unwrap();
    // Equal sizes, so the default pre-sort falls back to names.
    let mut expected: Vec<String> = (0..10).map(|i| format!("b{i}")).collect();
    expected.sort();
    assert_eq!(jobs.order, expected);
}
