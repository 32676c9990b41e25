use std::cmp::Reverse;

use log::debug;

use generic_thread_group::{perform, Job};

use crate::error::{Error, Result};
use crate::model::{BlockId, BlockSet};

#[cfg(test)]
mod tests;

/// Per-block parallel work with per-thread scratch and a deterministic
/// merge.
///
/// Lifecycle of [`run_blocks_jobs`]:
///
/// 1. [`change_blocks`] pre-sorts the target blocks; the resulting order is
///    the task dispatch order and the merge order.
/// 2. [`initialize_work`] runs once on the owning thread.
/// 3. Every worker gets a [`ThreadData`] from [`before_thread`] and pulls
///    block tasks from the shared queue into [`process_block`]. All
///    mutation goes into the scratch; the block set is shared read-only.
/// 4. [`after_thread`] merges every scratch back, serialised in
///    worker-index order.
/// 5. [`finish_work`] runs once, whether or not a task failed; a recorded
///    error then surfaces to the caller of [`run_blocks_jobs`].
///
/// [`change_blocks`]: BlocksJobs::change_blocks
/// [`initialize_work`]: BlocksJobs::initialize_work
/// [`ThreadData`]: BlocksJobs::ThreadData
/// [`before_thread`]: BlocksJobs::before_thread
/// [`process_block`]: BlocksJobs::process_block
/// [`after_thread`]: BlocksJobs::after_thread
/// [`finish_work`]: BlocksJobs::finish_work
pub trait BlocksJobs: Sync {
    type ThreadData: Send;

    /// Forces sequential execution when the work is order-sensitive.
    fn sorted(&self) -> bool {
        false
    }

    /// Pre-pass over the target blocks; the default sorts by descending
    /// size, then name.
    fn change_blocks(&self, block_set: &BlockSet, blocks: &mut Vec<BlockId>) -> Result<()> {
        blocks.sort_by_key(|&id| {
            let block = block_set.block(id);
            (Reverse(block.size()), block.name().to_string(), id)
        });
        Ok(())
    }

    fn initialize_work(&mut self, _block_set: &BlockSet) -> Result<()> {
        Ok(())
    }

    /// Creates the scratch data of one worker. `seed` derives from the
    /// processor seed; randomness used inside [`BlocksJobs::process_block`]
    /// should be reseeded per block to stay independent of the worker
    /// count.
    fn before_thread(&self, worker: usize, seed: u64) -> Self::ThreadData;

    fn process_block(
        &self,
        block_set: &BlockSet,
        id: BlockId,
        data: &mut Self::ThreadData,
    ) -> Result<()>;

    /// Merges one worker's scratch; called serially, in worker order.
    fn after_thread(&mut self, _data: Self::ThreadData) -> Result<()> {
        Ok(())
    }

    fn finish_work(&mut self, _block_set: &mut BlockSet) -> Result<()> {
        Ok(())
    }
}

struct Adapter<'a, J: BlocksJobs> {
    jobs: &'a J,
    block_set: &'a BlockSet,
    seed: u64,
}

impl<J: BlocksJobs> Job for Adapter<'_, J> {
    type Task = BlockId;
    type WorkerData = J::ThreadData;
    type Error = Error;

    fn before_thread(&self, worker: usize) -> Self::WorkerData {
        self.jobs.before_thread(worker, self.seed)
    }

    fn process(&self, task: &BlockId, data: &mut Self::WorkerData) -> Result<()> {
        self.jobs.process_block(self.block_set, *task, data)
    }
}

/// Runs the full [`BlocksJobs`] lifecycle over the blocks of `block_set`.
///
/// For a fixed input, seed and worker count the outcome is reproducible;
/// and because the merge is ordered, it does not depend on the worker
/// count either.
pub fn run_blocks_jobs<J: BlocksJobs>(
    jobs: &mut J,
    block_set: &mut BlockSet,
    workers: usize,
    seed: u64,
) -> Result<()> {
    let mut blocks = block_set.block_ids();
    jobs.change_blocks(block_set, &mut blocks)?;
    jobs.initialize_work(block_set)?;
    let workers = if jobs.sorted() { 1 } else { workers.max(1) };
    debug!("processing {} blocks on {} workers", blocks.len(), workers);
    let outcome = {
        let adapter = Adapter {
            jobs: &*jobs,
            block_set,
            seed,
        };
        perform(&adapter, &blocks, workers)
    };
    for data in outcome.worker_data {
        jobs.after_thread(data)?;
    }
    jobs.finish_work(block_set)?;
    match outcome.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
