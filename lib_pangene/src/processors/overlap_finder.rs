use crate::error::Result;
use crate::job::{run_blocks_jobs, BlocksJobs, Context, Options, Processor};
use crate::model::{Block, BlockId, BlockSet, VectorFc};

/// Finds blocks of the `bank` block set overlapping any block of the
/// `pattern` block set; overlapping blocks are copied into `hits`.
pub struct OverlapFinder {
    options: Options,
    index: VectorFc,
    hits: Vec<BlockId>,
}

impl Default for OverlapFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlapFinder {
    pub fn new() -> Self {
        Self {
            options: Options::new(),
            index: VectorFc::new(),
            hits: Vec::new(),
        }
    }
}

impl BlocksJobs for OverlapFinder {
    type ThreadData = Vec<BlockId>;

    fn before_thread(&self, _worker: usize, _seed: u64) -> Self::ThreadData {
        Vec::new()
    }

    fn process_block(
        &self,
        block_set: &BlockSet,
        id: BlockId,
        data: &mut Self::ThreadData,
    ) -> Result<()> {
        if self.index.block_has_overlap(block_set.block(id)) {
            data.push(id);
        }
        Ok(())
    }

    fn after_thread(&mut self, data: Self::ThreadData) -> Result<()> {
        self.hits.extend(data);
        Ok(())
    }
}

impl Processor for OverlapFinder {
    fn name(&self) -> &str {
        "OverlapFinder"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn declared_block_sets(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("bank", "Where to find overlapping blocks"),
            ("pattern", "Overlaps are looked for with these blocks"),
            ("hits", "Overlapping blocks from bank are copied here"),
        ]
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        self.index.clear();
        self.hits.clear();
        let pattern = context
            .block_set("pattern")
            .ok_or_else(|| crate::Error::MissingCollaborator("pattern".to_string()))?;
        self.index.add_bs(pattern);
        self.index.prepare();
        let mut bank = context.take_block_set("bank").unwrap_or_default();
        let workers = context.workers;
        let seed = context.seed;
        let outcome = run_blocks_jobs(self, &mut bank, workers, seed);
        let mut found: Vec<Block> = Vec::new();
        for &id in &self.hits {
            found.push(bank.block(id).clone());
        }
        context.set_block_set("bank", bank);
        let hits = context.block_set_mut("hits");
        // Deterministic insertion order regardless of worker count.
        found.sort_by_key(|block| block.name().to_string());
        for block in found {
            hits.insert(block);
        }
        self.index.clear();
        self.hits.clear();
        outcome
    }
}
