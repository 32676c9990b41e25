use log::debug;

use crate::error::Result;
use crate::job::{run_blocks_jobs, BlocksJobs, Context, Options, Processor};
use crate::model::{block_hash, hash_to_name, test_column, Block, BlockId, BlockSet};

// A run of equally-good columns. Good regions weigh their length; bad
// regions weigh length times the factor derived from min-identity, so
// short interruptions dissolve into their surroundings.
#[derive(Debug, Clone, Copy)]
struct Region {
    start: usize,
    stop: usize,
    good: bool,
    weight: usize,
}

impl Region {
    fn length(&self) -> usize {
        self.stop - self.start + 1
    }

    fn set_weight(&mut self, weight_factor: usize) {
        self.weight = if self.good {
            self.length()
        } else {
            self.length() * weight_factor
        };
    }
}

fn make_regions(good_col: &[bool], weight_factor: usize) -> Vec<Region> {
    let mut result: Vec<Region> = Vec::new();
    for (col, &good) in good_col.iter().enumerate() {
        match result.last_mut() {
            Some(last) if last.good == good => {
                last.stop = col;
                last.set_weight(weight_factor);
            }
            _ => {
                let mut region = Region {
                    start: col,
                    stop: col,
                    good,
                    weight: 0,
                };
                region.set_weight(weight_factor);
                result.push(region);
            }
        }
    }
    result
}

fn find_min_region(regions: &[Region]) -> usize {
    let mut min_index = 0;
    for (index, region) in regions.iter().enumerate() {
        if region.weight < regions[min_index].weight {
            min_index = index;
        }
    }
    min_index
}

// Dissolves the region into its neighbours, flipping its kind.
fn merge_region(regions: &[Region], index: usize) -> Vec<Region> {
    let mut merged = regions[index];
    if index > 0 {
        let prev = &regions[index - 1];
        merged.start = prev.start;
        merged.weight += prev.weight;
        debug_assert_ne!(prev.good, regions[index].good);
    }
    if index + 1 < regions.len() {
        let next = &regions[index + 1];
        merged.stop = next.stop;
        merged.weight += next.weight;
        debug_assert_ne!(next.good, regions[index].good);
    }
    merged.good = !regions[index].good;
    let mut result = Vec::with_capacity(regions.len().saturating_sub(2));
    for (i, region) in regions.iter().enumerate() {
        if i == index {
            result.push(merged);
        } else if i + 1 != index && i != index + 1 {
            result.push(*region);
        }
    }
    result
}

/// Finds regions of low similarity inside blocks of the `other` block set
/// and emits them as weak sub-blocks into `target`.
///
/// Columns that are identical and gapless are good; maximal runs of equal
/// quality become regions, and regions lighter than `min-length` dissolve
/// into their neighbours until everything left is heavy enough. Bad
/// regions then yield one sub-block each.
pub struct FindLowSimilar {
    options: Options,
    subblocks: Vec<Block>,
}

impl Default for FindLowSimilar {
    fn default() -> Self {
        Self::new()
    }
}

impl FindLowSimilar {
    pub fn new() -> Self {
        let mut options = Options::new();
        options.add_opt("min-length", "Minimal length of a region", 100i64);
        options
            .add_opt_rule("min-length >= 1")
            .expect("the rule matches the declared option");
        options.add_opt(
            "min-identity",
            "Minimal identity of a good region",
            0.9f64,
        );
        options
            .add_opt_rule("min-identity < 1")
            .expect("the rule matches the declared option");
        Self {
            options,
            subblocks: Vec::new(),
        }
    }

    fn weight_factor(&self) -> usize {
        let min_identity = self.options.opt_decimal("min-identity").unwrap_or(0.9);
        (1.0 / (1.0 - min_identity)) as usize
    }
}

impl BlocksJobs for FindLowSimilar {
    type ThreadData = Vec<Block>;

    fn before_thread(&self, _worker: usize, _seed: u64) -> Self::ThreadData {
        Vec::new()
    }

    fn process_block(
        &self,
        block_set: &BlockSet,
        id: BlockId,
        data: &mut Self::ThreadData,
    ) -> Result<()> {
        let block = block_set.block(id);
        let length = block.alignment_length();
        let good_col: Vec<bool> = (0..length)
            .map(|col| {
                let (ident, gap, _) = test_column(block, col);
                ident && !gap
            })
            .collect();
        let min_length = self.options.opt_int("min-length")? as usize;
        let mut regions = make_regions(&good_col, self.weight_factor());
        while regions.len() >= 2 {
            let min_index = find_min_region(&regions);
            if regions[min_index].weight >= min_length {
                break;
            }
            regions = merge_region(&regions, min_index);
        }
        for region in &regions {
            if region.good {
                continue;
            }
            let mut subblock = block.slice(region.start, region.stop, true);
            let doomed: Vec<usize> = subblock
                .fragments()
                .enumerate()
                .filter(|(_, fragment)| fragment.length() <= 2)
                .map(|(index, _)| index)
                .collect();
            for index in doomed.into_iter().rev() {
                subblock.erase(index);
            }
            if subblock.is_empty() {
                continue;
            }
            subblock.set_name(format!("l{}", hash_to_name(block_hash(&subblock))));
            data.push(subblock);
        }
        Ok(())
    }

    fn after_thread(&mut self, data: Self::ThreadData) -> Result<()> {
        self.subblocks.extend(data);
        Ok(())
    }
}

impl Processor for FindLowSimilar {
    fn name(&self) -> &str {
        "FindLowSimilar"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn declared_block_sets(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("target", "Destination for low similarity sub-blocks"),
            ("other", "Source blocks"),
        ]
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        self.subblocks.clear();
        let mut other = context.take_block_set("other").unwrap_or_default();
        let workers = context.workers;
        let seed = context.seed;
        let outcome = run_blocks_jobs(self, &mut other, workers, seed);
        context.set_block_set("other", other);
        let mut subblocks = std::mem::take(&mut self.subblocks);
        debug!("collected {} low similarity sub-blocks", subblocks.len());
        subblocks.sort_by_key(|block| block.name().to_string());
        let target = context.block_set_mut("target");
        for subblock in subblocks {
            target.insert(subblock);
        }
        outcome
    }
}
