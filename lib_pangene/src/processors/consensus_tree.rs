use std::collections::BTreeMap;
use std::io::Write;

use log::debug;

use crate::algo::tree::{BootstrapStyle, BranchTable, TreeNode};
use crate::error::Result;
use crate::job::{run_blocks_jobs, BlocksJobs, Context, Options, Processor};
use crate::model::{make_stat, BlockId, BlockSet};
use crate::processors::print_tree::block_tree_named;
use crate::processors::{Stem, TreeMethod};

type LeafLength = BTreeMap<String, f64>;
type BranchBlocks = BTreeMap<String, Vec<String>>;

#[derive(Default)]
struct BranchData {
    table: BranchTable,
    branch_blocks: BranchBlocks,
    leaf_length: LeafLength,
}

// Per-block trees voting for genome bipartitions. A block's vote weighs
// its number of non-identical positions, optionally log-scaled.
struct BranchGenerator {
    options: Options,
    genomes: Vec<String>,
    table: BranchTable,
    branch_blocks: BranchBlocks,
    leaf_length: LeafLength,
}

impl BranchGenerator {
    fn new() -> Self {
        let mut options = Options::new();
        options.add_opt(
            "min-noident",
            "Minimal number of non-identical positions in a block",
            5i64,
        );
        options.add_opt(
            "log",
            "Weigh blocks by log of the non-identical position count \
             (otherwise linearly)",
            true,
        );
        Self {
            options,
            genomes: Vec::new(),
            table: BranchTable::new(),
            branch_blocks: BranchBlocks::new(),
            leaf_length: LeafLength::new(),
        }
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }
}

impl BlocksJobs for BranchGenerator {
    type ThreadData = BranchData;

    fn initialize_work(&mut self, _block_set: &BlockSet) -> Result<()> {
        self.table.clear();
        self.branch_blocks.clear();
        self.leaf_length.clear();
        Ok(())
    }

    fn before_thread(&self, _worker: usize, _seed: u64) -> Self::ThreadData {
        BranchData::default()
    }

    fn process_block(
        &self,
        block_set: &BlockSet,
        id: BlockId,
        data: &mut Self::ThreadData,
    ) -> Result<()> {
        let stat = make_stat(block_set.block(id));
        let noident = stat.noident() as f64;
        if noident < self.options.opt_int("min-noident")? as f64 {
            return Ok(());
        }
        let block_weight = if self.options.opt_bool("log")? {
            noident.ln()
        } else {
            noident
        };
        let tree = block_tree_named(block_set, id, TreeMethod::NeighborJoining, |fragment| {
            let seq = fragment.seq();
            seq.genome().unwrap_or(seq.name()).to_string()
        })?;
        let mut table = BranchTable::new();
        tree.branch_table(&mut table, &self.genomes, block_weight);
        let block_name = block_set.block(id).name().to_string();
        for (branch, weight) in table {
            *data.table.entry(branch.clone()).or_insert(0.0) += weight;
            data.branch_blocks
                .entry(branch)
                .or_default()
                .push(block_name.clone());
        }
        for leaf in tree.all_leafs() {
            let genome = leaf.leaf_name().expect("leaves carry genome names");
            *data.leaf_length.entry(genome.to_string()).or_insert(0.0) +=
                leaf.length() * block_weight;
        }
        Ok(())
    }

    fn after_thread(&mut self, data: Self::ThreadData) -> Result<()> {
        for (branch, weight) in data.table {
            *self.table.entry(branch).or_insert(0.0) += weight;
        }
        for (branch, blocks) in data.branch_blocks {
            self.branch_blocks.entry(branch).or_default().extend(blocks);
        }
        for (genome, length) in data.leaf_length {
            *self.leaf_length.entry(genome).or_insert(0.0) += length;
        }
        Ok(())
    }
}

/// Builds the consensus tree of the genomes: per-block trees over the stem
/// blocks vote for bipartitions, the heaviest mutually compatible branches
/// win, and the winners assemble the final tree.
///
/// The report of accepted and rejected branches, their supporting blocks,
/// and the final newick line accumulate in [`ConsensusTree::output`].
pub struct ConsensusTree {
    options: Options,
    generator: BranchGenerator,
    /// Rendered report of the last run.
    pub output: Vec<u8>,
}

impl Default for ConsensusTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsensusTree {
    pub fn new() -> Self {
        let mut options = Options::new();
        options.add_opt(
            "bootstrap-percent",
            "Scale branch support to percents of the heaviest branch",
            true,
        );
        // Pipeline-wide knobs bound to the branch generator on run.
        options.add_opt(
            "min-noident",
            "Minimal number of non-identical positions in a block",
            5i64,
        );
        options.add_opt(
            "log",
            "Weigh blocks by log of the non-identical position count",
            true,
        );
        Self {
            options,
            generator: BranchGenerator::new(),
            output: Vec::new(),
        }
    }
}

fn genomes_list(block_set: &BlockSet) -> Vec<String> {
    let mut genomes: Vec<String> = block_set
        .seqs()
        .iter()
        .map(|seq| seq.genome().unwrap_or(seq.name()).to_string())
        .collect();
    genomes.sort();
    genomes.dedup();
    genomes
}

// Index of the root child containing the genome leaf.
fn top_child_of(tree: &TreeNode<String>, genome: &str) -> usize {
    tree.children()
        .iter()
        .position(|child| {
            child.leaf_name() == Some(genome)
                || child
                    .all_leafs()
                    .iter()
                    .any(|leaf| leaf.leaf_name() == Some(genome))
        })
        .expect("every genome has a leaf")
}

impl Processor for ConsensusTree {
    fn name(&self) -> &str {
        "ConsensusTree"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        let mut out = Vec::new();
        // Branches are generated over the stem blocks of a working copy.
        let mut copy = context.target().clone();
        {
            let mut stem_context = Context::new();
            stem_context.set_block_set("target", copy);
            let mut stem = Stem::new();
            stem.run(&mut stem_context)?;
            copy = stem_context.take_block_set("target").unwrap();
        }
        let genomes = genomes_list(&copy);
        self.generator.genomes = genomes.clone();
        self.generator
            .options_mut()
            .bind_from(&self.options, "min-noident")?;
        self.generator
            .options_mut()
            .bind_from(&self.options, "log")?;
        run_blocks_jobs(&mut self.generator, &mut copy, context.workers, context.seed)?;

        let mut branches: Vec<(f64, String)> = self
            .generator
            .table
            .iter()
            .map(|(branch, &weight)| (weight, branch.clone()))
            .collect();
        // Heaviest first; ties resolved by the encoding.
        branches.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        debug!("{} candidate branches", branches.len());

        let mut compatible: Vec<(f64, String)> = Vec::new();
        for (weight, branch) in &branches {
            let is_compatible = compatible
                .iter()
                .all(|(_, accepted)| TreeNode::<String>::branches_compatible(branch, accepted));
            let sets = TreeNode::<String>::branch_as_sets(&genomes, branch);
            if is_compatible {
                compatible.push((*weight, branch.clone()));
                writeln!(out, "{sets} weight={weight}")?;
            } else {
                writeln!(out, "Incompatible branch: {sets} weight={weight}")?;
            }
            let blocks = self
                .generator
                .branch_blocks
                .get(branch)
                .map(|blocks| blocks.join(","))
                .unwrap_or_default();
            writeln!(out, "blocks: {blocks}")?;
        }

        let mut cons_tree: TreeNode<String> = TreeNode::new_inner();
        for genome in &genomes {
            let mut leaf = TreeNode::new_leaf(genome.clone(), genome.clone());
            leaf.set_length(
                self.generator
                    .leaf_length
                    .get(genome)
                    .copied()
                    .unwrap_or(0.0),
            );
            cons_tree.add_child(leaf);
        }
        // Small branches first, so nested clades assemble inside out.
        compatible.sort_by_key(|(_, branch)| TreeNode::<String>::branch_size(branch));
        let max_weight = branches.first().map(|(weight, _)| *weight).unwrap_or(0.0);
        let percent = self.options.opt_bool("bootstrap-percent")? && max_weight > 0.0;
        for (weight, branch) in &compatible {
            let zeros = branch.chars().filter(|&c| c == '0').count();
            let ones = branch.len() - zeros;
            let smaller: Vec<&String> = genomes
                .iter()
                .zip(branch.chars())
                .filter(|(_, c)| if ones < zeros { *c == '1' } else { *c == '0' })
                .map(|(genome, _)| genome)
                .collect();
            let mut members: Vec<usize> = smaller
                .iter()
                .map(|genome| top_child_of(&cons_tree, genome))
                .collect();
            members.sort_unstable();
            members.dedup();
            let mut branch_node = TreeNode::new_inner();
            branch_node.set_length(*weight);
            if percent {
                branch_node.set_bootstrap((weight / max_weight * 100.0).round());
            }
            for index in members.into_iter().rev() {
                branch_node.add_child(cons_tree.detach_child(index));
            }
            cons_tree.add_child(branch_node);
        }
        cons_tree.print_newick(&mut out, true, BootstrapStyle::BeforeLength)?;
        writeln!(out)?;
        self.output = out;
        Ok(())
    }
}
