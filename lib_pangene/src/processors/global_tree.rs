use std::collections::BTreeMap;
use std::io::Write;

use crate::algo::fragment_distance::fragment_distance;
use crate::algo::tree::{BootstrapStyle, TreeNode};
use crate::error::Result;
use crate::job::{Context, Options, Processor};
use crate::model::BlockSet;
use crate::processors::Stem;

type Dist = BTreeMap<(String, String), f64>;

fn add_dist(dist: &mut Dist, block_set: &BlockSet) -> Result<()> {
    for (_, block) in block_set.blocks() {
        for i in 0..block.size() {
            let one = block.fragment(i);
            let genome_one = one.seq().genome().unwrap_or(one.seq().name()).to_string();
            for j in 0..i {
                let another = block.fragment(j);
                let genome_another = another
                    .seq()
                    .genome()
                    .unwrap_or(another.seq().name())
                    .to_string();
                let mutations = fragment_distance(one, another)?.penalty as f64;
                *dist
                    .entry((genome_one.clone(), genome_another.clone()))
                    .or_insert(0.0) += mutations;
                *dist
                    .entry((genome_another.clone(), genome_one.clone()))
                    .or_insert(0.0) += mutations;
            }
        }
    }
    Ok(())
}

/// Builds the global neighbor-joining tree of the genomes.
///
/// Distances are mutation counts between fragments of the stem blocks,
/// accumulated per genome pair. The newick line lands in
/// [`GlobalTree::output`].
pub struct GlobalTree {
    options: Options,
    /// Rendered newick of the last run.
    pub output: Vec<u8>,
}

impl Default for GlobalTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalTree {
    pub fn new() -> Self {
        let mut options = Options::new();
        options.add_opt(
            "bootstrap-print",
            "How to print bootstrap values ('no', 'in-braces', 'before-length')",
            "before-length",
        );
        options.add_opt_check("bootstrap-print", |value| match value.as_str() {
            Some("no") | Some("in-braces") | Some("before-length") => Ok(()),
            _ => Err("unknown bootstrap style".to_string()),
        });
        Self {
            options,
            output: Vec::new(),
        }
    }

    fn bootstrap_style(&self) -> Result<BootstrapStyle> {
        Ok(match self.options.opt_str("bootstrap-print")?.as_str() {
            "no" => BootstrapStyle::None,
            "in-braces" => BootstrapStyle::InBraces,
            _ => BootstrapStyle::BeforeLength,
        })
    }
}

impl Processor for GlobalTree {
    fn name(&self) -> &str {
        "GlobalTree"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        let mut copy_context = Context::new();
        copy_context.set_block_set("target", context.target().clone());
        Stem::new().run(&mut copy_context)?;
        let copy = copy_context.take_block_set("target").unwrap();

        let mut dist = Dist::new();
        add_dist(&mut dist, &copy)?;
        let mut genomes: Vec<String> = copy
            .seqs()
            .iter()
            .map(|seq| seq.genome().unwrap_or(seq.name()).to_string())
            .collect();
        genomes.sort();
        genomes.dedup();

        let mut tree = TreeNode::new_inner();
        for genome in &genomes {
            tree.add_child(TreeNode::new_leaf(genome.clone(), genome.clone()));
        }
        tree.neighbor_joining(|one: &String, another: &String| {
            dist.get(&(one.clone(), another.clone()))
                .copied()
                .unwrap_or(0.0)
        });

        let mut out = Vec::new();
        tree.print_newick(&mut out, true, self.bootstrap_style()?)?;
        writeln!(out)?;
        self.output = out;
        Ok(())
    }
}
