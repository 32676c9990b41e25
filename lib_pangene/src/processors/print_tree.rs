use std::io::Write;

use crate::algo::fragment_distance::fragment_distance;
use crate::algo::tree::{BootstrapStyle, TreeNode};
use crate::error::Result;
use crate::job::{print_blocks, Context, Options, PrintBlock, Processor};
use crate::model::{BlockId, BlockSet, Fragment};

/// Tree construction method of per-block trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMethod {
    Upgma,
    NeighborJoining,
}

impl TreeMethod {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "upgma" => Some(TreeMethod::Upgma),
            "nj" => Some(TreeMethod::NeighborJoining),
            _ => None,
        }
    }
}

// Builds the distance tree of one block's fragments; every fragment needs
// an alignment row.
pub(crate) fn block_tree_named(
    block_set: &BlockSet,
    id: BlockId,
    method: TreeMethod,
    namer: impl Fn(&Fragment) -> String,
) -> Result<TreeNode<usize>> {
    let block = block_set.block(id);
    let size = block.size();
    let mut distances = vec![vec![0.0; size]; size];
    for i in 0..size {
        for j in i + 1..size {
            let distance = fragment_distance(block.fragment(i), block.fragment(j))?.ratio();
            distances[i][j] = distance;
            distances[j][i] = distance;
        }
    }
    let mut tree = TreeNode::new_inner();
    for (index, fragment) in block.fragments().enumerate() {
        tree.add_child(TreeNode::new_leaf(namer(fragment), index));
    }
    match method {
        TreeMethod::Upgma => tree.upgma(|&i, &j| distances[i][j]),
        TreeMethod::NeighborJoining => tree.neighbor_joining(|&i, &j| distances[i][j]),
    }
    Ok(tree)
}

/// The distance tree of one block, with fragment ids as leaf names.
pub fn make_block_tree(
    block_set: &BlockSet,
    id: BlockId,
    method: TreeMethod,
) -> Result<TreeNode<usize>> {
    block_tree_named(block_set, id, method, Fragment::id)
}

/// Builds and prints the newick tree of every block, one
/// `block<TAB>newick` line per block.
pub struct PrintTree {
    options: Options,
    /// Rendered output of the last run.
    pub output: Vec<u8>,
}

impl Default for PrintTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintTree {
    pub fn new() -> Self {
        let mut options = Options::new();
        options.set_prefix("tree-");
        options.add_opt("method", "Method of tree construction (upgma/nj)", "nj");
        options.add_opt_check("method", |value| match value.as_str() {
            Some("upgma") | Some("nj") => Ok(()),
            _ => Err("unknown tree construction method".to_string()),
        });
        Self {
            options,
            output: Vec::new(),
        }
    }

    fn method(&self) -> Result<TreeMethod> {
        let name = self.options.opt_str("method")?;
        Ok(TreeMethod::parse(&name).expect("the option is validated"))
    }
}

impl PrintBlock for PrintTree {
    fn print_header(&self, out: &mut dyn Write, _block_set: &BlockSet) -> Result<()> {
        writeln!(out, "block\tnewick_tree")?;
        Ok(())
    }

    fn print_block(&self, out: &mut dyn Write, block_set: &BlockSet, id: BlockId) -> Result<()> {
        let tree = make_block_tree(block_set, id, self.method()?)?;
        write!(out, "{}\t", block_set.block(id).name())?;
        tree.print_newick(&mut *out, true, BootstrapStyle::None)?;
        writeln!(out)?;
        Ok(())
    }
}

impl Processor for PrintTree {
    fn name(&self) -> &str {
        "PrintTree"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        let mut output = Vec::new();
        print_blocks(&*self, context.target(), &mut output, context.workers)?;
        self.output = output;
        Ok(())
    }
}
