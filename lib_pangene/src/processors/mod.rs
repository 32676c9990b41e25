//! Built-in processors: derived views of a pan-genome (stems, repeats of
//! low similarity, trees) and block-set alignment construction.

mod consensus_tree;
mod find_bsa;
mod find_low_similar;
mod global_tree;
mod ori_by_majority;
mod overlap_finder;
mod print_tree;
mod stem;
mod unique_names;

pub use consensus_tree::ConsensusTree;
pub use find_bsa::{ChrBsa, ExactStemBsa, FindBsa};
pub use find_low_similar::FindLowSimilar;
pub use global_tree::GlobalTree;
pub use ori_by_majority::OriByMajority;
pub use overlap_finder::OverlapFinder;
pub use print_tree::{make_block_tree, PrintTree, TreeMethod};
pub use stem::Stem;
pub use unique_names::UniqueNames;
