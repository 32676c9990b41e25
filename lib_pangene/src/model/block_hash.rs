use std::collections::HashSet;

use crate::model::{Block, BlockSet};

// Digest of the sorted fragment ids, stable across runs and block orders.
fn ids_digest(block: &Block) -> u32 {
    let mut ids: Vec<String> = block.fragments().map(|f| f.id()).collect();
    ids.sort_unstable();
    let mut joint = ids.join(" ").into_bytes();
    let loop_size = 8;
    let padded = joint.len().div_ceil(loop_size) * loop_size;
    joint.resize(padded, b' ');
    let mut digest: u32 = 1;
    for chunk in joint.chunks_exact(loop_size) {
        let mul = u32::from_le_bytes(chunk[0..4].try_into().unwrap());
        let xor = u32::from_le_bytes(chunk[4..8].try_into().unwrap());
        digest = digest.wrapping_mul(mul);
        digest ^= xor;
    }
    digest
}

/// Content hash of a block: the same fragment set yields the same hash,
/// regardless of insertion order.
pub fn block_hash(block: &Block) -> u32 {
    ids_digest(block)
}

/// Canonical eight-hex-digit name derived from [`block_hash`].
pub fn hash_to_name(hash: u32) -> String {
    format!("{hash:08x}")
}

fn fragment_genome(block: &Block, index: usize) -> String {
    let seq = block.fragment(index).seq();
    seq.genome().unwrap_or(seq.name()).to_string()
}

/// Whether the block covers every one of `genomes` genomes exactly once.
pub fn is_exact_stem(block: &Block, genomes: usize) -> bool {
    if block.size() != genomes {
        return false;
    }
    let mut seen = HashSet::new();
    for index in 0..block.size() {
        if !seen.insert(fragment_genome(block, index)) {
            return false;
        }
    }
    true
}

/// Number of distinct genomes over the sequences of the block set.
/// Sequences without the `genome&chromosome&{c,l}` encoding count as their
/// own genome.
pub fn genomes_number(block_set: &BlockSet) -> usize {
    let genomes: HashSet<&str> = block_set
        .seqs()
        .iter()
        .map(|seq| seq.genome().unwrap_or(seq.name()))
        .collect();
    genomes.len()
}
