use std::collections::HashSet;

use crate::error::Result;
use crate::job::{Context, Options, Processor};
use crate::model::{block_hash, genomes_number, hash_to_name, Block};

const NULL_NAME: &str = "00000000";

// u: single fragment, r: a genome repeats, s: stem, h: the rest.
fn block_type(block: &Block, genomes: usize) -> char {
    if block.size() == 1 {
        return 'u';
    }
    let mut seen = HashSet::new();
    for fragment in block.fragments() {
        let seq = fragment.seq();
        let genome = seq.genome().unwrap_or(seq.name()).to_string();
        if !seen.insert(genome) {
            return 'r';
        }
    }
    if block.size() == genomes {
        's'
    } else {
        'h'
    }
}

/// Gives anonymous blocks canonical names and disambiguates duplicates.
///
/// A canonical name is the block type (`u`nique, `r`epeat, `s`tem, or
/// `h`alf-stem) followed by the eight-hex-digit content hash; a duplicate
/// gets a numeric suffix.
pub struct UniqueNames {
    options: Options,
}

impl Default for UniqueNames {
    fn default() -> Self {
        Self::new()
    }
}

impl UniqueNames {
    pub fn new() -> Self {
        Self {
            options: Options::new(),
        }
    }
}

impl Processor for UniqueNames {
    fn name(&self) -> &str {
        "UniqueNames"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        let block_set = context.target_mut();
        let genomes = genomes_number(block_set);
        let mut ids = block_set.block_ids();
        ids.sort_by_key(|&id| {
            (
                block_set.block(id).name().to_string(),
                hash_to_name(block_hash(block_set.block(id))),
            )
        });
        let mut names = HashSet::new();
        for id in ids {
            let block = block_set.block_mut(id);
            if block.name() == NULL_NAME || block.name().is_empty() {
                let name = format!(
                    "{}{}",
                    block_type(block, genomes),
                    hash_to_name(block_hash(block))
                );
                block.set_name(name);
            }
            if names.contains(block.name()) {
                let base = format!("{}_", block.name());
                let mut suffix = 1;
                while names.contains(&format!("{base}{suffix}")) {
                    suffix += 1;
                }
                block.set_name(format!("{base}{suffix}"));
            }
            names.insert(block.name().to_string());
        }
        Ok(())
    }
}
