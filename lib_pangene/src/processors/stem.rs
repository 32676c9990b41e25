use log::debug;

use crate::error::Result;
use crate::job::{Context, Options, Processor};
use crate::model::{genomes_number, is_exact_stem};

/// Removes every block that is not an exact stem: a stem covers each
/// genome exactly once.
pub struct Stem {
    options: Options,
}

impl Default for Stem {
    fn default() -> Self {
        Self::new()
    }
}

impl Stem {
    pub fn new() -> Self {
        let mut options = Options::new();
        options.add_opt("exact", "Require exactly one fragment per genome", true);
        Self { options }
    }
}

impl Processor for Stem {
    fn name(&self) -> &str {
        "Stem"
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
        let doomed: Vec<_> = block_set
            .blocks()
            .filter(|(_, block)| !is_exact_stem(block, genomes))
            .map(|(id, _)| id)
            .collect();
        debug!("removing {} non-stem blocks", doomed.len());
        for id in doomed {
            block_set.erase(id);
        }
        Ok(())
    }
}
