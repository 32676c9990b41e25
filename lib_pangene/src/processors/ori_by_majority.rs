use crate::error::Result;
use crate::job::{Context, Options, Processor};
use crate::model::{Block, Ori};

/// Inverts blocks so that most of their nucleotides read forward.
///
/// The majority is weighted by fragment length; an exact tie is broken by
/// requiring the lowest-coordinate fragment to read forward.
pub struct OriByMajority {
    options: Options,
}

impl Default for OriByMajority {
    fn default() -> Self {
        Self::new()
    }
}

impl OriByMajority {
    pub fn new() -> Self {
        Self {
            options: Options::new(),
        }
    }

    /// Whether the block should be inverted.
    fn needs_inverse(block: &Block) -> bool {
        let mut forward = 0usize;
        let mut sum = 0usize;
        for fragment in block.fragments() {
            sum += fragment.length();
            if fragment.ori() == Ori::Forward {
                forward += fragment.length();
            }
        }
        if sum == 0 {
            return false;
        }
        if forward * 2 < sum {
            return true;
        }
        if forward * 2 == sum {
            let lowest = block.fragments().min_by_key(|fragment| {
                (
                    fragment.min_pos(),
                    fragment.max_pos(),
                    fragment.seq_name().to_string(),
                )
            });
            if let Some(fragment) = lowest {
                return fragment.ori() == Ori::Reverse;
            }
        }
        false
    }

    /// Applies the majority rule to one block; returns whether it was
    /// inverted.
    pub fn apply_to_block(block: &mut Block) -> bool {
        if Self::needs_inverse(block) {
            block.inverse();
            true
        } else {
            false
        }
    }
}

impl Processor for OriByMajority {
    fn name(&self) -> &str {
        "OriByMajority"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        for (_, block) in context.target_mut().blocks_mut() {
            Self::apply_to_block(block);
        }
        Ok(())
    }
}
