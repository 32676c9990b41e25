use std::collections::BTreeSet;

use log::{debug, info};

use crate::algo::bsa_algo::{
    bsa_filter_exact_stem, bsa_filter_long, bsa_make_aln_by_tree, bsa_make_rows, bsa_make_tree,
    bsa_move_fragments, bsa_orient, bsa_remove_pure_gaps, BsaScoring,
};
use crate::error::Result;
use crate::job::{Context, OptValue, Options, Processor};
use crate::model::{genomes_number, Bsa, BsaRow};

/// Builds a named block-set alignment of the target block set.
///
/// The rows to align come from `bsa-seqs`: sequence names, genome names,
/// chromosome names, or `all` (the default when the list is empty). The
/// guide tree is UPGMA over the trivial rows; scoring constants are
/// options.
pub struct FindBsa {
    options: Options,
}

impl Default for FindBsa {
    fn default() -> Self {
        Self::new()
    }
}

impl FindBsa {
    pub fn new() -> Self {
        let mut options = Options::new();
        options.add_opt("bsa-name", "Name of the new block set alignment", "");
        options.add_opt(
            "bsa-seqs",
            "Sequences used for alignment; groups can be selected by \
             genome or chromosome name, 'all' selects every sequence",
            Vec::<String>::new(),
        );
        options.add_opt("bsa-gap-penalty", "Gap penalty of the aligner", 5i64);
        options
            .add_opt_rule("bsa-gap-penalty >= 1")
            .expect("the rule matches the declared option");
        options.add_opt(
            "bsa-log-lengths",
            "Reward shared blocks with log(length) instead of a constant",
            true,
        );
        options.add_opt(
            "bsa-stem-bonus",
            "Multiplier of the reward of shared stem blocks",
            2.0f64,
        );
        Self { options }
    }

    fn scoring(&self) -> Result<BsaScoring> {
        Ok(BsaScoring {
            gap_penalty: self.options.opt_int("bsa-gap-penalty")? as i32,
            gap_range: None,
            log_lengths: self.options.opt_bool("bsa-log-lengths")?,
            stem_bonus: self.options.opt_decimal("bsa-stem-bonus")?,
        })
    }
}

impl Processor for FindBsa {
    fn name(&self) -> &str {
        "FindBsa"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        let name = self.options.opt_str("bsa-name")?;
        let seq_groups = self.options.opt_list("bsa-seqs")?;
        let scoring = self.scoring()?;
        let block_set = context.target_mut();
        let mut rows = Bsa::new();
        for seq_group in &seq_groups {
            if block_set.seq_from_name(seq_group).is_some() {
                rows.insert_row(seq_group.clone(), BsaRow::default());
                continue;
            }
            for seq in block_set.seqs() {
                if seq.genome() == Some(seq_group.as_str())
                    || seq.chromosome() == Some(seq_group.as_str())
                    || seq_group == "all"
                {
                    rows.insert_row(seq.name(), BsaRow::default());
                }
            }
        }
        bsa_make_rows(&mut rows, block_set);
        let tree = bsa_make_tree(&rows, block_set);
        let genomes = genomes_number(block_set);
        info!("aligning {} rows of alignment '{name}'", rows.size());
        let mut aln = Bsa::new();
        bsa_make_aln_by_tree(&mut aln, &rows, &tree, block_set, genomes, &scoring)?;
        bsa_orient(&mut aln, block_set);
        block_set.set_bsa(name, aln);
        Ok(())
    }
}

/// Applies [`FindBsa`] once per chromosome, naming each alignment after
/// its chromosome.
pub struct ChrBsa {
    options: Options,
    finder: FindBsa,
}

impl Default for ChrBsa {
    fn default() -> Self {
        Self::new()
    }
}

impl ChrBsa {
    pub fn new() -> Self {
        Self {
            options: Options::new(),
            finder: FindBsa::new(),
        }
    }
}

impl Processor for ChrBsa {
    fn name(&self) -> &str {
        "ChrBsa"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        let chromosomes: BTreeSet<String> = context
            .target()
            .seqs()
            .iter()
            .filter_map(|seq| seq.chromosome().map(str::to_string))
            .collect();
        debug!("building alignments of {} chromosomes", chromosomes.len());
        for chromosome in chromosomes {
            self.finder
                .options_mut()
                .set_opt_value("bsa-seqs", OptValue::List(vec![chromosome.clone()]))?;
            self.finder
                .options_mut()
                .set_opt_value("bsa-name", chromosome.as_str())?;
            self.finder.run(context)?;
        }
        Ok(())
    }
}

/// Filters every alignment of the target block set down to exact stem
/// blocks of sufficient length, replacing everything else with gaps.
pub struct ExactStemBsa {
    options: Options,
}

impl Default for ExactStemBsa {
    fn default() -> Self {
        Self::new()
    }
}

impl ExactStemBsa {
    pub fn new() -> Self {
        let mut options = Options::new();
        options.add_opt(
            "bsa-stem-improve",
            "Move fragments and remove pure gaps afterwards",
            true,
        );
        options.add_opt("bsa-min-length", "Minimal length of an accepted block", 100i64);
        Self { options }
    }
}

impl Processor for ExactStemBsa {
    fn name(&self) -> &str {
        "ExactStemBsa"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn run(&mut self, context: &mut Context) -> Result<()> {
        let improve = self.options.opt_bool("bsa-stem-improve")?;
        let min_length = self.options.opt_int("bsa-min-length")? as usize;
        let block_set = context.target_mut();
        let genomes = genomes_number(block_set);
        let names: Vec<String> = block_set.bsa_names().map(str::to_string).collect();
        for name in names {
            let mut aln = block_set.remove_bsa(&name).expect("the name was listed");
            bsa_filter_exact_stem(&mut aln, block_set, genomes);
            bsa_filter_long(&mut aln, block_set, min_length);
            if improve {
                bsa_move_fragments(&mut aln, block_set);
                bsa_remove_pure_gaps(&mut aln);
            }
            block_set.set_bsa(name, aln);
        }
        Ok(())
    }
}
