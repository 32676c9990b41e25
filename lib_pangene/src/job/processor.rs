use std::collections::BTreeMap;

use log::info;

use crate::error::Result;
use crate::job::{OptValue, Options};
use crate::model::BlockSet;

/// Everything a processor run sees: the named block sets, the worker count,
/// the seed of deterministic randomness, and global option overrides.
pub struct Context {
    block_sets: BTreeMap<String, BlockSet>,
    pub workers: usize,
    pub seed: u64,
    global_options: BTreeMap<String, OptValue>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            block_sets: BTreeMap::new(),
            workers: 1,
            seed: 0,
            global_options: BTreeMap::new(),
        }
    }

    /// The conventional main slot.
    pub fn target(&self) -> &BlockSet {
        self.block_set("target").expect("target block set exists")
    }

    pub fn target_mut(&mut self) -> &mut BlockSet {
        self.block_set_mut("target")
    }

    pub fn block_set(&self, name: &str) -> Option<&BlockSet> {
        self.block_sets.get(name)
    }

    /// The named slot, created empty on first access.
    pub fn block_set_mut(&mut self, name: &str) -> &mut BlockSet {
        self.block_sets.entry(name.to_string()).or_default()
    }

    pub fn set_block_set(&mut self, name: impl Into<String>, block_set: BlockSet) {
        self.block_sets.insert(name.into(), block_set);
    }

    pub fn take_block_set(&mut self, name: &str) -> Option<BlockSet> {
        self.block_sets.remove(name)
    }

    pub fn block_set_names(&self) -> impl Iterator<Item = &str> {
        self.block_sets.keys().map(String::as_str)
    }

    /// Sets a global option: every processor declaring an option of this
    /// name receives the value on [`apply`], overriding its local default.
    pub fn set_global_option(&mut self, name: impl Into<String>, value: impl Into<OptValue>) {
        self.global_options.insert(name.into(), value.into());
    }

    pub fn global_options(&self) -> impl Iterator<Item = (&str, &OptValue)> {
        self.global_options
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

/// A transformation of block sets.
///
/// A processor declares its block-set slots and typed options, and runs one
/// lifecycle over a [`Context`]. Processors compose: a parent holds its
/// children as fields, binds options with [`Options::bind_from`] before
/// applying them, and binds back afterwards.
pub trait Processor {
    /// Identifier used by logs and option prefixes.
    fn name(&self) -> &str;

    fn options(&self) -> &Options;

    fn options_mut(&mut self) -> &mut Options;

    /// Block-set slots read or written by this processor, with human
    /// descriptions.
    fn declared_block_sets(&self) -> Vec<(&'static str, &'static str)> {
        vec![("target", "Target blockset")]
    }

    fn run(&mut self, context: &mut Context) -> Result<()>;
}

/// Runs one full lifecycle of a processor: applies global option overrides,
/// then [`Processor::run`].
pub fn apply(processor: &mut dyn Processor, context: &mut Context) -> Result<()> {
    let overrides: Vec<(String, OptValue)> = context
        .global_options()
        .filter(|(name, _)| processor.options().has_opt(name))
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    for (name, value) in overrides {
        processor.options_mut().set_opt_value(&name, value)?;
    }
    info!("applying processor {}", processor.name());
    processor.run(context)
}
