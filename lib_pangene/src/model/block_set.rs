use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use slotmap::SlotMap;

use crate::model::{Block, Bsa, Fragment, Ori, Sequence};


slotmap::new_key_type! {
    /// Stable identifier of a block within one [`BlockSet`].
    pub struct BlockId;
}

/// Stable reference to a fragment: its owning block and the fragment's
/// position inside it.
///
/// Block-set alignments and fragment indexes store these instead of
/// aliasing the fragments themselves. Mutating the referenced block
/// invalidates the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentRef {
    pub block: BlockId,
    pub index: usize,
}

/// An owning set of blocks together with the sequences they reference and
/// the block-set alignments built over them.
///
/// Sequences are shared: cloning a block set clones the blocks but keeps
/// pointing at the same sequences.
#[derive(Debug, Clone, Default)]
pub struct BlockSet {
    blocks: SlotMap<BlockId, Block>,
    seqs: Vec<Arc<Sequence>>,
    name2seq: HashMap<String, usize>,
    bsas: BTreeMap<String, Bsa>,
}

impl BlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sequence. Every sequence used by a block must be added.
    /// Re-adding a sequence with a known name is a no-op.
    pub fn add_sequence(&mut self, seq: Arc<Sequence>) {
        if self.name2seq.contains_key(seq.name()) {
            return;
        }
        self.name2seq.insert(seq.name().to_string(), self.seqs.len());
        self.seqs.push(seq);
    }

    pub fn add_sequences(&mut self, seqs: impl IntoIterator<Item = Arc<Sequence>>) {
        for seq in seqs {
            self.add_sequence(seq);
        }
    }

    pub fn seqs(&self) -> &[Arc<Sequence>] {
        &self.seqs
    }

    pub fn seq_from_name(&self, name: &str) -> Option<&Arc<Sequence>> {
        self.name2seq.get(name).map(|&index| &self.seqs[index])
    }

    /// Builds a fragment from its id (`<seq>_<begin>_<last>`). The sequence
    /// must be registered and the positions must fit it. The fragment is a
    /// fresh value even if an equal fragment already lives in some block.
    pub fn fragment_from_id(&self, id: &str) -> Option<Fragment> {
        let seq_name = Fragment::seq_name_from_id(id)?;
        let seq = self.seq_from_name(seq_name)?;
        let mut numbers = id[seq_name.len() + 1..].split('_');
        let begin: usize = numbers.next()?.parse().ok()?;
        let last: usize = numbers.next()?.parse().ok()?;
        let (min_pos, max_pos, ori) = if begin <= last {
            (begin, last, Ori::Forward)
        } else {
            (last, begin, Ori::Reverse)
        };
        if max_pos >= seq.size() {
            return None;
        }
        Some(Fragment::new(seq.clone(), min_pos, max_pos, ori))
    }

    pub fn insert(&mut self, block: Block) -> BlockId {
        self.blocks.insert(block)
    }

    /// Removes and drops the block.
    pub fn erase(&mut self, id: BlockId) {
        self.blocks.remove(id);
    }

    /// Removes the block and hands it to the caller.
    pub fn detach(&mut self, id: BlockId) -> Option<Block> {
        self.blocks.remove(id)
    }

    pub fn has(&self, id: BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id]
    }

    pub fn get_block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn fragment(&self, fragment_ref: FragmentRef) -> &Fragment {
        self.blocks[fragment_ref.block].fragment(fragment_ref.index)
    }

    pub fn get_fragment(&self, fragment_ref: FragmentRef) -> Option<&Fragment> {
        self.blocks
            .get(fragment_ref.block)?
            .fragments()
            .nth(fragment_ref.index)
    }

    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Drops all blocks, keeping sequences and alignments.
    pub fn clear_blocks(&mut self) {
        self.blocks.clear();
    }

    pub fn front(&self) -> Option<BlockId> {
        self.blocks.keys().next()
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter()
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = (BlockId, &mut Block)> {
        self.blocks.iter_mut()
    }

    pub fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.keys().collect()
    }

    pub fn swap(&mut self, other: &mut BlockSet) {
        std::mem::swap(self, other);
    }

    /// The named block-set alignment, created empty on first access.
    pub fn bsa_entry(&mut self, name: &str) -> &mut Bsa {
        self.bsas.entry(name.to_string()).or_default()
    }

    pub fn bsa(&self, name: &str) -> Option<&Bsa> {
        self.bsas.get(name)
    }

    pub fn set_bsa(&mut self, name: impl Into<String>, bsa: Bsa) {
        self.bsas.insert(name.into(), bsa);
    }

    pub fn remove_bsa(&mut self, name: &str) -> Option<Bsa> {
        self.bsas.remove(name)
    }

    pub fn bsa_names(&self) -> impl Iterator<Item = &str> {
        self.bsas.keys().map(String::as_str)
    }
}
