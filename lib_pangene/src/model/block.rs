use std::collections::HashMap;
use std::fmt;

use rand::Rng;

use crate::model::block_hash::{block_hash, hash_to_name};
use crate::model::{block_identity, make_stat, Fragment, Ori, Sequence, SequenceKind};
use crate::nucleotide::GAP;

#[cfg(test)]
mod tests;

const NAME_ABC: &[u8] = b"0123456789abcdef";
const RAND_NAME_SIZE: usize = 8;

/// A named group of fragments intended to be homologous.
///
/// A regular block owns its fragments. A *weak* block holds restricted
/// copies of fragments owned elsewhere (a slice of another block); weak
/// blocks are exempt from coverage and overlap accounting.
#[derive(Debug, Clone)]
pub struct Block {
    name: String,
    fragments: Vec<Fragment>,
    weak: bool,
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl Block {
    pub fn new() -> Self {
        Self::with_name("00000000")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let mut block = Self {
            name: String::new(),
            fragments: Vec::new(),
            weak: false,
        };
        block.set_name(name);
        block
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the block name. Names are `[A-Za-z0-9]{1,40}` and unique within
    /// a block set; uniqueness is the caller's concern.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        assert!(
            !name.is_empty()
                && name.len() <= 40
                && name.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'_'),
            "bad block name: {name:?}"
        );
        self.name = name;
    }

    /// Sets a random name drawn from `rng`.
    pub fn set_random_name(&mut self, rng: &mut impl Rng) {
        let name: String = (0..RAND_NAME_SIZE)
            .map(|_| NAME_ABC[rng.random_range(0..NAME_ABC.len())] as char)
            .collect();
        self.name = name;
    }

    /// Sets the canonical name: the same set of fragments yields the same
    /// name.
    pub fn set_name_from_fragments(&mut self) {
        self.name = hash_to_name(block_hash(self));
    }

    pub fn weak(&self) -> bool {
        self.weak
    }

    pub fn set_weak(&mut self, weak: bool) {
        self.weak = weak;
    }

    pub fn insert(&mut self, fragment: Fragment) {
        debug_assert!(
            !self.fragments.contains(&fragment),
            "two equal fragments in one block"
        );
        self.fragments.push(fragment);
    }

    /// Removes and returns the fragment at `index`.
    ///
    /// Indices of later fragments shift; references into the block held by
    /// alignments or indexes are invalidated.
    pub fn erase(&mut self, index: usize) -> Fragment {
        self.fragments.remove(index)
    }

    pub fn size(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    pub fn fragment(&self, index: usize) -> &Fragment {
        &self.fragments[index]
    }

    pub fn fragment_mut(&mut self, index: usize) -> &mut Fragment {
        &mut self.fragments[index]
    }

    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> + Clone {
        self.fragments.iter()
    }

    pub fn fragments_mut(&mut self) -> impl Iterator<Item = &mut Fragment> {
        self.fragments.iter_mut()
    }

    pub fn front(&self) -> Option<&Fragment> {
        self.fragments.first()
    }

    pub fn has(&self, fragment: &Fragment) -> bool {
        self.fragments.contains(fragment)
    }

    /// Position of `fragment` in the block.
    pub fn index_of(&self, fragment: &Fragment) -> Option<usize> {
        self.fragments.iter().position(|f| f == fragment)
    }

    /// Longest row length over the members, the number of alignment
    /// columns.
    pub fn alignment_length(&self) -> usize {
        self.fragments
            .iter()
            .map(Fragment::alignment_length)
            .max()
            .unwrap_or(0)
    }

    /// Proportion of identical columns, gapped columns counting half.
    pub fn identity(&self) -> f64 {
        block_identity(&make_stat(self))
    }

    /// Majority letter of the column: the most frequent of `A`, `T`, `G`,
    /// `C`, ties resolved in that order; `-` if the column holds no letter.
    pub fn consensus_char(&self, col: usize) -> u8 {
        let mut freq = [0usize; 4];
        const LETTERS: [u8; 4] = [b'A', b'T', b'G', b'C'];
        for fragment in &self.fragments {
            if let Some(c) = fragment.alignment_at(col) {
                if let Some(index) = LETTERS.iter().position(|&l| l == c) {
                    freq[index] += 1;
                }
            }
        }
        let max_freq = freq.iter().copied().max().unwrap_or(0);
        if max_freq == 0 {
            return GAP;
        }
        let winner = freq.iter().position(|&f| f == max_freq).unwrap();
        LETTERS[winner]
    }

    /// Consensus letters over all columns, `-` for letterless columns.
    pub fn consensus_string(&self) -> Vec<u8> {
        (0..self.alignment_length())
            .map(|col| self.consensus_char(col))
            .collect()
    }

    /// A sequence holding the block's consensus with gap columns dropped,
    /// named after the block.
    pub fn consensus_sequence(&self, kind: SequenceKind) -> Sequence {
        let letters: Vec<u8> = self
            .consensus_string()
            .into_iter()
            .filter(|&c| c != GAP)
            .collect();
        let mut sequence = Sequence::from_letters(kind, self.name.clone(), &letters);
        sequence.set_consensus_of(self.name.clone());
        sequence
    }

    /// Whether the fragment multisets of two blocks coincide per
    /// `(sequence, ori)`: `1` as is, `-1` after inverting one block, `0`
    /// otherwise.
    pub fn match_blocks(one: &Block, another: &Block) -> i32 {
        if one.size() != another.size() {
            return 0;
        }
        type OriCount = HashMap<Ori, usize>;
        let count = |block: &Block| {
            let mut seq2ori: HashMap<String, OriCount> = HashMap::new();
            for fragment in &block.fragments {
                *seq2ori
                    .entry(fragment.seq_name().to_string())
                    .or_default()
                    .entry(fragment.ori())
                    .or_default() += 1;
            }
            seq2ori
        };
        let ours = count(one);
        let theirs = count(another);
        let mut all_match = true;
        let mut all_match_inversed = true;
        for (seq_name, ori_count) in &ours {
            let Some(other_count) = theirs.get(seq_name) else {
                return 0;
            };
            for ori in [Ori::Forward, Ori::Reverse] {
                let mine = ori_count.get(&ori).copied().unwrap_or(0);
                if mine != other_count.get(&ori).copied().unwrap_or(0) {
                    all_match = false;
                }
                if mine != other_count.get(&ori.flipped()).copied().unwrap_or(0) {
                    all_match_inversed = false;
                }
            }
            if !all_match && !all_match_inversed {
                return 0;
            }
        }
        if all_match {
            1
        } else {
            -1
        }
    }

    /// Inverts every fragment (and its row).
    pub fn inverse(&mut self) {
        for fragment in &mut self.fragments {
            fragment.inverse();
        }
    }

    /// Applies a coordinate patch to every fragment.
    pub fn patch(&mut self, diff: &crate::model::FragmentDiff) {
        for fragment in &mut self.fragments {
            fragment.patch(diff);
        }
    }

    /// Splits every fragment at `new_length`, collecting the remainders
    /// into a new block. The result may be empty.
    pub fn split(&mut self, new_length: usize) -> Block {
        let mut rest = Block::new();
        for fragment in &mut self.fragments {
            if let Some(new_fragment) = fragment.split(new_length) {
                rest.insert(new_fragment);
            }
        }
        rest
    }

    /// Max common shift of every member's end, limited by sequence ends
    /// and by each fragment's logical next neighbour as reported by
    /// `logical_next` (normally backed by the block set's fragment index).
    pub fn max_shift_end(
        &self,
        max_overlap: i64,
        mut logical_next: impl FnMut(&Fragment) -> Option<Fragment>,
    ) -> i64 {
        self.fragments
            .iter()
            .map(|f| f.max_shift_end(max_overlap, logical_next(f).as_ref()))
            .min()
            .unwrap_or(i64::MAX)
    }

    /// Number of positions of `fragment` covered by the block.
    pub fn common_positions(&self, fragment: &Fragment) -> usize {
        self.fragments
            .iter()
            .map(|f| f.common_positions(fragment))
            .sum()
    }

    /// Moves the members of `other` into this block, removing duplicates.
    /// If a member of `other` equals a member of this block after
    /// inversion, `other` is inverted once before merging. The merged
    /// members end up sorted.
    pub fn merge(&mut self, other: &mut Block) {
        let inverse_needed = other.fragments.iter().any(|f| {
            let mut copy = f.clone();
            copy.inverse();
            self.fragments.contains(&copy)
        });
        if inverse_needed {
            other.inverse();
        }
        let mut merged = std::mem::take(&mut self.fragments);
        merged.append(&mut other.fragments);
        merged.sort();
        merged.dedup();
        self.fragments = merged;
    }

    /// A weak block restricted to alignment columns
    /// `[min(from, to), max(from, to)]`; inverted if `from > to`. Members
    /// whose restriction is pure gap are dropped.
    pub fn slice(&self, from: usize, to: usize, keep_alignment: bool) -> Block {
        let inverse_needed = from > to;
        let (from, to) = if from > to { (to, from) } else { (from, to) };
        let mut result = Block::with_name(self.name.clone());
        result.set_weak(true);
        for fragment in &self.fragments {
            let sliced = match fragment.row() {
                Some(row) => row.slice(from, to).map(|(row, min_fp, max_fp)| {
                    let mut sub = fragment.subfragment(min_fp, max_fp);
                    if keep_alignment {
                        sub.set_row(row);
                    }
                    sub
                }),
                None => {
                    // Without a row, columns are fragment positions.
                    if from >= fragment.length() {
                        None
                    } else {
                        let max_fp = to.min(fragment.length() - 1);
                        Some(fragment.subfragment(from, max_fp))
                    }
                }
            };
            if let Some(sub) = sliced {
                result.insert(sub);
            }
        }
        if inverse_needed {
            result.inverse();
        }
        result
    }
}

impl fmt::Display for Block {
    // Sorted fragment ids, which keeps log output stable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<String> = self.fragments.iter().map(Fragment::id).collect();
        ids.sort_unstable();
        write!(f, "{} {{{}}}", self.name, ids.join(" "))
    }
}
