//! The pan-genome data model: sequences, fragments, alignment rows, blocks,
//! block sets, block-set alignments, and the per-sequence fragment index.

mod block;
mod block_hash;
mod block_set;
mod block_stat;
mod bsa;
mod fragment;
mod fragment_collection;
mod row;
mod sequence;

pub use block::Block;
pub use block_hash::{block_hash, genomes_number, hash_to_name, is_exact_stem};
pub use block_set::{BlockId, BlockSet, FragmentRef};
pub use block_stat::{block_identity, make_stat, make_stat_slice, test_column, AlignmentStat};
pub use bsa::{bsa_is_circular, bsa_length, Bsa, BsaRow};
pub use fragment::{Fragment, FragmentDiff};
pub use fragment_collection::{
    FragmentContainer, FragmentCollection, PlacedFragment, SetFc, SortedSet, SortedVec, VectorFc,
};
pub use row::{AlignmentRow, RowKind};
pub use sequence::{Sequence, SequenceKind};

/// Orientation of a fragment or row: forward along the sequence or reverse
/// complemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ori {
    Reverse,
    Forward,
}

impl Ori {
    /// `1` for forward, `-1` for reverse.
    pub fn sign(self) -> i64 {
        match self {
            Ori::Forward => 1,
            Ori::Reverse => -1,
        }
    }

    /// Builds an orientation from a sign; any non-negative value is forward.
    pub fn from_sign(sign: i64) -> Self {
        if sign < 0 {
            Ori::Reverse
        } else {
            Ori::Forward
        }
    }

    /// The opposite orientation.
    pub fn flipped(self) -> Self {
        match self {
            Ori::Forward => Ori::Reverse,
            Ori::Reverse => Ori::Forward,
        }
    }

    /// Composition of two orientations.
    pub fn times(self, other: Ori) -> Self {
        if self == other {
            Ori::Forward
        } else {
            Ori::Reverse
        }
    }
}
