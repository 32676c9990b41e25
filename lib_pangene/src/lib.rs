//! A layered nucleotide pan-genome engine.
//!
//! The layers, bottom up:
//!
//! * [`model::Sequence`] — immutable nucleotide sequences with an optional
//!   two-bit packed storage.
//! * [`model::Fragment`], [`model::AlignmentRow`], [`model::Block`] —
//!   oriented intervals on sequences, their gapped alignment rows, and
//!   named groups of homologous fragments.
//! * [`model::BlockSet`] and [`model::FragmentCollection`] — the owning
//!   collection of blocks and the per-sequence sorted index answering
//!   overlap and neighbour queries, aware of circular chromosomes.
//! * [`job`] — the processor framework scheduling per-block work across
//!   worker threads with a deterministic merge.
//! * [`algo`] — block-set alignments (a progressive aligner over blocks),
//!   UPGMA and neighbor-joining trees, and their post-processing.
//! * [`io`] — fasta, block-set fasta and block-set alignment text formats.

pub mod algo;
pub mod error;
pub mod hash;
pub mod io;
pub mod job;
pub mod model;
pub mod nucleotide;
pub mod processors;

pub use error::{Error, Result};
