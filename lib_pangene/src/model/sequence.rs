use crate::error::{Error, Result};
use crate::hash::make_hash;
use crate::model::Ori;
use crate::nucleotide::{char_to_size, complement, is_atgcn, size_to_char};

#[cfg(test)]
mod tests;

/// Storage variant of a [`Sequence`], selected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SequenceKind {
    /// One byte per letter.
    AsIs,
    /// Two bits per letter. `N` collapses to the two-bit code `0` and reads
    /// back as `A`.
    Compact,
}

#[derive(Debug, Clone)]
enum Storage {
    AsIs(Vec<u8>),
    Compact { data: Vec<u8>, size: usize },
}

impl Storage {
    fn size(&self) -> usize {
        match self {
            Storage::AsIs(data) => data.len(),
            Storage::Compact { size, .. } => *size,
        }
    }

    fn char_at(&self, index: usize) -> u8 {
        match self {
            Storage::AsIs(data) => data[index],
            Storage::Compact { data, size } => {
                assert!(index < *size);
                let code = (data[index / 4] >> (2 * (index % 4))) & 0b11;
                size_to_char(code as usize)
            }
        }
    }

    fn push_letter(&mut self, letter: u8) {
        match self {
            Storage::AsIs(data) => data.push(letter),
            Storage::Compact { data, size } => {
                if *size % 4 == 0 {
                    data.push(0);
                }
                let code = (char_to_size(letter) & 0b11) as u8;
                data[*size / 4] |= code << (2 * (*size % 4));
                *size += 1;
            }
        }
    }

    fn set_letter(&mut self, index: usize, letter: u8) {
        match self {
            Storage::AsIs(data) => data[index] = letter,
            Storage::Compact { data, .. } => {
                let code = (char_to_size(letter) & 0b11) as u8;
                let shift = 2 * (index % 4);
                data[index / 4] &= !(0b11 << shift);
                data[index / 4] |= code << shift;
            }
        }
    }

    fn grow_to(&mut self, new_size: usize) {
        match self {
            Storage::AsIs(data) => {
                if data.len() < new_size {
                    data.resize(new_size, b'N');
                }
            }
            Storage::Compact { data, size } => {
                if *size < new_size {
                    data.resize((new_size + 3) / 4, 0);
                    *size = new_size;
                }
            }
        }
    }
}

/// An immutable nucleotide sequence with a name, an optional description and
/// an optional `genome&chromosome&{c,l}` encoding inside the name.
///
/// The letter buffer is filled while a reader constructs the sequence and is
/// not modified afterwards.
#[derive(Debug, Clone)]
pub struct Sequence {
    name: String,
    description: String,
    storage: Storage,
    consensus_of: Option<String>,
}

impl Sequence {
    pub fn new(kind: SequenceKind) -> Self {
        let storage = match kind {
            SequenceKind::AsIs => Storage::AsIs(Vec::new()),
            SequenceKind::Compact => Storage::Compact {
                data: Vec::new(),
                size: 0,
            },
        };
        Self {
            name: String::new(),
            description: String::new(),
            storage,
            consensus_of: None,
        }
    }

    /// Builds a named sequence from normalized letters.
    pub fn from_letters(kind: SequenceKind, name: impl Into<String>, letters: &[u8]) -> Self {
        let mut sequence = Self::new(kind);
        sequence.name = name.into();
        sequence.push_back(letters);
        sequence
    }

    pub fn kind(&self) -> SequenceKind {
        match self.storage {
            Storage::AsIs(_) => SequenceKind::AsIs,
            Storage::Compact { .. } => SequenceKind::Compact,
        }
    }

    /// Appends upper-cased `ATGCN` letters.
    ///
    /// Callers normalize raw input with [`crate::nucleotide::to_atgcn`]
    /// first; anything else is a logic error.
    pub fn push_back(&mut self, letters: &[u8]) {
        assert!(is_atgcn(letters), "sequence letters must be ATGCN");
        for &letter in letters {
            self.storage.push_letter(letter);
        }
    }

    /// Writes `letters` at `[min_pos, min_pos + letters.len())`, growing the
    /// sequence as needed. Positions never written read as `N` (as-is
    /// storage) or `A` (compact storage).
    ///
    /// This is a construction-time operation used by readers that learn a
    /// sequence piecewise from the fragments covering it.
    pub fn map_from_slice(&mut self, min_pos: usize, letters: &[u8]) {
        if letters.is_empty() {
            return;
        }
        assert!(is_atgcn(letters), "sequence letters must be ATGCN");
        self.storage.grow_to(min_pos + letters.len());
        for (offset, &letter) in letters.iter().enumerate() {
            self.storage.set_letter(min_pos + offset, letter);
        }
    }

    pub fn size(&self) -> usize {
        self.storage.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Letter at `index`. O(1) for both storage variants.
    pub fn char_at(&self, index: usize) -> u8 {
        self.storage.char_at(index)
    }

    /// Returns `len` letters of the window starting at `start`; for
    /// [`Ori::Reverse`] the window's reverse complement.
    pub fn substr(&self, start: usize, len: usize, ori: Ori) -> Vec<u8> {
        assert!(start + len <= self.size());
        match ori {
            Ori::Forward => (start..start + len).map(|i| self.char_at(i)).collect(),
            Ori::Reverse => (start..start + len)
                .rev()
                .map(|i| complement(self.char_at(i)))
                .collect(),
        }
    }

    /// The whole letter buffer.
    pub fn contents(&self) -> Vec<u8> {
        self.substr(0, self.size(), Ori::Forward)
    }

    /// Rolling two-bit hash of the window `[start, start + len)` read in
    /// orientation `ori`. See [`crate::hash`] for the slide property.
    pub fn hash(&self, start: usize, len: usize, ori: Ori) -> u64 {
        assert!(start + len <= self.size());
        match ori {
            Ori::Forward => make_hash((start..start + len).map(|i| self.char_at(i))),
            Ori::Reverse => make_hash(
                (start..start + len)
                    .rev()
                    .map(|i| complement(self.char_at(i))),
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    fn name_parts(&self) -> Option<(&str, &str, &str)> {
        let mut parts = self.name.split('&');
        let genome = parts.next()?;
        let chromosome = parts.next()?;
        let circular = parts.next()?;
        if parts.next().is_some() || !matches!(circular, "c" | "l") {
            return None;
        }
        Some((genome, chromosome, circular))
    }

    /// Genome name encoded in the sequence name, if any.
    pub fn genome(&self) -> Option<&str> {
        self.name_parts().map(|(genome, _, _)| genome)
    }

    /// Chromosome name encoded in the sequence name, if any.
    pub fn chromosome(&self) -> Option<&str> {
        self.name_parts().map(|(_, chromosome, _)| chromosome)
    }

    /// Whether the chromosome is circular.
    ///
    /// Unlike [`Sequence::genome`], an unparsable name is an error here:
    /// circularity changes neighbour and alignment semantics and must not be
    /// guessed.
    pub fn circular(&self) -> Result<bool> {
        match self.name_parts() {
            Some((_, _, circular)) => Ok(circular == "c"),
            None => Err(Error::BadSequenceName(self.name.clone())),
        }
    }

    /// Name of the block whose consensus produced this sequence, if any.
    pub fn consensus_of(&self) -> Option<&str> {
        self.consensus_of.as_deref()
    }

    pub fn set_consensus_of(&mut self, block_name: impl Into<String>) {
        self.consensus_of = Some(block_name.into());
    }
}
