use crate::model::Block;
use crate::nucleotide::{char_to_size, LETTERS_NUMBER};

/// Per-column and per-fragment statistics of a block's alignment.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlignmentStat {
    /// Non-empty identical columns without gaps.
    pub ident_nogap: usize,
    /// Non-empty identical columns with gaps.
    pub ident_gap: usize,
    /// Non-empty non-identical columns without gaps.
    pub noident_nogap: usize,
    /// Non-empty non-identical columns with gaps.
    pub noident_gap: usize,
    /// Columns consisting of gaps only.
    pub pure_gap: usize,
    /// All columns; the sum of the counters above.
    pub total: usize,
    /// Per-letter counts, indexed by the letter code.
    pub letter_count: [usize; LETTERS_NUMBER],
    /// `(max - min) / avg` fragment length.
    pub spreading: f64,
    /// Number of fragments with an alignment row.
    pub alignment_rows: usize,
    /// Shortest fragment length.
    pub min_fragment_length: usize,
    /// Longest fragment length.
    pub max_fragment_length: usize,
    /// Average fragment length.
    pub avg_fragment_length: f64,
    /// Number of fragments overlapping another fragment of the same block.
    pub overlapping_fragments: usize,
}

impl AlignmentStat {
    pub fn letter_count(&self, letter: u8) -> usize {
        let index = char_to_size(letter);
        if index < LETTERS_NUMBER {
            self.letter_count[index]
        } else {
            0
        }
    }

    /// `GC / (GC + AT)`.
    pub fn gc(&self) -> f64 {
        let gc = (self.letter_count(b'G') + self.letter_count(b'C')) as f64;
        let at = (self.letter_count(b'A') + self.letter_count(b'T')) as f64;
        gc / (gc + at)
    }

    /// Number of non-identical positions, the weight used by branch
    /// generation.
    pub fn noident(&self) -> usize {
        self.noident_nogap + self.noident_gap
    }
}

/// Collects the alignment statistics of a block.
pub fn make_stat(block: &Block) -> AlignmentStat {
    let length = block.alignment_length();
    make_stat_slice(block, 0, length.saturating_sub(1))
}

/// Collects the statistics of alignment columns `[start, stop]` only.
pub fn make_stat_slice(block: &Block, start: usize, stop: usize) -> AlignmentStat {
    let length = block.alignment_length();
    let columns = if length == 0 {
        0..0
    } else {
        start..stop.min(length - 1) + 1
    };
    let mut stat = AlignmentStat {
        total: columns.len(),
        ..AlignmentStat::default()
    };
    for col in columns {
        let mut seen_letter = None;
        let mut ident = true;
        let mut gap = false;
        for fragment in block.fragments() {
            match fragment.alignment_at(col) {
                None => gap = true,
                Some(c) => {
                    match seen_letter {
                        None => seen_letter = Some(c),
                        Some(seen) if seen != c => ident = false,
                        Some(_) => {}
                    }
                    let index = char_to_size(c);
                    if index < LETTERS_NUMBER {
                        stat.letter_count[index] += 1;
                    }
                }
            }
        }
        match (seen_letter.is_some(), ident, gap) {
            (false, _, _) => stat.pure_gap += 1,
            (true, true, false) => stat.ident_nogap += 1,
            (true, true, true) => stat.ident_gap += 1,
            (true, false, false) => stat.noident_nogap += 1,
            (true, false, true) => stat.noident_gap += 1,
        }
    }
    let lengths: Vec<usize> = block.fragments().map(|f| f.length()).collect();
    stat.alignment_rows = block.fragments().filter(|f| f.row().is_some()).count();
    for (index, fragment) in block.fragments().enumerate() {
        let overlaps = block
            .fragments()
            .enumerate()
            .any(|(other, g)| other != index && fragment.common_positions(g) > 0);
        if overlaps {
            stat.overlapping_fragments += 1;
        }
    }
    if !lengths.is_empty() {
        let min = *lengths.iter().min().unwrap();
        let max = *lengths.iter().max().unwrap();
        let avg = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
        stat.min_fragment_length = min;
        stat.max_fragment_length = max;
        stat.avg_fragment_length = avg;
        stat.spreading = if avg == 0.0 {
            0.0
        } else {
            (max - min) as f64 / avg
        };
    }
    stat
}

/// Classifies one alignment column: `(ident, gap, pure_gap)`.
pub fn test_column(block: &Block, col: usize) -> (bool, bool, bool) {
    let mut seen_letter = None;
    let mut ident = true;
    let mut gap = false;
    for fragment in block.fragments() {
        match fragment.alignment_at(col) {
            None => gap = true,
            Some(c) => match seen_letter {
                None => seen_letter = Some(c),
                Some(seen) if seen != c => ident = false,
                Some(_) => {}
            },
        }
    }
    (ident, gap, seen_letter.is_none())
}

/// Proportion of identical columns; columns with gaps count half.
pub fn block_identity(stat: &AlignmentStat) -> f64 {
    let accepted = stat.ident_nogap as f64 + 0.5 * stat.ident_gap as f64;
    let total = (stat.ident_nogap + stat.noident_nogap) as f64
        + 0.5 * (stat.ident_gap + stat.noident_gap) as f64;
    if total > 0.1 {
        accepted / total
    } else {
        0.0
    }
}
