use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::hash::make_hash;
use crate::model::{AlignmentRow, Ori, Sequence};
use crate::nucleotide::complement;

#[cfg(test)]
mod tests;

/// Difference between the coordinates of two fragments of one sequence.
/// Applying the difference with [`Fragment::patch`] turns one into the
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentDiff {
    /// Difference of logical begin positions, in fragment direction.
    pub begin: i64,
    /// Difference of logical last positions, in fragment direction.
    pub last: i64,
    /// [`Ori::Forward`] if both fragments share the orientation.
    pub ori: Ori,
}

/// An oriented interval `[min_pos, max_pos]` on a sequence, optionally
/// carrying the gapped alignment row of its block.
#[derive(Debug, Clone)]
pub struct Fragment {
    seq: Arc<Sequence>,
    min_pos: usize,
    max_pos: usize,
    ori: Ori,
    row: Option<AlignmentRow>,
}

impl Fragment {
    pub fn new(seq: Arc<Sequence>, min_pos: usize, max_pos: usize, ori: Ori) -> Self {
        Self {
            seq,
            min_pos,
            max_pos,
            ori,
            row: None,
        }
    }

    pub fn seq(&self) -> &Arc<Sequence> {
        &self.seq
    }

    pub fn seq_name(&self) -> &str {
        self.seq.name()
    }

    pub fn min_pos(&self) -> usize {
        self.min_pos
    }

    pub fn set_min_pos(&mut self, min_pos: usize) {
        self.min_pos = min_pos;
    }

    pub fn max_pos(&self) -> usize {
        self.max_pos
    }

    pub fn set_max_pos(&mut self, max_pos: usize) {
        self.max_pos = max_pos;
    }

    pub fn ori(&self) -> Ori {
        self.ori
    }

    pub fn set_ori(&mut self, ori: Ori) {
        self.ori = ori;
    }

    /// Number of sequence positions occupied by the fragment.
    pub fn length(&self) -> usize {
        self.max_pos - self.min_pos + 1
    }

    /// Length of the attached row, or [`Fragment::length`] without a row.
    pub fn alignment_length(&self) -> usize {
        self.row.as_ref().map_or(self.length(), AlignmentRow::length)
    }

    /// First position in reading direction.
    pub fn begin_pos(&self) -> usize {
        match self.ori {
            Ori::Forward => self.min_pos,
            Ori::Reverse => self.max_pos,
        }
    }

    pub fn set_begin_pos(&mut self, begin_pos: usize) {
        match self.ori {
            Ori::Forward => self.min_pos = begin_pos,
            Ori::Reverse => self.max_pos = begin_pos,
        }
    }

    /// Last position in reading direction (last inside).
    pub fn last_pos(&self) -> usize {
        match self.ori {
            Ori::Forward => self.max_pos,
            Ori::Reverse => self.min_pos,
        }
    }

    pub fn set_last_pos(&mut self, last_pos: usize) {
        match self.ori {
            Ori::Forward => self.max_pos = last_pos,
            Ori::Reverse => self.min_pos = last_pos,
        }
    }

    /// First position after the fragment in reading direction; `-1` for a
    /// reverse fragment starting the sequence.
    pub fn end_pos(&self) -> i64 {
        match self.ori {
            Ori::Forward => self.max_pos as i64 + 1,
            Ori::Reverse => self.min_pos as i64 - 1,
        }
    }

    /// Flips the orientation. An attached row is inverted in place so that
    /// [`Fragment::alignment_at`] keeps returning the letters of the new
    /// reading direction.
    pub fn inverse(&mut self) {
        self.ori = self.ori.flipped();
        if let Some(row) = &mut self.row {
            row.inverse();
        }
    }

    /// `<seq>_<begin>_<last>`; the sign of `begin - last` encodes the
    /// orientation.
    pub fn id(&self) -> String {
        format!("{}_{}_{}", self.seq.name(), self.begin_pos(), self.last_pos())
    }

    /// Extracts the sequence name from a fragment id, or `None` if the id
    /// does not have the `<seq>_<begin>_<last>` shape.
    pub fn seq_name_from_id(id: &str) -> Option<&str> {
        let (rest, last) = id.rsplit_once('_')?;
        let (seq_name, begin) = rest.rsplit_once('_')?;
        if begin.parse::<usize>().is_ok() && last.parse::<usize>().is_ok() && !seq_name.is_empty() {
            Some(seq_name)
        } else {
            None
        }
    }

    /// Rolling hash of the fragment letters in reading direction.
    pub fn hash(&self) -> u64 {
        make_hash((0..self.length()).map(|pos| self.raw_at(pos as i64)))
    }

    /// Whether the fragment occupies the sequence position `pos`.
    pub fn has(&self, pos: usize) -> bool {
        self.min_pos <= pos && pos <= self.max_pos
    }

    /// Whether `min_pos <= max_pos < seq.size()` holds.
    pub fn valid(&self) -> bool {
        self.min_pos <= self.max_pos && self.max_pos < self.seq.size()
    }

    /// Letter at fragment position `pos`, reading in fragment direction.
    /// Negative positions are taken as is (one before begin, and so on).
    pub fn raw_at(&self, pos: i64) -> u8 {
        let seq_pos = self.begin_pos() as i64 + self.ori.sign() * pos;
        let raw = self.seq.char_at(seq_pos as usize);
        match self.ori {
            Ori::Forward => raw,
            Ori::Reverse => complement(raw),
        }
    }

    /// Letter at fragment position `pos`; negative positions count from the
    /// end, so `-1` is the last letter.
    pub fn at(&self, pos: i64) -> u8 {
        let pos = if pos >= 0 {
            pos
        } else {
            self.length() as i64 + pos
        };
        self.raw_at(pos)
    }

    /// Letter shown in alignment column `col`, or `None` for a gap. Without
    /// a row the fragment is taken as is.
    pub fn alignment_at(&self, col: usize) -> Option<u8> {
        let pos = match &self.row {
            Some(row) => row.map_to_fragment(col)?,
            None => col,
        };
        if pos < self.length() {
            Some(self.raw_at(pos as i64))
        } else {
            None
        }
    }

    /// The fragment letters in reading direction.
    pub fn letters(&self) -> Vec<u8> {
        (0..self.length()).map(|pos| self.raw_at(pos as i64)).collect()
    }

    /// Letters of fragment positions `[from, to]`; negative indices count
    /// from the end.
    pub fn substr(&self, from: i64, to: i64) -> Vec<u8> {
        let from = if from < 0 { self.length() as i64 + from } else { from };
        let to = if to < 0 { self.length() as i64 + to } else { to };
        (from..=to).map(|pos| self.raw_at(pos)).collect()
    }

    /// A new fragment covering fragment positions `[from, to]` of this one.
    /// If `from > to`, the result is inverted.
    pub fn subfragment(&self, from: usize, to: usize) -> Fragment {
        let inverse_needed = from > to;
        let (from, to) = if from > to { (to, from) } else { (from, to) };
        let mut result = Fragment::new(self.seq.clone(), self.min_pos, self.max_pos, self.ori);
        result.set_begin_pos(pos_shifted(self.begin_pos(), self.ori, from as i64));
        result.set_last_pos(pos_shifted(self.begin_pos(), self.ori, to as i64));
        if inverse_needed {
            result.inverse();
        }
        result
    }

    /// Grows (or shrinks, for negative `shift`) the fragment at its logical
    /// end; the begin position stays.
    pub fn shift_end(&mut self, shift: i64) {
        match self.ori {
            Ori::Forward => self.max_pos = (self.max_pos as i64 + shift) as usize,
            Ori::Reverse => self.min_pos = (self.min_pos as i64 - shift) as usize,
        }
    }

    /// Max valid argument of [`Fragment::shift_end`], limited by the
    /// sequence end and, unless `max_overlap` is `-1`, by the logical next
    /// neighbour (`max_overlap` positions of overlap are tolerated).
    ///
    /// The neighbour, if any, comes from the fragment index of the block
    /// set.
    pub fn max_shift_end(&self, max_overlap: i64, logical_next: Option<&Fragment>) -> i64 {
        let mut result = match self.ori {
            Ori::Forward => self.seq.size() as i64 - self.max_pos as i64 - 1,
            Ori::Reverse => self.min_pos as i64,
        };
        if max_overlap != -1 {
            if let Some(neighbor) = logical_next {
                let mut n_shift = match self.ori {
                    Ori::Forward => neighbor.min_pos as i64 - self.max_pos as i64 - 1,
                    Ori::Reverse => self.min_pos as i64 - neighbor.max_pos as i64 - 1,
                };
                n_shift += max_overlap;
                result = result.min(n_shift);
            }
        }
        result
    }

    /// Number of positions occupied by both fragments.
    pub fn common_positions(&self, other: &Fragment) -> usize {
        if self.seq_name() != other.seq_name() {
            return 0;
        }
        let max_min = self.min_pos.max(other.min_pos);
        let min_max = self.max_pos.min(other.max_pos);
        if max_min <= min_max {
            min_max - max_min + 1
        } else {
            0
        }
    }

    /// Number of positions between two fragments of one sequence.
    pub fn dist_to(&self, other: &Fragment) -> usize {
        assert_eq!(self.seq_name(), other.seq_name());
        if self.common_positions(other) > 0 {
            0
        } else if self.min_pos < other.min_pos {
            other.min_pos - self.max_pos - 1
        } else {
            self.min_pos - other.max_pos - 1
        }
    }

    /// The intersection of two fragments, inheriting this fragment's
    /// orientation. `None` without common positions.
    pub fn common_fragment(&self, other: &Fragment) -> Option<Fragment> {
        if self.seq_name() != other.seq_name() {
            return None;
        }
        let max_min = self.min_pos.max(other.min_pos);
        let min_max = self.max_pos.min(other.max_pos);
        if max_min <= min_max {
            Some(Fragment::new(self.seq.clone(), max_min, min_max, self.ori))
        } else {
            None
        }
    }

    /// Whether every position of this fragment belongs to `other`.
    pub fn is_subfragment_of(&self, other: &Fragment) -> bool {
        self.seq_name() == other.seq_name()
            && self.min_pos >= other.min_pos
            && self.max_pos <= other.max_pos
    }

    /// Subfragment sharing no boundary with `other`.
    pub fn is_internal_subfragment_of(&self, other: &Fragment) -> bool {
        self.seq_name() == other.seq_name()
            && self.min_pos > other.min_pos
            && self.max_pos < other.max_pos
    }

    /// Difference turning this fragment into `other`.
    pub fn diff_to(&self, other: &Fragment) -> FragmentDiff {
        assert_eq!(self.seq_name(), other.seq_name());
        FragmentDiff {
            begin: self.ori.sign() * (other.begin_pos() as i64 - self.begin_pos() as i64),
            last: self.ori.sign() * (other.last_pos() as i64 - self.last_pos() as i64),
            ori: if other.ori == self.ori {
                Ori::Forward
            } else {
                Ori::Reverse
            },
        }
    }

    /// Applies a difference produced by [`Fragment::diff_to`].
    pub fn patch(&mut self, diff: &FragmentDiff) {
        let new_begin = pos_shifted(self.begin_pos(), self.ori, diff.begin);
        let new_last = pos_shifted(self.last_pos(), self.ori, diff.last);
        self.ori = self.ori.times(diff.ori);
        self.set_begin_pos(new_begin);
        self.set_last_pos(new_last);
    }

    /// Copies sequence, coordinates and orientation from `other`, dropping
    /// any row.
    pub fn apply_coords(&mut self, other: &Fragment) {
        self.seq = other.seq.clone();
        self.min_pos = other.min_pos;
        self.max_pos = other.max_pos;
        self.ori = other.ori;
        self.row = None;
    }

    /// Excludes the positions of `other` from this fragment, keeping the
    /// orientation. If `other` covers this fragment, the result is invalid.
    /// If `other` sits strictly inside, the left flank is kept.
    pub fn exclude(&mut self, other: &Fragment) {
        assert_eq!(self.seq_name(), other.seq_name());
        let max_min = self.min_pos.max(other.min_pos);
        let min_max = self.max_pos.min(other.max_pos);
        if max_min > min_max {
            return;
        }
        if self.min_pos < other.min_pos {
            self.max_pos = other.min_pos - 1;
        } else if self.max_pos > other.max_pos {
            self.min_pos = other.max_pos + 1;
        } else {
            // Swap to an empty, invalid interval.
            let old_min = self.min_pos;
            self.min_pos = self.max_pos + 1;
            self.max_pos = old_min;
            debug_assert!(!self.valid());
        }
    }

    /// Difference whose application equals [`Fragment::exclude`].
    pub fn exclusion_diff(&self, other: &Fragment) -> FragmentDiff {
        let mut copy = Fragment::new(self.seq.clone(), self.min_pos, self.max_pos, self.ori);
        copy.exclude(other);
        self.diff_to(&copy)
    }

    /// Shortens this fragment to `new_length` and returns the remainder as
    /// a new fragment of the same orientation, or `None` if the fragment is
    /// not longer than `new_length`.
    pub fn split(&mut self, new_length: usize) -> Option<Fragment> {
        let old_length = self.length();
        if old_length <= new_length {
            return None;
        }
        let mut rest = Fragment::new(self.seq.clone(), self.min_pos, self.max_pos, self.ori);
        rest.set_begin_pos(pos_shifted(self.begin_pos(), self.ori, new_length as i64));
        self.set_last_pos(pos_shifted(self.begin_pos(), self.ori, new_length as i64 - 1));
        debug_assert_eq!(rest.length() + new_length, old_length);
        debug_assert_eq!(self.length(), new_length);
        debug_assert_eq!(self.common_positions(&rest), 0);
        self.row = None;
        Some(rest)
    }

    pub fn row(&self) -> Option<&AlignmentRow> {
        self.row.as_ref()
    }

    /// Attaches a row. The row length must cover the fragment.
    pub fn set_row(&mut self, row: AlignmentRow) {
        assert!(row.length() >= self.length());
        assert_eq!(row.bound(), self.length());
        self.row = Some(row);
    }

    pub fn detach_row(&mut self) -> Option<AlignmentRow> {
        self.row.take()
    }

    /// The gapped alignment string of the fragment, or its plain letters
    /// without a row.
    pub fn alignment_string(&self) -> Vec<u8> {
        (0..self.alignment_length())
            .map(|col| self.alignment_at(col).unwrap_or(crate::nucleotide::GAP))
            .collect()
    }
}

fn pos_shifted(begin: usize, ori: Ori, delta: i64) -> usize {
    let pos = begin as i64 + ori.sign() * delta;
    debug_assert!(pos >= 0);
    pos as usize
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.min_pos == other.min_pos
            && self.max_pos == other.max_pos
            && self.ori == other.ori
            && self.seq_name() == other.seq_name()
    }
}

impl Eq for Fragment {}

impl PartialOrd for Fragment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fragment {
    /// By `min_pos`, then `max_pos`, then orientation, then sequence name.
    fn cmp(&self, other: &Self) -> Ordering {
        self.min_pos
            .cmp(&other.min_pos)
            .then(self.max_pos.cmp(&other.max_pos))
            .then(self.ori.cmp(&other.ori))
            .then(self.seq_name().cmp(other.seq_name()))
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
