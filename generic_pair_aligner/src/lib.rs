//! A generic banded Needleman-Wunsch aligner.
//!
//! The aligner minimizes a cost over pairings of two abstract item lists.
//! It knows nothing about the items themselves: callers provide a
//! [`PairContents`] oracle returning the substitution cost of pairing item
//! `row` of the first list with item `col` of the second. Negative costs
//! reward a pairing, positive costs penalize it.

use num_traits::{PrimInt, Signed};


/// Substitution oracle over two item lists.
pub trait PairContents<S> {
    /// Number of items in the first list.
    fn first_size(&self) -> usize;

    /// Number of items in the second list.
    fn second_size(&self) -> usize;

    /// Cost of pairing item `row` of the first list with item `col` of the
    /// second list. Negative values reward the pairing.
    fn substitution(&self, row: usize, col: usize) -> S;
}

/// Backtrack direction of a matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Track {
    /// Both indices decrement (pairing).
    Match,
    /// Row index decrements (item of the first list against a gap).
    RowInc,
    /// Column index decrements (item of the second list against a gap).
    ColInc,
}

/// One column of a pair alignment: an item index of the first list, the
/// second list, or both. `None` is a gap.
pub type PairStep = (Option<usize>, Option<usize>);

/// A pair alignment as a list of steps, leftmost first.
pub type PairAlignment = Vec<PairStep>;

/// Result of [`find_alignment`].
#[derive(Debug, Clone)]
pub struct Alignment<S> {
    /// Total cost of the alignment path.
    pub score: S,
    /// Rotation applied to the first list before aligning. Zero unless the
    /// alignment ran in circular mode. Step indices for the first list refer
    /// to the *rotated* list: original index = `(index + shift) % first_size`.
    pub shift: usize,
    /// The alignment path.
    pub pairs: PairAlignment,
}

/// Banded Needleman-Wunsch matrix over a [`PairContents`].
///
/// The matrix has one extra frame row and column for the empty prefixes,
/// addressed as row/column `-1`. `gap_range` is the maximal distance from
/// the main diagonal that is filled; cells outside the band keep a large
/// sentinel cost.
pub struct PairAligner<'c, C, S> {
    contents: &'c C,
    gap_range: usize,
    gap_penalty: S,
    max_errors: Option<S>,
    local: bool,
    scores: Vec<S>,
    tracks: Vec<Track>,
}

impl<'c, C, S> PairAligner<'c, C, S>
where
    C: PairContents<S>,
    S: PrimInt + Signed,
{
    pub fn new(contents: &'c C, gap_penalty: S) -> Self {
        let gap_range = contents.first_size().max(contents.second_size()).max(1);
        Self {
            contents,
            gap_range,
            gap_penalty,
            max_errors: None,
            local: false,
            scores: Vec::new(),
            tracks: Vec::new(),
        }
    }

    /// Limits the band to `gap_range` cells off the main diagonal.
    pub fn set_gap_range(&mut self, gap_range: usize) {
        self.gap_range = gap_range.max(1);
    }

    /// Stops filling rows once the best cost of a row exceeds `max_errors`.
    /// Incompatible with local mode.
    pub fn set_max_errors(&mut self, max_errors: Option<S>) {
        self.max_errors = max_errors;
    }

    /// Clamps negative prefix costs to zero, producing local alignments.
    pub fn set_local(&mut self, local: bool) {
        self.local = local;
    }

    fn rows(&self) -> isize {
        self.contents.first_size() as isize
    }

    fn cols(&self) -> isize {
        self.contents.second_size() as isize
    }

    fn cols_1(&self) -> isize {
        self.cols() + 1
    }

    fn side(&self) -> isize {
        let small = self.rows().min(self.cols()) + self.gap_range as isize;
        small.min(self.rows().max(self.cols()))
    }

    fn max_row(&self) -> isize {
        self.rows().min(self.side()) - 1
    }

    fn min_col(&self, row: isize) -> isize {
        (row - self.gap_range as isize).max(0)
    }

    fn max_col(&self, row: isize) -> isize {
        (self.cols() - 1)
            .min(self.side() - 1)
            .min(row + self.gap_range as isize)
    }

    fn bad_value() -> S {
        S::max_value() / S::from(4).unwrap()
    }

    fn in_matrix(&self, row: isize, col: isize) -> bool {
        -1 <= row && row < self.rows() && -1 <= col && col < self.cols()
    }

    fn index(&self, row: isize, col: isize) -> usize {
        debug_assert!(self.in_matrix(row, col));
        ((row + 1) * self.cols_1() + (col + 1)) as usize
    }

    fn at(&self, row: isize, col: isize) -> S {
        self.scores[self.index(row, col)]
    }

    fn set_at(&mut self, row: isize, col: isize, value: S) {
        let index = self.index(row, col);
        self.scores[index] = value;
    }

    fn track(&self, row: isize, col: isize) -> Track {
        self.tracks[self.index(row, col)]
    }

    fn set_track(&mut self, row: isize, col: isize, value: Track) {
        let index = self.index(row, col);
        self.tracks[index] = value;
    }

    fn go_prev(&self, row: &mut isize, col: &mut isize) {
        match self.track(*row, *col) {
            Track::Match => {
                *row -= 1;
                *col -= 1;
            }
            Track::RowInc => *row -= 1,
            Track::ColInc => *col -= 1,
        }
    }

    fn adjust_matrix_size(&mut self) {
        let size = ((self.rows() + 1) * self.cols_1()) as usize;
        self.scores.clear();
        self.scores.resize(size, Self::bad_value());
        self.tracks.clear();
        self.tracks.resize(size, Track::Match);
    }

    fn limit_range(&mut self) {
        for row in -1..self.rows() {
            for ori in [-1isize, 1] {
                let col = row + ori * (self.gap_range as isize + 1);
                if self.in_matrix(row, col) {
                    self.set_at(row, col, Self::bad_value());
                }
            }
        }
    }

    fn make_frame(&mut self) {
        self.set_at(-1, -1, S::zero());
        for row in 0..self.rows() {
            let value = if self.local {
                S::zero()
            } else {
                S::from(row + 1).unwrap() * self.gap_penalty
            };
            self.set_at(row, -1, value);
            self.set_track(row, -1, Track::RowInc);
        }
        for col in 0..self.cols() {
            let value = if self.local {
                S::zero()
            } else {
                S::from(col + 1).unwrap() * self.gap_penalty
            };
            self.set_at(-1, col, value);
            self.set_track(-1, col, Track::ColInc);
        }
    }

    /// Fills the matrix and returns the last filled row together with the
    /// column of its minimum, the end of the best semiglobal alignment.
    pub fn align(&mut self) -> (isize, isize) {
        self.adjust_matrix_size();
        self.limit_range();
        self.make_frame();
        assert!(!self.local || self.max_errors.is_none());
        let mut r_row = -1;
        let mut r_col = -1;
        for row in 0..=self.max_row() {
            let start_col = self.min_col(row);
            let stop_col = self.max_col(row);
            let mut min_score_col = start_col;
            for col in start_col..=stop_col {
                debug_assert!(self.in_matrix(row, col));
                let matched =
                    self.at(row - 1, col - 1) + self.contents.substitution(row as usize, col as usize);
                let gap1 = self.at(row, col - 1) + self.gap_penalty;
                let gap2 = self.at(row - 1, col) + self.gap_penalty;
                let mut score = matched.min(gap1).min(gap2);
                if self.local {
                    score = score.min(S::zero());
                }
                self.set_at(row, col, score);
                if score < self.at(row, min_score_col) {
                    min_score_col = col;
                }
                let track = if score == matched {
                    Track::Match
                } else if score == gap1 {
                    Track::ColInc
                } else {
                    Track::RowInc
                };
                self.set_track(row, col, track);
            }
            if let Some(max_errors) = self.max_errors {
                if self.at(row, min_score_col) > max_errors {
                    break;
                }
            }
            r_row = row;
            r_col = min_score_col;
        }
        if self.local {
            self.track_local(self.rows() - 1, self.cols() - 1);
        }
        (r_row, r_col)
    }

    /// Finds the minimum cell at or before `(row, col)`.
    pub fn find_opt(&self, row: &mut isize, col: &mut isize) {
        let row0 = *row;
        let col0 = *col;
        for i in 0..=row0 {
            for j in 0..=col0 {
                if self.at(i, j) < self.at(*row, *col) {
                    *row = i;
                    *col = j;
                }
            }
        }
    }

    /// Minimum value of the matrix.
    pub fn opt_score(&self) -> S {
        let mut min_row = self.rows() - 1;
        let mut min_col = self.cols() - 1;
        self.find_opt(&mut min_row, &mut min_col);
        self.at(min_row, min_col)
    }

    // Stitches backtrack paths between local alignment segments so that
    // export_alignment can start from the bottom-right corner.
    fn track_local(&mut self, row: isize, col: isize) {
        if row == -1 || col == -1 {
            return;
        }
        let mut min_row = row;
        let mut min_col = col;
        self.find_opt(&mut min_row, &mut min_col);
        if self.at(min_row, min_col) == S::zero() {
            return;
        }
        for j in min_col..=col {
            self.set_track(min_row, j, Track::ColInc);
        }
        for i in min_row..=row {
            self.set_track(i, col, Track::RowInc);
        }
        while self.at(min_row, min_col) < S::zero() {
            self.go_prev(&mut min_row, &mut min_col);
            debug_assert!(self.in_matrix(min_row, min_col));
        }
        self.track_local(min_row, min_col);
    }

    /// Finds the end of the good common prefix of the two lists: fills the
    /// matrix, takes the semiglobal end reported by [`PairAligner::align`]
    /// and strips the bad tail with [`PairAligner::cut_tail`].
    ///
    /// Returns `(-1, -1)` when nothing aligns.
    pub fn align_prefix(&mut self) -> (isize, isize) {
        let (mut first_last, mut second_last) = self.align();
        if first_last >= 0 && second_last >= 0 {
            self.cut_tail(&mut first_last, &mut second_last);
        }
        (first_last, second_last)
    }

    /// Strips the tail of the alignment as long as stepping back improves
    /// the cost.
    pub fn cut_tail(&self, first_last: &mut isize, second_last: &mut isize) {
        loop {
            let mut prev_row = *first_last;
            let mut prev_col = *second_last;
            self.go_prev(&mut prev_row, &mut prev_col);
            if self.in_matrix(prev_row, prev_col)
                && self.at(prev_row, prev_col) < self.at(*first_last, *second_last)
            {
                *first_last = prev_row;
                *second_last = prev_col;
            } else {
                break;
            }
        }
    }

    /// Exports the backtracked path ending at `(first_last, second_last)`.
    pub fn export_alignment(&self, first_last: isize, second_last: isize) -> PairAlignment {
        let mut alignment = PairAlignment::new();
        let mut row = first_last;
        let mut col = second_last;
        while row != -1 || col != -1 {
            let (print_first, print_second) = match self.track(row, col) {
                Track::Match => (true, true),
                Track::RowInc => (true, false),
                Track::ColInc => (false, true),
            };
            let a_row = if print_first { Some(row as usize) } else { None };
            let a_col = if print_second { Some(col as usize) } else { None };
            alignment.push((a_row, a_col));
            self.go_prev(&mut row, &mut col);
            debug_assert!(self.in_matrix(row, col));
        }
        alignment.reverse();
        alignment
    }
}

// Presents the first list rotated left by `shift` items.
struct RotatedContents<'c, C> {
    inner: &'c C,
    shift: usize,
}

impl<C, S> PairContents<S> for RotatedContents<'_, C>
where
    C: PairContents<S>,
{
    fn first_size(&self) -> usize {
        self.inner.first_size()
    }

    fn second_size(&self) -> usize {
        self.inner.second_size()
    }

    fn substitution(&self, row: usize, col: usize) -> S {
        self.inner
            .substitution((row + self.shift) % self.inner.first_size(), col)
    }
}

fn global_alignment<C, S>(contents: &C, gap_penalty: S, gap_range: Option<usize>) -> (S, PairAlignment)
where
    C: PairContents<S>,
    S: PrimInt + Signed,
{
    let mut aligner = PairAligner::new(contents, gap_penalty);
    if let Some(gap_range) = gap_range {
        aligner.set_gap_range(gap_range);
    }
    let (last_row, last_col) = aligner.align();
    let rows = contents.first_size() as isize;
    let cols = contents.second_size() as isize;
    // The bottom-right corner is inside the band iff the band is wide
    // enough to absorb the length difference.
    let corner_in_band = (rows - cols).unsigned_abs() <= aligner.gap_range;
    let (end_row, end_col) = if corner_in_band {
        (rows - 1, cols - 1)
    } else {
        (last_row, last_col)
    };
    let score = aligner.at(end_row, end_col);
    (score, aligner.export_alignment(end_row, end_col))
}

/// Finds the best global alignment of the two item lists of `contents`.
///
/// In circular mode every rotation of the first list is tried and the
/// cheapest one wins; the applied rotation is reported in
/// [`Alignment::shift`].
pub fn find_alignment<C, S>(
    contents: &C,
    gap_penalty: S,
    gap_range: Option<usize>,
    circular: bool,
) -> Alignment<S>
where
    C: PairContents<S>,
    S: PrimInt + Signed,
{
    let rows = contents.first_size();
    let cols = contents.second_size();
    if rows == 0 || cols == 0 {
        let mut pairs = PairAlignment::new();
        for row in 0..rows {
            pairs.push((Some(row), None));
        }
        for col in 0..cols {
            pairs.push((None, Some(col)));
        }
        let gaps = S::from(rows + cols).unwrap();
        return Alignment {
            score: gaps * gap_penalty,
            shift: 0,
            pairs,
        };
    }
    if !circular {
        let (score, pairs) = global_alignment(contents, gap_penalty, gap_range);
        return Alignment {
            score,
            shift: 0,
            pairs,
        };
    }
    let mut best: Option<Alignment<S>> = None;
    for shift in 0..rows {
        let rotated = RotatedContents {
            inner: contents,
            shift,
        };
        let (score, pairs) = global_alignment(&rotated, gap_penalty, gap_range);
        if best.as_ref().map_or(true, |b| score < b.score) {
            best = Some(Alignment {
                score,
                shift,
                pairs,
            });
        }
    }
    best.unwrap()
}
