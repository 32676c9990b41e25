//! Construction and post-processing of block-set alignments.
//!
//! A block-set alignment is built progressively: every sequence starts as a
//! trivial row of its fragments sorted by position, rows are aligned
//! pairwise following a guide tree, and the merged alignment is cleaned up
//! after every merge. The pairwise step is a banded dynamic program over
//! *columns* whose substitution score rewards columns sharing a block.

use std::collections::BTreeSet;

use log::{debug, trace};

use generic_pair_aligner::{find_alignment, PairContents};

use crate::algo::tree::TreeNode;
use crate::error::{Error, Result};
use crate::model::{
    bsa_is_circular, bsa_length, is_exact_stem, BlockId, BlockSet, Bsa, BsaRow, FragmentRef, Ori,
    SetFc,
};


/// Scoring profile of the pairwise block-set aligner. The constants are
/// options rather than built-ins; these defaults match the production
/// profile.
#[derive(Debug, Clone)]
pub struct BsaScoring {
    /// Penalty per gap column.
    pub gap_penalty: i32,
    /// Band half-width of the dynamic program; `None` leaves it unbounded.
    pub gap_range: Option<usize>,
    /// Reward matched columns with `log(alignment length)` instead of a
    /// constant.
    pub log_lengths: bool,
    /// Multiplier of the match reward when the shared block is an exact
    /// stem.
    pub stem_bonus: f64,
}

impl Default for BsaScoring {
    fn default() -> Self {
        Self {
            gap_penalty: 5,
            gap_range: None,
            log_lengths: true,
            stem_bonus: 2.0,
        }
    }
}

/// Builds one trivial row per sequence: the sequence's fragments sorted by
/// position, no gaps, forward orientation.
///
/// If `rows` already has rows, only those sequences are filled (this is how
/// per-chromosome alignments are requested); otherwise every sequence of
/// the block set gets a row. Weak blocks do not contribute fragments.
pub fn bsa_make_rows(rows: &mut Bsa, block_set: &BlockSet) {
    if rows.is_empty() {
        for seq in block_set.seqs() {
            rows.insert_row(seq.name(), BsaRow::default());
        }
    }
    for (id, block) in block_set.blocks() {
        if block.weak() {
            continue;
        }
        for (index, fragment) in block.fragments().enumerate() {
            if let Some(row) = rows.row_mut(fragment.seq_name()) {
                row.ori = Ori::Forward;
                row.fragments.push(Some(FragmentRef { block: id, index }));
            }
        }
    }
    for (_, row) in rows.rows_mut() {
        row.fragments.sort_by_key(|cell| {
            let fragment_ref = cell.expect("trivial rows have no gaps");
            let fragment = block_set.fragment(fragment_ref);
            (
                fragment.min_pos(),
                fragment.max_pos(),
                fragment.ori(),
                fragment_ref,
            )
        });
    }
}

/// Inverts the alignment: every row flips its orientation and reverses its
/// cells.
pub fn bsa_inverse(aln: &mut Bsa) {
    for (_, row) in aln.rows_mut() {
        row.ori = row.ori.flipped();
        row.fragments.reverse();
    }
}

type BlockOri = (BlockId, Ori);

fn column_contents(bsa: &Bsa, block_set: &BlockSet) -> Vec<BTreeSet<BlockOri>> {
    let length = bsa_length(bsa);
    let mut columns = vec![BTreeSet::new(); length];
    for (_, row) in bsa.rows() {
        for (col, cell) in row.fragments.iter().enumerate() {
            if let Some(fragment_ref) = cell {
                let fragment = block_set.fragment(*fragment_ref);
                columns[col].insert((fragment_ref.block, row.ori.times(fragment.ori())));
            }
        }
    }
    columns
}

struct BsContents<'a> {
    first_columns: Vec<BTreeSet<BlockOri>>,
    second_columns: Vec<BTreeSet<BlockOri>>,
    block_set: &'a BlockSet,
    genomes: usize,
    scoring: &'a BsaScoring,
}

impl PairContents<i32> for BsContents<'_> {
    fn first_size(&self) -> usize {
        self.first_columns.len()
    }

    fn second_size(&self) -> usize {
        self.second_columns.len()
    }

    fn substitution(&self, row: usize, col: usize) -> i32 {
        let ours = &self.first_columns[row];
        for block_ori in &self.second_columns[col] {
            if ours.contains(block_ori) {
                let block = self.block_set.block(block_ori.0);
                let mut reward = if self.scoring.log_lengths {
                    (block.alignment_length().max(1) as f64).ln()
                } else {
                    1.0
                };
                if is_exact_stem(block, self.genomes) {
                    reward *= self.scoring.stem_bonus;
                }
                return -1 - reward as i32;
            }
        }
        1
    }
}

/// Aligns two block-set alignments into `both` and returns the score
/// (lower is better).
///
/// When both inputs cover circular sequences only, the first alignment may
/// be rotated freely; the rotation minimizing the score is applied before
/// joining.
pub fn bsa_align(
    both: &mut Bsa,
    first: &Bsa,
    second: &Bsa,
    block_set: &BlockSet,
    genomes: usize,
    scoring: &BsaScoring,
) -> i32 {
    let contents = BsContents {
        first_columns: column_contents(first, block_set),
        second_columns: column_contents(second, block_set),
        block_set,
        genomes,
        scoring,
    };
    let circular = bsa_is_circular(first, block_set) && bsa_is_circular(second, block_set);
    let first_length = contents.first_size();
    let alignment = find_alignment(&contents, scoring.gap_penalty, scoring.gap_range, circular);
    trace!(
        "pairwise alignment of {}x{} columns scored {}",
        first_length,
        contents.second_size(),
        alignment.score
    );
    both.clear();
    for (seq_name, row) in first.rows() {
        let cells = alignment
            .pairs
            .iter()
            .map(|&(a, _)| {
                a.and_then(|index| row.fragments[(index + alignment.shift) % first_length])
            })
            .collect();
        both.insert_row(
            seq_name.clone(),
            BsaRow {
                ori: row.ori,
                fragments: cells,
            },
        );
    }
    for (seq_name, row) in second.rows() {
        let cells = alignment
            .pairs
            .iter()
            .map(|&(_, b)| b.and_then(|index| row.fragments[index]))
            .collect();
        both.insert_row(
            seq_name.clone(),
            BsaRow {
                ori: row.ori,
                fragments: cells,
            },
        );
    }
    alignment.score
}

/// Progressively merges `parts` into one alignment. Each part is tried as
/// is and inverted; the better merge wins. After every merge fragments are
/// packed towards their block columns and pure-gap columns are dropped.
pub fn bsa_make_aln(
    aln: &mut Bsa,
    parts: &[Bsa],
    block_set: &BlockSet,
    genomes: usize,
    scoring: &BsaScoring,
) {
    aln.clear();
    let Some(head) = parts.first() else {
        return;
    };
    *aln = head.clone();
    for part in &parts[1..] {
        let mut direct = Bsa::new();
        let score_direct = bsa_align(&mut direct, aln, part, block_set, genomes, scoring);
        let mut inversed_part = part.clone();
        bsa_inverse(&mut inversed_part);
        let mut inverse = Bsa::new();
        let score_inverse = bsa_align(&mut inverse, aln, &inversed_part, block_set, genomes, scoring);
        debug!("merge scores: direct {score_direct}, inverse {score_inverse}");
        *aln = if score_direct < score_inverse {
            direct
        } else {
            inverse
        };
        bsa_move_fragments(aln, block_set);
        bsa_remove_pure_gaps(aln);
    }
}

/// Merges a map of trivial rows part by part, in row order.
pub fn bsa_make_aln_from_rows(
    aln: &mut Bsa,
    rows: &Bsa,
    block_set: &BlockSet,
    genomes: usize,
    scoring: &BsaScoring,
) {
    let parts: Vec<Bsa> = rows
        .rows()
        .map(|(seq_name, row)| {
            let mut part = Bsa::new();
            part.insert_row(seq_name.clone(), row.clone());
            part
        })
        .collect();
    bsa_make_aln(aln, &parts, block_set, genomes, scoring);
}

fn row_block_oris(row: &BsaRow, block_set: &BlockSet) -> BTreeSet<BlockOri> {
    row.fragments
        .iter()
        .flatten()
        .map(|&fragment_ref| {
            let fragment = block_set.fragment(fragment_ref);
            (fragment_ref.block, row.ori.times(fragment.ori()))
        })
        .collect()
}

/// Guide tree over the rows: UPGMA with similarity `shared / total` between
/// each pair of rows, where `shared` counts `(block, ori)` pairs present in
/// both.
pub fn bsa_make_tree(rows: &Bsa, block_set: &BlockSet) -> TreeNode<String> {
    let mut tree = TreeNode::new_inner();
    for (seq_name, _) in rows.rows() {
        tree.add_child(TreeNode::new_leaf(seq_name.clone(), seq_name.clone()));
    }
    tree.upgma(|one: &String, another: &String| {
        let row_one = rows.row(one).expect("leaf names come from the rows");
        let row_another = rows.row(another).expect("leaf names come from the rows");
        let ours = row_block_oris(row_one, block_set);
        let in_both = row_block_oris(row_another, block_set)
            .intersection(&ours)
            .count();
        let this_size = row_one.fragments.len();
        let other_size = row_another.fragments.len();
        // +1 not to divide by 0.
        let total = this_size + other_size - in_both + 1;
        in_both as f64 / total as f64
    });
    tree
}

/// Replaces genome or sequence names in the leaves of `tree` by sequence
/// names of `rows`. Every leaf must resolve to exactly one row.
pub fn bsa_convert_tree(
    rows: &Bsa,
    block_set: &BlockSet,
    tree: &TreeNode<String>,
) -> Result<TreeNode<String>> {
    use std::collections::HashMap;
    let mut name2seq: HashMap<String, String> = HashMap::new();
    for (seq_name, _) in rows.rows() {
        let genome = block_set
            .seq_from_name(seq_name)
            .and_then(|seq| seq.genome().map(str::to_string));
        if let Some(genome) = genome {
            if name2seq.insert(genome.clone(), seq_name.clone()).is_some() {
                return Err(Error::DuplicateRowName(genome));
            }
        }
        if name2seq
            .insert(seq_name.clone(), seq_name.clone())
            .is_some()
        {
            return Err(Error::DuplicateRowName(seq_name.clone()));
        }
    }
    fn convert(
        node: &TreeNode<String>,
        name2seq: &std::collections::HashMap<String, String>,
    ) -> Result<TreeNode<String>> {
        if let Some(name) = node.leaf_name() {
            let seq_name = name2seq
                .get(name)
                .ok_or_else(|| Error::UnknownLeaf(name.to_string()))?;
            Ok(TreeNode::new_leaf(seq_name.clone(), seq_name.clone()))
        } else {
            let mut inner = TreeNode::new_inner();
            for child in node.children() {
                inner.add_child(convert(child, name2seq)?);
            }
            Ok(inner)
        }
    }
    convert(tree, &name2seq)
}

/// Aligns the rows following the guide tree: leaves become single-row
/// alignments, inner nodes merge their children progressively.
pub fn bsa_make_aln_by_tree(
    aln: &mut Bsa,
    rows: &Bsa,
    tree: &TreeNode<String>,
    block_set: &BlockSet,
    genomes: usize,
    scoring: &BsaScoring,
) -> Result<()> {
    let tree = bsa_convert_tree(rows, block_set, tree)?;
    fn build(
        aln: &mut Bsa,
        rows: &Bsa,
        node: &TreeNode<String>,
        block_set: &BlockSet,
        genomes: usize,
        scoring: &BsaScoring,
    ) -> Result<()> {
        if let Some(seq_name) = node.leaf_name() {
            let row = rows
                .row(seq_name)
                .ok_or_else(|| Error::UnknownLeaf(seq_name.to_string()))?;
            aln.insert_row(seq_name, row.clone());
            return Ok(());
        }
        let mut parts = Vec::new();
        for child in node.children() {
            let mut part = Bsa::new();
            build(&mut part, rows, child, block_set, genomes, scoring)?;
            parts.push(part);
        }
        bsa_make_aln(aln, &parts, block_set, genomes, scoring);
        Ok(())
    }
    build(aln, rows, &tree, block_set, genomes, scoring)
}

/// Drops columns in which every row is a gap.
pub fn bsa_remove_pure_gaps(aln: &mut Bsa) {
    let length = bsa_length(aln);
    let mut keep = vec![false; length];
    for (_, row) in aln.rows() {
        for (col, cell) in row.fragments.iter().enumerate() {
            if cell.is_some() {
                keep[col] = true;
            }
        }
    }
    for (_, row) in aln.rows_mut() {
        let mut col = 0;
        row.fragments.retain(|_| {
            let kept = keep[col];
            col += 1;
            kept
        });
    }
}

fn count_block_ori(
    aln: &Bsa,
    block_set: &BlockSet,
    col: usize,
    block: BlockId,
    ori: Ori,
) -> f64 {
    let mut result = 0.0;
    for (_, row) in aln.rows() {
        if let Some(fragment_ref) = row.fragments[col] {
            if fragment_ref.block == block {
                let fragment = block_set.fragment(fragment_ref);
                if row.ori.times(fragment.ori()) == ori {
                    result += 1.0;
                } else {
                    result += 0.5;
                }
            }
        }
    }
    result
}

/// Moves each fragment along the gap run surrounding it to the column where
/// most other rows hold the same block, repeating until nothing moves.
pub fn bsa_move_fragments(aln: &mut Bsa, block_set: &BlockSet) {
    let length = bsa_length(aln);
    let seq_names: Vec<String> = aln.seq_names().map(str::to_string).collect();
    let mut moved = true;
    while moved {
        moved = false;
        for seq_name in &seq_names {
            for col in 0..length {
                let (fragment_ref, ori) = {
                    let row = aln.row(seq_name).unwrap();
                    let Some(fragment_ref) = row.fragments[col] else {
                        continue;
                    };
                    let fragment = block_set.fragment(fragment_ref);
                    (fragment_ref, row.ori.times(fragment.ori()))
                };
                let block = fragment_ref.block;
                // The fragment itself was counted; subtract it.
                let here = count_block_ori(aln, block_set, col, block, ori) - 1.0;
                let mut best_score = here;
                let mut best_col = col;
                let row_cells: Vec<bool> = aln.row(seq_name).unwrap().fragments
                    [..]
                    .iter()
                    .map(Option::is_some)
                    .collect();
                for candidate in (0..col).rev() {
                    if row_cells[candidate] {
                        break;
                    }
                    let score = count_block_ori(aln, block_set, candidate, block, ori);
                    if score > best_score {
                        best_col = candidate;
                        best_score = score;
                    }
                }
                for candidate in col + 1..length {
                    if row_cells[candidate] {
                        break;
                    }
                    let score = count_block_ori(aln, block_set, candidate, block, ori);
                    if score > best_score {
                        best_col = candidate;
                        best_score = score;
                    }
                }
                if best_col != col {
                    let row = aln.row_mut(seq_name).unwrap();
                    row.fragments[best_col] = Some(fragment_ref);
                    row.fragments[col] = None;
                    moved = true;
                }
            }
        }
    }
}

/// Splits columns mixing several `(block, ori)` pairs with gaps into one
/// pure column per pair.
pub fn bsa_unwind(aln: &mut Bsa, block_set: &BlockSet) {
    let length = bsa_length(aln);
    let seq_names: Vec<String> = aln.seq_names().map(str::to_string).collect();
    let mut new_rows: Vec<Vec<Option<FragmentRef>>> = vec![Vec::new(); seq_names.len()];
    for col in 0..length {
        let mut pairs: BTreeSet<BlockOri> = BTreeSet::new();
        let mut gap = false;
        for seq_name in &seq_names {
            let row = aln.row(seq_name).unwrap();
            match row.fragments[col] {
                Some(fragment_ref) => {
                    let fragment = block_set.fragment(fragment_ref);
                    pairs.insert((fragment_ref.block, row.ori.times(fragment.ori())));
                }
                None => gap = true,
            }
        }
        if !gap || pairs.len() <= 1 {
            for (index, seq_name) in seq_names.iter().enumerate() {
                new_rows[index].push(aln.row(seq_name).unwrap().fragments[col]);
            }
        } else {
            for pair in &pairs {
                for (index, seq_name) in seq_names.iter().enumerate() {
                    let row = aln.row(seq_name).unwrap();
                    let cell = row.fragments[col].filter(|&fragment_ref| {
                        let fragment = block_set.fragment(fragment_ref);
                        (fragment_ref.block, row.ori.times(fragment.ori())) == *pair
                    });
                    new_rows[index].push(cell);
                }
            }
        }
    }
    for (index, seq_name) in seq_names.iter().enumerate() {
        aln.row_mut(seq_name).unwrap().fragments = std::mem::take(&mut new_rows[index]);
    }
}

fn apply_shift(aln: &mut Bsa, shift: usize) {
    let length = bsa_length(aln);
    assert!(shift < length.max(1));
    for (_, row) in aln.rows_mut() {
        row.fragments.rotate_left(shift);
    }
}

fn column_size(aln: &Bsa, col: usize) -> usize {
    aln.rows()
        .filter(|(_, row)| row.fragments[col].is_some())
        .count()
}

fn column_seqs<'a>(aln: &'a Bsa, col: usize) -> impl Iterator<Item = &'a str> {
    aln.rows().filter_map(move |(seq_name, row)| {
        row.fragments[col].map(|_| seq_name.as_str())
    })
}

/// Reorders columns greedily: a fully occupied column is rotated to the
/// front when one exists, then the densest column not shadowing an already
/// used sequence is appended repeatedly, so each sequence's columns stay
/// contiguous.
pub fn bsa_move_columns(aln: &mut Bsa) {
    let size = aln.size();
    let length = bsa_length(aln);
    for col in 0..length {
        if column_size(aln, col) == size {
            apply_shift(aln, col);
            break;
        }
    }
    let mut columns: BTreeSet<usize> = (0..length).collect();
    let mut order: Vec<usize> = Vec::with_capacity(length);
    while !columns.is_empty() {
        let mut occupied: BTreeSet<&str> = BTreeSet::new();
        let mut best_col = None;
        let mut best_score = 0;
        for &col in &columns {
            let shadowed = column_seqs(aln, col).any(|seq_name| occupied.contains(seq_name));
            if !shadowed {
                let score = column_size(aln, col);
                if best_col.is_none() || score > best_score {
                    best_col = Some(col);
                    best_score = score;
                }
            }
            occupied.extend(column_seqs(aln, col));
        }
        let best_col = best_col.expect("an unshadowed column always exists");
        order.push(best_col);
        columns.remove(&best_col);
    }
    for (_, row) in aln.rows_mut() {
        row.fragments = order.iter().map(|&col| row.fragments[col]).collect();
    }
}

/// Chooses the orientation of the alignment by majority of row
/// orientations; on an all-circular alignment additionally rotates it so
/// that the sum of row-boundary column indices is minimal.
///
/// Row boundaries are taken from the index of the block set: a cell is a
/// boundary if its fragment starts (or, on an inverted row, ends) its
/// sequence.
pub fn bsa_orient(aln: &mut Bsa, block_set: &BlockSet) {
    let (mut direct, mut inverse) = (0usize, 0usize);
    for (_, row) in aln.rows() {
        match row.ori {
            Ori::Forward => direct += 1,
            Ori::Reverse => inverse += 1,
        }
    }
    if inverse > direct {
        bsa_inverse(aln);
    }
    if bsa_is_circular(aln, block_set) {
        find_best_shift(aln, block_set);
    }
}

fn find_best_shift(aln: &mut Bsa, block_set: &BlockSet) {
    let mut index = SetFc::new();
    index.set_cycles_allowed(false);
    index.add_bs(block_set);
    let mut starts = Vec::new();
    for (_, row) in aln.rows() {
        for (col, cell) in row.fragments.iter().enumerate() {
            let Some(fragment_ref) = cell else { continue };
            let fragment = block_set.fragment(*fragment_ref);
            let prev = index.prev(fragment).is_some();
            let next = index.next(fragment).is_some();
            if !prev && !next {
                // A lone fragment gives no boundary information.
                return;
            }
            let end_ori = if !prev {
                Ori::Reverse
            } else if !next {
                Ori::Forward
            } else {
                continue;
            };
            if end_ori.times(row.ori) == Ori::Reverse {
                starts.push(col);
            }
        }
    }
    let length = bsa_length(aln);
    if length == 0 {
        return;
    }
    let sum_of_starts = |shift: usize| -> usize {
        starts
            .iter()
            .map(|&start| (start + length - shift) % length)
            .sum()
    };
    let mut best_shift = 0;
    let mut best_sum = sum_of_starts(0);
    for &shift in &starts {
        let this_sum = sum_of_starts(shift);
        if this_sum < best_sum {
            best_shift = shift;
            best_sum = this_sum;
        }
    }
    apply_shift(aln, best_shift);
}

/// Replaces fragments of non-stem blocks with gaps.
pub fn bsa_filter_exact_stem(aln: &mut Bsa, block_set: &BlockSet, genomes: usize) {
    for (_, row) in aln.rows_mut() {
        for cell in &mut row.fragments {
            if let Some(fragment_ref) = *cell {
                if !is_exact_stem(block_set.block(fragment_ref.block), genomes) {
                    *cell = None;
                }
            }
        }
    }
}

/// Replaces fragments of blocks shorter than `min_length` with gaps.
pub fn bsa_filter_long(aln: &mut Bsa, block_set: &BlockSet, min_length: usize) {
    for (_, row) in aln.rows_mut() {
        for cell in &mut row.fragments {
            if let Some(fragment_ref) = *cell {
                if block_set.block(fragment_ref.block).alignment_length() < min_length {
                    *cell = None;
                }
            }
        }
    }
}
