use std::io::{BufRead, Write};

use crate::algo::bsa_algo::bsa_make_rows;
use crate::error::{Error, Result};
use crate::model::{BlockSet, Bsa, BsaRow, FragmentRef, Ori};

#[cfg(test)]
mod tests;

fn cell_token(block_set: &BlockSet, fragment_ref: FragmentRef, blocks: bool) -> String {
    if blocks {
        block_set.block(fragment_ref.block).name().to_string()
    } else {
        block_set.fragment(fragment_ref).id()
    }
}

/// Prints the alignment, one tab-separated line per row: the alignment
/// name, the signed sequence name, then one token per column — `-` for a
/// gap, otherwise the fragment id (or the block name with `blocks`),
/// suffixed by ` >` or ` <` when `orientation` is set.
pub fn bsa_print(
    out: &mut impl Write,
    aln: &Bsa,
    block_set: &BlockSet,
    name: &str,
    blocks: bool,
    orientation: bool,
) -> Result<()> {
    for (seq_name, row) in aln.rows() {
        write!(out, "{name}\t")?;
        let sign = match row.ori {
            Ori::Forward => '+',
            Ori::Reverse => '-',
        };
        write!(out, "{sign}{seq_name}")?;
        for cell in &row.fragments {
            write!(out, "\t")?;
            match cell {
                Some(fragment_ref) => {
                    write!(out, "{}", cell_token(block_set, *fragment_ref, blocks))?;
                    if orientation {
                        let fragment = block_set.fragment(*fragment_ref);
                        let ori = row.ori.times(fragment.ori());
                        write!(out, " {}", if ori == Ori::Forward { '>' } else { '<' })?;
                    }
                }
                None => write!(out, "-")?,
            }
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Prints the `conservative` pseudo-row: per column, the block shared by
/// every row of the alignment in one orientation, or `-`.
pub fn bsa_print_conservative(
    out: &mut impl Write,
    aln: &Bsa,
    block_set: &BlockSet,
    name: &str,
) -> Result<()> {
    let Some((_, first_row)) = aln.rows().next() else {
        return Ok(());
    };
    write!(out, "#{name}\tconservative")?;
    let cell_of = |row: &BsaRow, col: usize| {
        row.fragments[col].map(|fragment_ref| {
            let fragment = block_set.fragment(fragment_ref);
            (fragment_ref.block, row.ori.times(fragment.ori()))
        })
    };
    let length = first_row.fragments.len();
    for col in 0..length {
        let mut common = cell_of(first_row, col);
        for (_, row) in aln.rows() {
            if cell_of(row, col) != common {
                common = None;
            }
        }
        write!(out, "\t")?;
        match common {
            Some((block, ori)) => {
                write!(
                    out,
                    "{} {}",
                    block_set.block(block).name(),
                    if ori == Ori::Forward { '>' } else { '<' }
                )?;
            }
            None => write!(out, "-")?,
        }
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn strip_orientation(token: &str) -> &str {
    token
        .strip_suffix(" >")
        .or_else(|| token.strip_suffix(" <"))
        .unwrap_or(token)
}

// Whether the cells match the sequence's fragments starting at `shift`,
// consuming every fragment exactly once.
fn match_parts(
    block_set: &BlockSet,
    originals: &[FragmentRef],
    cells: &[&str],
    shift: usize,
) -> bool {
    let mut orig_index = shift;
    for &cell in cells {
        if cell == "-" {
            continue;
        }
        let fragment_ref = originals[orig_index % originals.len()];
        let id = block_set.fragment(fragment_ref).id();
        let block_name = block_set.block(fragment_ref.block).name();
        if id != cell && block_name != cell {
            return false;
        }
        orig_index += 1;
    }
    // Every fragment of the sequence must be consumed exactly once.
    orig_index == shift + originals.len()
}

fn read_parts(
    originals: &[FragmentRef],
    cells: &[&str],
    shift: usize,
) -> Vec<Option<FragmentRef>> {
    let mut orig_index = shift;
    cells
        .iter()
        .map(|&cell| {
            if cell == "-" {
                None
            } else {
                let fragment_ref = originals[orig_index % originals.len()];
                orig_index += 1;
                Some(fragment_ref)
            }
        })
        .collect()
}

/// Reads alignments in the [`bsa_print`] text format back, storing them
/// under their names in the block set.
///
/// Tokens are matched against the sequence's fragments in position order;
/// on circular sequences every rotation is tried and the matching one is
/// used.
pub fn bsa_input(block_set: &mut BlockSet, input: impl BufRead) -> Result<()> {
    let mut rows = Bsa::new();
    bsa_make_rows(&mut rows, block_set);
    let mut parsed: Vec<(String, String, BsaRow)> = Vec::new();
    for line in input.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 3 {
            continue;
        }
        let name = parts[0];
        let ori_seq = parts[1];
        let cells: Vec<&str> = parts[2..].iter().map(|part| strip_orientation(part)).collect();
        let (ori, seq_name) = if let Some(rest) = ori_seq.strip_prefix('+') {
            (Ori::Forward, rest)
        } else if let Some(rest) = ori_seq.strip_prefix('-') {
            (Ori::Reverse, rest)
        } else {
            return Err(Error::malformed("alignment row", ori_seq));
        };
        let seq = block_set
            .seq_from_name(seq_name)
            .ok_or_else(|| Error::malformed("alignment row", seq_name))?
            .clone();
        let row = rows
            .row(seq_name)
            .ok_or_else(|| Error::malformed("alignment row", seq_name))?;
        let mut originals: Vec<FragmentRef> = row
            .fragments
            .iter()
            .map(|cell| cell.expect("trivial rows have no gaps"))
            .collect();
        if ori == Ori::Reverse {
            originals.reverse();
        }
        if originals.is_empty() {
            return Err(Error::RowMismatch {
                seq: seq_name.to_string(),
            });
        }
        let shifts: Vec<usize> = if seq.circular().unwrap_or(false) {
            (0..originals.len()).collect()
        } else {
            vec![0]
        };
        let shift = shifts
            .into_iter()
            .find(|&shift| match_parts(block_set, &originals, &cells, shift))
            .ok_or_else(|| Error::RowMismatch {
                seq: seq_name.to_string(),
            })?;
        let fragments = read_parts(&originals, &cells, shift);
        parsed.push((
            name.to_string(),
            seq_name.to_string(),
            BsaRow { ori, fragments },
        ));
    }
    for (name, seq_name, row) in parsed {
        block_set.bsa_entry(&name).insert_row(seq_name, row);
    }
    Ok(())
}
