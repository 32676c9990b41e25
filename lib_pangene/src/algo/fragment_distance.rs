//! Distance between two gapped rows of one block.

use crate::error::{Error, Result};
use crate::model::Fragment;

/// Mismatch count over comparable columns.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Distance {
    /// Substitutions plus gap openings.
    pub penalty: usize,
    /// Columns where at least one of the rows has a letter.
    pub total: usize,
}

impl Distance {
    pub fn ratio(&self) -> f64 {
        self.penalty as f64 / self.total as f64
    }
}

/// Column-wise distance of two fragments aligned in one block.
///
/// A run of gaps counts as one penalty however long it is; `N` never
/// matches anything, itself included. Both fragments must carry rows of
/// equal length.
pub fn fragment_distance(one: &Fragment, another: &Fragment) -> Result<Distance> {
    let row_one = one.row().ok_or(Error::NoRow)?;
    let row_another = another.row().ok_or(Error::NoRow)?;
    if row_one.length() != row_another.length() {
        return Err(Error::RowLengthMismatch);
    }
    let mut distance = Distance::default();
    let mut one_gaps = false;
    let mut another_gaps = false;
    for col in 0..row_one.length() {
        let pos_one = row_one.map_to_fragment(col);
        let pos_another = row_another.map_to_fragment(col);
        if pos_one.is_none() && pos_another.is_none() {
            continue;
        }
        distance.total += 1;
        match pos_one {
            None => {
                if !one_gaps {
                    one_gaps = true;
                    distance.penalty += 1;
                }
            }
            Some(_) => one_gaps = false,
        }
        match pos_another {
            None => {
                if !another_gaps {
                    another_gaps = true;
                    distance.penalty += 1;
                }
            }
            Some(_) => another_gaps = false,
        }
        if let (Some(pos_one), Some(pos_another)) = (pos_one, pos_another) {
            let a = one.raw_at(pos_one as i64);
            let b = another.raw_at(pos_another as i64);
            if a != b || a == b'N' {
                distance.penalty += 1;
            }
        }
    }
    Ok(distance)
}
