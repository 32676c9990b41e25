use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::model::{BlockSet, FragmentRef, Ori};

/// One row of a block-set alignment: the orientation of the row relative to
/// its sequence and one cell per alignment column, either a fragment
/// reference or a gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BsaRow {
    pub ori: Ori,
    pub fragments: Vec<Option<FragmentRef>>,
}

impl Default for BsaRow {
    fn default() -> Self {
        Self {
            ori: Ori::Forward,
            fragments: Vec::new(),
        }
    }
}

/// A block-set alignment: a column-aligned table whose rows are sequences
/// (keyed by name, deterministically ordered) and whose cells are fragments
/// or gaps.
///
/// The alignment references fragments owned by blocks of the same block
/// set; mutating those blocks invalidates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bsa {
    rows: BTreeMap<String, BsaRow>,
}

impl Bsa {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, seq_name: &str) -> Option<&BsaRow> {
        self.rows.get(seq_name)
    }

    pub fn row_mut(&mut self, seq_name: &str) -> Option<&mut BsaRow> {
        self.rows.get_mut(seq_name)
    }

    /// The row of `seq_name`, created empty if absent.
    pub fn row_entry(&mut self, seq_name: &str) -> &mut BsaRow {
        self.rows.entry(seq_name.to_string()).or_default()
    }

    pub fn insert_row(&mut self, seq_name: impl Into<String>, row: BsaRow) {
        self.rows.insert(seq_name.into(), row);
    }

    pub fn remove_row(&mut self, seq_name: &str) -> Option<BsaRow> {
        self.rows.remove(seq_name)
    }

    /// Rows in sequence-name order.
    pub fn rows(&self) -> btree_map::Iter<'_, String, BsaRow> {
        self.rows.iter()
    }

    pub fn rows_mut(&mut self) -> btree_map::IterMut<'_, String, BsaRow> {
        self.rows.iter_mut()
    }

    pub fn seq_names(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// The common length of the alignment's rows.
pub fn bsa_length(bsa: &Bsa) -> usize {
    let length = bsa
        .rows()
        .next()
        .map_or(0, |(_, row)| row.fragments.len());
    debug_assert!(
        bsa.rows().all(|(_, row)| row.fragments.len() == length),
        "rows of one alignment must share the length"
    );
    length
}

/// Whether every row's sequence is circular.
pub fn bsa_is_circular(bsa: &Bsa, block_set: &BlockSet) -> bool {
    !bsa.is_empty()
        && bsa.seq_names().all(|name| {
            block_set
                .seq_from_name(name)
                .map(|seq| seq.circular().unwrap_or(false))
                .unwrap_or(false)
        })
}
