use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::model::{Block, BlockId, BlockSet, Fragment, FragmentRef, Ori};


/// A fragment as stored by the index: coordinates on its sequence plus an
/// optional reference back to the owning block.
///
/// Ordering and equality consider the coordinates only (`min_pos`, then
/// `max_pos`, then `ori`), matching the per-sequence sort order of the
/// index; the reference tags along.
#[derive(Debug, Clone)]
pub struct PlacedFragment {
    pub min_pos: usize,
    pub max_pos: usize,
    pub ori: Ori,
    pub fragment: Option<FragmentRef>,
}

impl PlacedFragment {
    pub fn from_fragment(fragment: &Fragment, fragment_ref: Option<FragmentRef>) -> Self {
        Self {
            min_pos: fragment.min_pos(),
            max_pos: fragment.max_pos(),
            ori: fragment.ori(),
            fragment: fragment_ref,
        }
    }

    pub fn length(&self) -> usize {
        self.max_pos - self.min_pos + 1
    }

    /// Number of positions shared with `[min_pos, max_pos]`.
    pub fn common_positions(&self, min_pos: usize, max_pos: usize) -> usize {
        let max_min = self.min_pos.max(min_pos);
        let min_max = self.max_pos.min(max_pos);
        if max_min <= min_max {
            min_max - max_min + 1
        } else {
            0
        }
    }
}

impl PartialEq for PlacedFragment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PlacedFragment {}

impl PartialOrd for PlacedFragment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlacedFragment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.min_pos
            .cmp(&other.min_pos)
            .then(self.max_pos.cmp(&other.max_pos))
            .then(self.ori.cmp(&other.ori))
    }
}

/// Per-sequence storage of a [`FragmentCollection`].
pub trait FragmentContainer: Default {
    fn insert(&mut self, fragment: PlacedFragment);
    fn remove(&mut self, fragment: &PlacedFragment);
    /// Sorts the container. Needed after inserts for [`SortedVec`]; a no-op
    /// for [`SortedSet`].
    fn prepare(&mut self) {}
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn first(&self) -> Option<&PlacedFragment>;
    fn last(&self) -> Option<&PlacedFragment>;
    fn contains(&self, fragment: &PlacedFragment) -> bool;
    /// Ascending iteration over all entries.
    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a PlacedFragment> + 'a>;
    /// Ascending iteration from the first entry `>= fragment`.
    fn iter_from<'a>(
        &'a self,
        fragment: &PlacedFragment,
    ) -> Box<dyn Iterator<Item = &'a PlacedFragment> + 'a>;
    /// Descending iteration from the last entry `< fragment`.
    fn iter_before<'a>(
        &'a self,
        fragment: &PlacedFragment,
    ) -> Box<dyn Iterator<Item = &'a PlacedFragment> + 'a>;
    /// The first entry strictly greater than `fragment`.
    fn next_after(&self, fragment: &PlacedFragment) -> Option<&PlacedFragment>;
    /// The last entry strictly less than `fragment`.
    fn prev_before(&self, fragment: &PlacedFragment) -> Option<&PlacedFragment>;
}

/// Vector storage: cheap inserts, requires an explicit
/// [`FragmentContainer::prepare`] before queries.
#[derive(Debug, Clone, Default)]
pub struct SortedVec(Vec<PlacedFragment>);

impl FragmentContainer for SortedVec {
    fn insert(&mut self, fragment: PlacedFragment) {
        self.0.push(fragment);
    }

    fn remove(&mut self, fragment: &PlacedFragment) {
        self.0.retain(|f| f != fragment);
    }

    fn prepare(&mut self) {
        self.0.sort();
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn first(&self) -> Option<&PlacedFragment> {
        self.0.first()
    }

    fn last(&self) -> Option<&PlacedFragment> {
        self.0.last()
    }

    fn contains(&self, fragment: &PlacedFragment) -> bool {
        self.0.binary_search(fragment).is_ok()
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a PlacedFragment> + 'a> {
        Box::new(self.0.iter())
    }

    fn iter_from<'a>(
        &'a self,
        fragment: &PlacedFragment,
    ) -> Box<dyn Iterator<Item = &'a PlacedFragment> + 'a> {
        let start = self.0.partition_point(|f| f < fragment);
        Box::new(self.0[start..].iter())
    }

    fn iter_before<'a>(
        &'a self,
        fragment: &PlacedFragment,
    ) -> Box<dyn Iterator<Item = &'a PlacedFragment> + 'a> {
        let start = self.0.partition_point(|f| f < fragment);
        Box::new(self.0[..start].iter().rev())
    }

    fn next_after(&self, fragment: &PlacedFragment) -> Option<&PlacedFragment> {
        let start = self.0.partition_point(|f| f <= fragment);
        self.0.get(start)
    }

    fn prev_before(&self, fragment: &PlacedFragment) -> Option<&PlacedFragment> {
        let start = self.0.partition_point(|f| f < fragment);
        start.checked_sub(1).map(|index| &self.0[index])
    }
}

/// Set storage: self-maintaining, no `prepare` needed; a coordinate triple
/// occurs at most once per sequence.
#[derive(Debug, Clone, Default)]
pub struct SortedSet(BTreeSet<PlacedFragment>);

impl FragmentContainer for SortedSet {
    fn insert(&mut self, fragment: PlacedFragment) {
        self.0.insert(fragment);
    }

    fn remove(&mut self, fragment: &PlacedFragment) {
        self.0.remove(fragment);
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn first(&self) -> Option<&PlacedFragment> {
        self.0.first()
    }

    fn last(&self) -> Option<&PlacedFragment> {
        self.0.last()
    }

    fn contains(&self, fragment: &PlacedFragment) -> bool {
        self.0.contains(fragment)
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a PlacedFragment> + 'a> {
        Box::new(self.0.iter())
    }

    fn iter_from<'a>(
        &'a self,
        fragment: &PlacedFragment,
    ) -> Box<dyn Iterator<Item = &'a PlacedFragment> + 'a> {
        Box::new(self.0.range(fragment.clone()..))
    }

    fn iter_before<'a>(
        &'a self,
        fragment: &PlacedFragment,
    ) -> Box<dyn Iterator<Item = &'a PlacedFragment> + 'a> {
        Box::new(self.0.range(..fragment.clone()).rev())
    }

    fn next_after(&self, fragment: &PlacedFragment) -> Option<&PlacedFragment> {
        self.0
            .range((Bound::Excluded(fragment.clone()), Bound::Unbounded))
            .next()
    }

    fn prev_before(&self, fragment: &PlacedFragment) -> Option<&PlacedFragment> {
        self.0.range(..fragment.clone()).next_back()
    }
}

/// The per-sequence sorted fragment index.
///
/// Entries are sorted by `(min_pos, max_pos, ori)` per sequence, so a
/// binary search on `min_pos` plus a bounded scan answers overlap queries,
/// and plain sorted-order traversal answers neighbour queries. On circular
/// sequences traversal wraps around when [`cycles_allowed`] is set.
///
/// [`cycles_allowed`]: FragmentCollection::cycles_allowed
#[derive(Debug, Clone)]
pub struct FragmentCollection<C> {
    data: BTreeMap<String, C>,
    cycles_allowed: bool,
}

/// Index over a sorted vector; call [`FragmentCollection::prepare`] after
/// the last insert.
pub type VectorFc = FragmentCollection<SortedVec>;

/// Self-maintaining index over sorted sets.
pub type SetFc = FragmentCollection<SortedSet>;

impl<C: FragmentContainer> Default for FragmentCollection<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: FragmentContainer> FragmentCollection<C> {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            cycles_allowed: true,
        }
    }

    /// Whether neighbour traversal wraps on circular sequences.
    pub fn cycles_allowed(&self) -> bool {
        self.cycles_allowed
    }

    pub fn set_cycles_allowed(&mut self, cycles_allowed: bool) {
        self.cycles_allowed = cycles_allowed;
    }

    pub fn add_fragment(&mut self, fragment: &Fragment, fragment_ref: Option<FragmentRef>) {
        self.data
            .entry(fragment.seq_name().to_string())
            .or_default()
            .insert(PlacedFragment::from_fragment(fragment, fragment_ref));
    }

    /// Removes a fragment with the coordinates of `fragment`. Does nothing
    /// if no such entry is indexed.
    pub fn remove_fragment(&mut self, fragment: &Fragment) {
        if let Some(container) = self.data.get_mut(fragment.seq_name()) {
            container.remove(&PlacedFragment::from_fragment(fragment, None));
        }
    }

    pub fn add_block(&mut self, id: BlockId, block: &Block) {
        for (index, fragment) in block.fragments().enumerate() {
            self.add_fragment(fragment, Some(FragmentRef { block: id, index }));
        }
    }

    pub fn remove_block(&mut self, block: &Block) {
        for fragment in block.fragments() {
            self.remove_fragment(fragment);
        }
    }

    pub fn add_bs(&mut self, block_set: &BlockSet) {
        for (id, block) in block_set.blocks() {
            self.add_block(id, block);
        }
    }

    pub fn remove_bs(&mut self, block_set: &BlockSet) {
        for (_, block) in block_set.blocks() {
            self.remove_block(block);
        }
    }

    /// Sorts the per-sequence containers. Required for [`VectorFc`] after
    /// inserts; a no-op for [`SetFc`].
    pub fn prepare(&mut self) {
        for container in self.data.values_mut() {
            container.prepare();
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Sequence names with at least one indexed fragment.
    pub fn seqs(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn has_seq(&self, seq_name: &str) -> bool {
        self.data.contains_key(seq_name)
    }

    /// The container of one sequence, if any fragment of it is indexed.
    pub fn fragments_of(&self, seq_name: &str) -> Option<&C> {
        self.data.get(seq_name)
    }

    /// Whether any indexed fragment of the same sequence shares a position
    /// with `fragment`.
    pub fn has_overlap(&self, fragment: &Fragment) -> bool {
        let Some(container) = self.data.get(fragment.seq_name()) else {
            return false;
        };
        let query = PlacedFragment::from_fragment(fragment, None);
        if let Some(found) = container.iter_from(&query).next() {
            if found.common_positions(fragment.min_pos(), fragment.max_pos()) > 0 {
                return true;
            }
        }
        if let Some(found) = container.iter_before(&query).next() {
            if found.common_positions(fragment.min_pos(), fragment.max_pos()) > 0 {
                return true;
            }
        }
        false
    }

    pub fn block_has_overlap(&self, block: &Block) -> bool {
        block.fragments().any(|fragment| self.has_overlap(fragment))
    }

    pub fn bs_has_overlap(&self, block_set: &BlockSet) -> bool {
        block_set
            .blocks()
            .any(|(_, block)| self.block_has_overlap(block))
    }

    /// Appends to `out` every indexed fragment overlapping `fragment`.
    pub fn find_overlap_fragments(&self, out: &mut Vec<PlacedFragment>, fragment: &Fragment) {
        let Some(container) = self.data.get(fragment.seq_name()) else {
            return;
        };
        let query = PlacedFragment::from_fragment(fragment, None);
        // Entries right of the query start after it; once one starts past
        // the query's end, no later entry can overlap.
        for found in container.iter_from(&query) {
            if found.min_pos > fragment.max_pos() {
                break;
            }
            if found.common_positions(fragment.min_pos(), fragment.max_pos()) > 0 {
                out.push(found.clone());
            }
        }
        // Entries left of the query may still span it, so the backward
        // scan checks everything up to the sequence start.
        for found in container.iter_before(&query) {
            if found.common_positions(fragment.min_pos(), fragment.max_pos()) > 0 {
                out.push(found.clone());
            }
        }
    }

    /// Like [`find_overlap_fragments`], but appends the intersected
    /// intervals, keeping the orientation of the indexed fragment.
    ///
    /// [`find_overlap_fragments`]: FragmentCollection::find_overlap_fragments
    pub fn find_overlaps(&self, out: &mut Vec<PlacedFragment>, fragment: &Fragment) {
        let mut found = Vec::new();
        self.find_overlap_fragments(&mut found, fragment);
        for f in found {
            out.push(PlacedFragment {
                min_pos: f.min_pos.max(fragment.min_pos()),
                max_pos: f.max_pos.min(fragment.max_pos()),
                ori: f.ori,
                fragment: f.fragment,
            });
        }
    }

    fn seq_cycles(&self, fragment: &Fragment) -> bool {
        self.cycles_allowed && fragment.seq().circular().unwrap_or(false)
    }

    /// The fragment after `fragment` in the per-sequence order, or `None`
    /// if `fragment` is not indexed or ends the sequence of a non-wrapping
    /// traversal.
    pub fn next(&self, fragment: &Fragment) -> Option<&PlacedFragment> {
        let container = self.data.get(fragment.seq_name())?;
        let query = PlacedFragment::from_fragment(fragment, None);
        if !container.contains(&query) {
            return None;
        }
        match container.next_after(&query) {
            Some(next) => Some(next),
            None if self.seq_cycles(fragment) => container.first(),
            None => None,
        }
    }

    /// The fragment before `fragment`, wrapping like [`next`].
    ///
    /// [`next`]: FragmentCollection::next
    pub fn prev(&self, fragment: &Fragment) -> Option<&PlacedFragment> {
        let container = self.data.get(fragment.seq_name())?;
        let query = PlacedFragment::from_fragment(fragment, None);
        if !container.contains(&query) {
            return None;
        }
        match container.prev_before(&query) {
            Some(prev) => Some(prev),
            None if self.seq_cycles(fragment) => container.last(),
            None => None,
        }
    }

    /// [`next`] for `Ori::Forward`, [`prev`] for `Ori::Reverse`.
    ///
    /// [`next`]: FragmentCollection::next
    /// [`prev`]: FragmentCollection::prev
    pub fn neighbor(&self, fragment: &Fragment, ori: Ori) -> Option<&PlacedFragment> {
        match ori {
            Ori::Forward => self.next(fragment),
            Ori::Reverse => self.prev(fragment),
        }
    }

    /// Neighbour in the fragment's own reading direction.
    pub fn logical_neighbor(&self, fragment: &Fragment, ori: Ori) -> Option<&PlacedFragment> {
        self.neighbor(fragment, fragment.ori().times(ori))
    }

    /// `1` if `second` follows `first`, `-1` if it precedes it, `0`
    /// otherwise.
    pub fn are_neighbors(&self, first: &Fragment, second: &Fragment) -> i32 {
        let second_key = PlacedFragment::from_fragment(second, None);
        if self.next(first) == Some(&second_key) {
            1
        } else if self.prev(first) == Some(&second_key) {
            -1
        } else {
            0
        }
    }

    /// The neighbour of `first` on the side away from `second`, which must
    /// be a neighbour of `first`.
    pub fn another_neighbor(&self, first: &Fragment, second: &Fragment) -> Option<&PlacedFragment> {
        match self.are_neighbors(first, second) {
            1 => self.prev(first),
            -1 => self.next(first),
            _ => None,
        }
    }
}
