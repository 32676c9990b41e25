//! Distance trees: UPGMA, neighbor joining, branch tables and newick
//! output.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::io::Write;

use crate::error::Result;

#[cfg(test)]
mod tests;

/// How bootstrap values are printed by [`TreeNode::print_newick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStyle {
    /// Bootstrap values are omitted.
    None,
    /// `(a,b)[95]:0.3` — in square braces before the length.
    InBraces,
    /// `(a,b)95:0.3` — as the internal node label.
    BeforeLength,
}

/// A node of a rooted tree. Inner nodes own their children; leaves carry a
/// display name and a caller-defined payload.
#[derive(Debug, Clone)]
pub struct TreeNode<L> {
    children: Vec<TreeNode<L>>,
    length: f64,
    bootstrap: f64,
    leaf: Option<(String, L)>,
}

impl<L> Default for TreeNode<L> {
    fn default() -> Self {
        Self::new_inner()
    }
}

impl<L> TreeNode<L> {
    pub fn new_inner() -> Self {
        Self {
            children: Vec::new(),
            length: 0.0,
            bootstrap: -1.0,
            leaf: None,
        }
    }

    pub fn new_leaf(name: impl Into<String>, payload: L) -> Self {
        Self {
            children: Vec::new(),
            length: 0.0,
            bootstrap: -1.0,
            leaf: Some((name.into(), payload)),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    pub fn leaf_name(&self) -> Option<&str> {
        self.leaf.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn payload(&self) -> Option<&L> {
        self.leaf.as_ref().map(|(_, payload)| payload)
    }

    /// Branch length towards the parent.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn set_length(&mut self, length: f64) {
        self.length = length;
    }

    /// Bootstrap value in `0..=100`, `-1` if absent.
    pub fn bootstrap(&self) -> f64 {
        self.bootstrap
    }

    pub fn set_bootstrap(&mut self, bootstrap: f64) {
        self.bootstrap = bootstrap;
    }

    pub fn children(&self) -> &[TreeNode<L>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [TreeNode<L>] {
        &mut self.children
    }

    pub fn add_child(&mut self, child: TreeNode<L>) {
        self.children.push(child);
    }

    pub fn detach_child(&mut self, index: usize) -> TreeNode<L> {
        self.children.remove(index)
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// All leaves of the subtree, in traversal order.
    pub fn all_leafs(&self) -> Vec<&TreeNode<L>> {
        let mut leafs = Vec::new();
        self.collect_leafs(&mut leafs);
        leafs
    }

    fn collect_leafs<'a>(&'a self, leafs: &mut Vec<&'a TreeNode<L>>) {
        for child in &self.children {
            if child.is_leaf() {
                leafs.push(child);
            }
            child.collect_leafs(leafs);
        }
    }

    /// Number of descendant nodes, leaves included.
    pub fn all_descendants(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.all_descendants())
            .sum()
    }

    // Branch lengths from this node down to the named leaf, or None.
    fn path_to_leaf(&self, name: &str) -> Option<Vec<f64>> {
        if self.leaf_name() == Some(name) {
            return Some(Vec::new());
        }
        for child in &self.children {
            if let Some(mut path) = child.path_to_leaf(name) {
                path.push(child.length);
                return Some(path);
            }
        }
        None
    }

    /// Sum of branch lengths on the path between two leaves of this tree;
    /// negative if either leaf is missing.
    pub fn tree_distance(&self, one: &str, another: &str) -> f64 {
        fn walk<L>(node: &TreeNode<L>, one: &str, another: &str) -> WalkOutcome {
            // Distance is accumulated at the lowest common ancestor.
            let mut outcome = WalkOutcome::default();
            if node.leaf_name() == Some(one) {
                outcome.to_one = Some(0.0);
            }
            if node.leaf_name() == Some(another) {
                outcome.to_another = Some(0.0);
            }
            for child in node.children() {
                let inner = walk(child, one, another);
                if let Some(found) = inner.found {
                    outcome.found = Some(found);
                    return outcome;
                }
                if let Some(d) = inner.to_one {
                    outcome.to_one = Some(d + child.length);
                }
                if let Some(d) = inner.to_another {
                    outcome.to_another = Some(d + child.length);
                }
            }
            if let (Some(a), Some(b)) = (outcome.to_one, outcome.to_another) {
                outcome.found = Some(a + b);
            }
            outcome
        }

        #[derive(Default)]
        struct WalkOutcome {
            to_one: Option<f64>,
            to_another: Option<f64>,
            found: Option<f64>,
        }

        if one == another {
            return if self.path_to_leaf(one).is_some() {
                0.0
            } else {
                -1000.0
            };
        }
        walk(self, one, another).found.unwrap_or(-1000.0)
    }

    /// Prints the subtree in newick format, terminated by `;`.
    pub fn print_newick(
        &self,
        out: &mut (impl Write + ?Sized),
        lengths: bool,
        bootstrap_style: BootstrapStyle,
    ) -> Result<()> {
        self.print_newick_node(out, lengths, bootstrap_style, true)?;
        write!(out, ";")?;
        Ok(())
    }

    /// The newick string of the subtree.
    pub fn newick(&self, lengths: bool, bootstrap_style: BootstrapStyle) -> String {
        let mut out = Vec::new();
        self.print_newick(&mut out, lengths, bootstrap_style)
            .expect("writing to a vector cannot fail");
        String::from_utf8(out).expect("newick output is ascii")
    }

    fn print_newick_node(
        &self,
        out: &mut (impl Write + ?Sized),
        lengths: bool,
        bootstrap_style: BootstrapStyle,
        is_root: bool,
    ) -> Result<()> {
        if let Some(name) = self.leaf_name() {
            write!(out, "{name}")?;
        } else {
            write!(out, "(")?;
            for (index, child) in self.children.iter().enumerate() {
                if index > 0 {
                    write!(out, ",")?;
                }
                child.print_newick_node(out, lengths, bootstrap_style, false)?;
            }
            write!(out, ")")?;
            if self.bootstrap >= 0.0 {
                match bootstrap_style {
                    BootstrapStyle::None => {}
                    BootstrapStyle::InBraces => write!(out, "[{}]", self.bootstrap)?,
                    BootstrapStyle::BeforeLength => write!(out, "{}", self.bootstrap)?,
                }
            }
        }
        if lengths && !is_root {
            write!(out, ":{}", self.length)?;
        }
        Ok(())
    }
}

// Indexed distance store of the clustering loops. Missing pairs read as 0,
// like the map the algorithms were first written against.
struct Distances(HashMap<(usize, usize), f64>);

impl Distances {
    fn key(a: usize, b: usize) -> (usize, usize) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn get(&self, a: usize, b: usize) -> f64 {
        self.0.get(&Self::key(a, b)).copied().unwrap_or(0.0)
    }

    fn set(&mut self, a: usize, b: usize, value: f64) {
        self.0.insert(Self::key(a, b), value);
    }

    fn remove(&mut self, a: usize, b: usize) {
        self.0.remove(&Self::key(a, b));
    }
}

struct Clustering<L> {
    nodes: Vec<Option<TreeNode<L>>>,
    active: Vec<usize>,
    distances: Distances,
}

impl<L> Clustering<L> {
    fn new(leaves: Vec<TreeNode<L>>, leaf_distance: impl Fn(&L, &L) -> f64) -> Self {
        let mut distances = Distances(HashMap::new());
        for i in 0..leaves.len() {
            for j in i + 1..leaves.len() {
                let d = leaf_distance(
                    leaves[i].payload().expect("clustering input must be leaves"),
                    leaves[j].payload().expect("clustering input must be leaves"),
                );
                distances.set(i, j, d);
            }
        }
        let active = (0..leaves.len()).collect();
        Self {
            nodes: leaves.into_iter().map(Some).collect(),
            active,
            distances,
        }
    }

    // First pair (in active order) with the minimal value of `score`.
    fn min_pair(&self, score: impl Fn(usize, usize) -> f64) -> (usize, usize) {
        let mut best: Option<(f64, usize, usize)> = None;
        for (position, &i) in self.active.iter().enumerate() {
            for &j in &self.active[position + 1..] {
                let value = score(i, j);
                if best.map_or(true, |(best_value, _, _)| value < best_value) {
                    best = Some((value, i, j));
                }
            }
        }
        let (_, i, j) = best.expect("at least two active nodes");
        (i, j)
    }

    fn merge(&mut self, i: usize, j: usize, length_i: f64, length_j: f64) -> usize {
        let mut node_i = self.nodes[i].take().expect("active node");
        let mut node_j = self.nodes[j].take().expect("active node");
        node_i.set_length(length_i);
        node_j.set_length(length_j);
        let mut merged = TreeNode::new_inner();
        merged.add_child(node_i);
        merged.add_child(node_j);
        let merged_index = self.nodes.len();
        self.nodes.push(Some(merged));
        self.active.retain(|&k| k != i && k != j);
        self.active.push(merged_index);
        merged_index
    }
}

fn take_leaves<L>(root: &mut TreeNode<L>) -> Vec<TreeNode<L>> {
    let mut leaves = Vec::new();
    let children = std::mem::take(&mut root.children);
    for child in children {
        collect_owned_leaves(child, &mut leaves);
    }
    leaves
}

fn collect_owned_leaves<L>(node: TreeNode<L>, leaves: &mut Vec<TreeNode<L>>) {
    if node.is_leaf() {
        leaves.push(node);
    } else {
        for child in node.children {
            collect_owned_leaves(child, leaves);
        }
    }
}

impl<L> TreeNode<L> {
    /// Rebuilds the children of this node into a UPGMA hierarchy over the
    /// current leaves. The two members of each merge receive half of the
    /// merging distance as branch length; merged distances are arithmetic
    /// means.
    pub fn upgma(&mut self, leaf_distance: impl Fn(&L, &L) -> f64) {
        let leaves = take_leaves(self);
        if leaves.is_empty() {
            return;
        }
        let rounds = leaves.len() - 1;
        let mut clustering = Clustering::new(leaves, leaf_distance);
        for _ in 0..rounds {
            let (i, j) =
                clustering.min_pair(|i, j| clustering.distances.get(i, j));
            let min_distance = clustering.distances.get(i, j);
            let others: Vec<usize> = clustering
                .active
                .iter()
                .copied()
                .filter(|&k| k != i && k != j)
                .collect();
            let merged = clustering.merge(i, j, min_distance / 2.0, min_distance / 2.0);
            for k in others {
                let d = 0.5 * clustering.distances.get(k, i) + 0.5 * clustering.distances.get(k, j);
                clustering.distances.set(k, merged, d);
                clustering.distances.remove(k, i);
                clustering.distances.remove(k, j);
            }
            clustering.distances.remove(i, j);
        }
        assert_eq!(clustering.active.len(), 1);
        let top = clustering.nodes[clustering.active[0]].take().unwrap();
        self.add_child(top);
    }

    /// Rebuilds the children of this node into a neighbor-joining tree over
    /// the current leaves. After `n - 3` agglomeration rounds the remaining
    /// triangle is resolved with the closed-form branch lengths.
    pub fn neighbor_joining(&mut self, leaf_distance: impl Fn(&L, &L) -> f64) {
        let leaves = take_leaves(self);
        let n = leaves.len();
        if n == 0 {
            return;
        }
        let mut clustering = Clustering::new(leaves, leaf_distance);
        if n == 1 {
            let only = clustering.nodes[0].take().unwrap();
            self.add_child(only);
            return;
        }
        if n == 2 {
            let d = clustering.distances.get(0, 1);
            for index in 0..2 {
                let mut node = clustering.nodes[index].take().unwrap();
                node.set_length(d / 2.0);
                self.add_child(node);
            }
            return;
        }
        for _ in 0..n - 3 {
            let (i, j) = {
                let q = |i: usize, j: usize| {
                    let mut value =
                        (clustering.active.len() as f64 - 2.0) * clustering.distances.get(i, j);
                    for &k in &clustering.active {
                        value -= clustering.distances.get(i, k);
                        value -= clustering.distances.get(j, k);
                    }
                    value
                };
                clustering.min_pair(q)
            };
            let min_distance = clustering.distances.get(i, j);
            let to_first = nj_distance_to_first(&clustering, i, j);
            let others: Vec<usize> = clustering
                .active
                .iter()
                .copied()
                .filter(|&k| k != i && k != j)
                .collect();
            let merged = clustering.merge(i, j, to_first, min_distance - to_first);
            for k in others {
                let d = 0.5
                    * (clustering.distances.get(i, k) + clustering.distances.get(j, k)
                        - min_distance);
                clustering.distances.set(merged, k, d);
                clustering.distances.remove(i, k);
                clustering.distances.remove(j, k);
            }
            clustering.distances.remove(i, j);
        }
        assert_eq!(clustering.active.len(), 3);
        let (a, b, c) = (
            clustering.active[0],
            clustering.active[1],
            clustering.active[2],
        );
        let length_a = nj_distance_to_first(&clustering, a, b);
        let length_b = clustering.distances.get(a, b) - length_a;
        let length_c = 0.5
            * (clustering.distances.get(a, c) + clustering.distances.get(b, c)
                - clustering.distances.get(a, b));
        for (index, length) in [(a, length_a), (b, length_b), (c, length_c)] {
            let mut node = clustering.nodes[index].take().unwrap();
            node.set_length(length);
            self.add_child(node);
        }
    }
}

// Branch length from the merged pair's first member, clamped to
// [0, min_distance].
fn nj_distance_to_first<L>(clustering: &Clustering<L>, i: usize, j: usize) -> f64 {
    let min_distance = clustering.distances.get(i, j);
    let mut s = 0.0;
    let mut others = 0usize;
    for &k in &clustering.active {
        if k != i && k != j {
            s += clustering.distances.get(i, k);
            s -= clustering.distances.get(j, k);
            others += 1;
        }
    }
    let mut dist = if others > 0 {
        0.5 * min_distance + 0.5 * s / others as f64
    } else {
        0.5 * min_distance
    };
    if dist < 0.0 {
        dist = 0.0;
    }
    if dist > min_distance {
        dist = min_distance;
    }
    dist
}

/// Accumulated weights of encoded bipartitions.
pub type BranchTable = BTreeMap<String, f64>;

impl<L> TreeNode<L> {
    // Encodes the leaves under `node` as a {0,1}-string over `leaves`,
    // normalized to start with '0'.
    fn branch_str<M>(node: &TreeNode<M>, leaves: &[String]) -> String {
        let mut inside: Vec<bool> = vec![false; leaves.len()];
        let mark = |name: &str, inside: &mut Vec<bool>| {
            if let Some(index) = leaves.iter().position(|leaf| leaf == name) {
                inside[index] = true;
            }
        };
        if let Some(name) = node.leaf_name() {
            mark(name, &mut inside);
        }
        for leaf in node.all_leafs() {
            if let Some(name) = leaf.leaf_name() {
                mark(name, &mut inside);
            }
        }
        let flip = inside.first().copied().unwrap_or(false);
        inside
            .iter()
            .map(|&bit| if bit != flip { '1' } else { '0' })
            .collect()
    }

    /// Adds `weight` to the table entry of every non-trivial bipartition
    /// induced by a branch of this tree. `leaves` fixes the encoding order
    /// and must contain every leaf name.
    pub fn branch_table(&self, table: &mut BranchTable, leaves: &[String], weight: f64) {
        fn walk<L>(
            node: &TreeNode<L>,
            table: &mut BranchTable,
            leaves: &[String],
            weight: f64,
        ) {
            for child in node.children() {
                if !child.is_leaf() {
                    let branch = TreeNode::<L>::branch_str(child, leaves);
                    let ones = branch.chars().filter(|&c| c == '1').count();
                    if ones >= 1 && leaves.len() - ones >= 1 && ones != leaves.len() {
                        let trivial = ones == 1 || leaves.len() - ones == 1;
                        if !trivial {
                            *table.entry(branch).or_insert(0.0) += weight;
                        }
                    }
                }
                walk(child, table, leaves, weight);
            }
        }
        walk(self, table, leaves, weight);
    }

    /// Renders an encoded bipartition as two leaf-name groups.
    pub fn branch_as_sets(leaves: &[String], branch: &str) -> String {
        let mut zeros = Vec::new();
        let mut ones = Vec::new();
        for (index, c) in branch.chars().enumerate() {
            if c == '0' {
                zeros.push(leaves[index].as_str());
            } else {
                ones.push(leaves[index].as_str());
            }
        }
        format!("{{{}}} vs {{{}}}", zeros.join(","), ones.join(","))
    }

    /// Two bipartitions are compatible iff one of the four pairwise
    /// intersections of their sides is empty.
    pub fn branches_compatible(one: &str, another: &str) -> bool {
        assert_eq!(one.len(), another.len());
        let mut seen = [false; 4];
        for (a, b) in one.chars().zip(another.chars()) {
            let index = ((a == '1') as usize) * 2 + ((b == '1') as usize);
            seen[index] = true;
        }
        seen.iter().any(|&combination| !combination)
    }

    /// `min(#0, #1)` of an encoded bipartition.
    pub fn branch_size(branch: &str) -> usize {
        let ones = branch.chars().filter(|&c| c == '1').count();
        ones.min(branch.len() - ones)
    }
}
