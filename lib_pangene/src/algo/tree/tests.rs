use std::collections::BTreeMap;

use crate::algo::tree::{BootstrapStyle, BranchTable, TreeNode};

fn four_leaf_distance(one: &usize, another: &usize) -> f64 {
    let (a, b) = if one < another {
        (*one, *another)
    } else {
        (*another, *one)
    };
    match (a, b) {
        (1, 2) => 2.0,
        (1, 3) => 5.0,
        (2, 3) => 7.0,
        (1, 4) => 9.0,
        (2, 4) => 10.0,
        (3, 4) => 11.0,
        _ => unreachable!("unknown leaf pair"),
    }
}

fn four_leaves() -> TreeNode<usize> {
    let mut root = TreeNode::new_inner();
    for genome in 1..=4usize {
        root.add_child(TreeNode::new_leaf(format!("g{genome}"), genome));
    }
    root
}

// Names of the leaves under every internal node, sorted, as a set of
// comma-joined groups.
fn clades(root: &TreeNode<usize>) -> Vec<String> {
    let mut result = Vec::new();
    fn walk(node: &TreeNode<usize>, result: &mut Vec<String>) {
        for child in node.children() {
            if !child.is_leaf() {
                let mut names: Vec<&str> =
                    child.all_leafs().iter().filter_map(|leaf| leaf.leaf_name()).collect();
                names.sort_unstable();
                result.push(names.join(","));
                walk(child, result);
            }
        }
    }
    walk(root, &mut result);
    result.sort();
    result
}

#[test]
fn upgma_merges_the_closest_pair_first() {
    let mut root = four_leaves();
    root.upgma(four_leaf_distance);
    assert_eq!(root.children().len(), 1);
    let groups = clades(&root);
    assert!(groups.contains(&"g1,g2".to_string()));
    assert!(groups.contains(&"g1,g2,g3".to_string()));
    // The {1,2} clade sits at depth 1: both members got half the merging
    // distance.
    fn find<'a>(node: &'a TreeNode<usize>, group: &str) -> Option<&'a TreeNode<usize>> {
        for child in node.children() {
            if !child.is_leaf() {
                let mut names: Vec<&str> =
                    child.all_leafs().iter().filter_map(|leaf| leaf.leaf_name()).collect();
                names.sort_unstable();
                if names.join(",") == group {
                    return Some(child);
                }
            }
            if let Some(found) = find(child, group) {
                return Some(found);
            }
        }
        None
    }
    let pair = find(&root, "g1,g2").unwrap();
    for leaf in pair.children() {
        assert!((leaf.length() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn nj_agrees_with_upgma_on_the_easy_split() {
    let mut upgma_root = four_leaves();
    upgma_root.upgma(four_leaf_distance);
    let mut nj_root = four_leaves();
    nj_root.neighbor_joining(four_leaf_distance);

    let leaves: Vec<String> = (1..=4).map(|g| format!("g{g}")).collect();
    let mut upgma_table = BranchTable::new();
    upgma_root.branch_table(&mut upgma_table, &leaves, 1.0);
    let mut nj_table = BranchTable::new();
    nj_root.branch_table(&mut nj_table, &leaves, 1.0);
    // Both topologies contain the bipartition {1,2} vs {3,4}.
    assert!(upgma_table.contains_key("0011"));
    assert!(nj_table.contains_key("0011"));
}

#[test]
fn nj_branches_are_pairwise_compatible() {
    let mut root = four_leaves();
    root.neighbor_joining(four_leaf_distance);
    let leaves: Vec<String> = (1..=4).map(|g| format!("g{g}")).collect();
    let mut table = BranchTable::new();
    root.branch_table(&mut table, &leaves, 1.0);
    let branches: Vec<&String> = table.keys().collect();
    for (index, one) in branches.iter().enumerate() {
        for another in &branches[index + 1..] {
            assert!(TreeNode::<usize>::branches_compatible(one, another));
        }
    }
}

#[test]
fn nj_triangle_lengths_are_additive() {
    // Three leaves on an additive tree: a=2+x, b=3+x... pick exact values.
    let distance = |one: &usize, another: &usize| -> f64 {
        let (a, b) = if one < another { (*one, *another) } else { (*another, *one) };
        match (a, b) {
            (1, 2) => 5.0, // 2 + 3
            (1, 3) => 6.0, // 2 + 4
            (2, 3) => 7.0, // 3 + 4
            _ => unreachable!(),
        }
    };
    let mut root = TreeNode::new_inner();
    for genome in 1..=3usize {
        root.add_child(TreeNode::new_leaf(format!("g{genome}"), genome));
    }
    root.neighbor_joining(distance);
    let lengths: BTreeMap<&str, f64> = root
        .children()
        .iter()
        .map(|child| (child.leaf_name().unwrap(), child.length()))
        .collect();
    assert!((lengths["g1"] - 2.0).abs() < 1e-9);
    assert!((lengths["g2"] - 3.0).abs() < 1e-9);
    assert!((lengths["g3"] - 4.0).abs() < 1e-9);
}

#[test]
fn branches_compatible_rejects_crossing_splits() {
    assert!(TreeNode::<usize>::branches_compatible("0011", "0001"));
    assert!(TreeNode::<usize>::branches_compatible("0011", "0111"));
    assert!(!TreeNode::<usize>::branches_compatible("0011", "0110"));
    assert_eq!(TreeNode::<usize>::branch_size("00111"), 2);
}

#[test]
fn newick_styles_differ_only_in_bootstrap() {
    let mut root = TreeNode::new_inner();
    let mut inner = TreeNode::new_inner();
    inner.add_child({
        let mut leaf = TreeNode::new_leaf("a", 0usize);
        leaf.set_length(0.25);
        leaf
    });
    inner.add_child({
        let mut leaf = TreeNode::new_leaf("b", 1usize);
        leaf.set_length(0.5);
        leaf
    });
    inner.set_length(1.5);
    inner.set_bootstrap(95.0);
    root.add_child(inner);
    root.add_child(TreeNode::new_leaf("c", 2usize));

    assert_eq!(
        root.newick(true, BootstrapStyle::None),
        "((a:0.25,b:0.5):1.5,c:0);"
    );
    assert_eq!(
        root.newick(true, BootstrapStyle::InBraces),
        "((a:0.25,b:0.5)[95]:1.5,c:0);"
    );
    assert_eq!(
        root.newick(true, BootstrapStyle::BeforeLength),
        "((a:0.25,b:0.5)95:1.5,c:0);"
    );
    assert_eq!(root.newick(false, BootstrapStyle::None), "((a,b),c);");
}

#[test]
fn tree_distance_sums_the_path() {
    let mut root = four_leaves();
    root.upgma(four_leaf_distance);
    // Distance between the two closest leaves is the merging distance.
    assert!((root.tree_distance("g1", "g2") - 2.0).abs() < 1e-9);
    assert_eq!(root.tree_distance("g1", "g1"), 0.0);
    assert!(root.tree_distance("g1", "missing") < 0.0);
}
