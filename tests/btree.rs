//! Black-box invariant, round-trip, boundary, and scenario tests driving the
//! public `Table` API directly — no REPL parsing involved.

use std::collections::HashMap;

use myjql::storage::btree::{Node, NodeType};
use myjql::storage::row::Row;
use myjql::storage::table::{Table, ROOT_PAGE_NUM};

const SMALL_PAGE: usize = 128; // LEAF_MAX = 6 at this page size.

fn open_small() -> (tempfile::NamedTempFile, Table) {
    let file = tempfile::NamedTempFile::new().unwrap();
    let table = Table::open(file.path(), SMALL_PAGE).unwrap();
    (file, table)
}

/// Walks the whole tree from the root, asserting invariants 2 through 5 as
/// it goes, and returns the leaf pages visited in key order plus their
/// depths (for invariant 3) so the caller can also check invariant 1.
struct Walk {
    leaf_depths: Vec<u32>,
    leaf_keys_in_order: Vec<String>,
}

fn check_tree_invariants(table: &mut Table) -> Walk {
    let mut walk = Walk {
        leaf_depths: Vec::new(),
        leaf_keys_in_order: Vec::new(),
    };
    walk_node(table, ROOT_PAGE_NUM, ROOT_PAGE_NUM, 0, &mut walk);
    walk
}

fn walk_node(table: &mut Table, page: u32, parent: u32, depth: u32, walk: &mut Walk) {
    let node = table.read_node(page).unwrap();
    assert_eq!(
        node.parent(),
        parent,
        "page {page}'s parent pointer should be {parent}"
    );

    let layout = table.layout;
    match node.node_type() {
        NodeType::Leaf => {
            if !node.is_root() {
                let n = node.leaf_num_cells();
                assert!(
                    n >= layout.leaf_min_cells && n <= layout.leaf_max_cells,
                    "leaf {page} has {n} cells, outside [{}, {}]",
                    layout.leaf_min_cells,
                    layout.leaf_max_cells
                );
            }
            walk.leaf_depths.push(depth);
            for i in 0..node.leaf_num_cells() {
                walk.leaf_keys_in_order.push(Row::decode_key(&node.leaf_cell(i)[..12]));
            }
        }
        NodeType::Interior => {
            if !node.is_root() {
                let n = node.interior_num_keys();
                assert!(
                    n >= layout.interior_min_cells && n <= layout.interior_max_cells,
                    "interior {page} has {n} keys, outside [{}, {}]",
                    layout.interior_min_cells,
                    layout.interior_max_cells
                );
            }
            let num_keys = node.interior_num_keys();
            for i in 0..num_keys {
                let child_page = node.interior_cell_child(i);
                let separator = node.interior_key(i);
                let child_max = max_key_of_subtree(table, child_page);
                assert_eq!(
                    child_max,
                    Row::decode_key(&separator),
                    "separator at interior {page}/{i} should equal its child's max key"
                );
                walk_node(table, child_page, page, depth + 1, walk);
            }
            let rightmost = node.interior_right_child();
            if num_keys > 0 {
                let last_sep = Row::decode_key(&node.interior_key(num_keys - 1));
                let rightmost_min = min_key_of_subtree(table, rightmost);
                assert!(
                    rightmost_min >= last_sep,
                    "rightmost child's min key must be >= the last separator"
                );
            }
            walk_node(table, rightmost, page, depth + 1, walk);
        }
    }
}

fn max_key_of_subtree(table: &mut Table, page: u32) -> String {
    let node = table.read_node(page).unwrap();
    match node.node_type() {
        NodeType::Leaf => Row::decode_key(&node.leaf_max_key()),
        NodeType::Interior => max_key_of_subtree(table, node.interior_right_child()),
    }
}

fn min_key_of_subtree(table: &mut Table, page: u32) -> String {
    let node = table.read_node(page).unwrap();
    match node.node_type() {
        NodeType::Leaf => Row::decode_key(&node.leaf_key(0)),
        NodeType::Interior => min_key_of_subtree(table, node.interior_cell_child(0)),
    }
}

fn tree_depth(table: &mut Table, page: u32) -> u32 {
    let node = table.read_node(page).unwrap();
    match node.node_type() {
        NodeType::Leaf => 1,
        NodeType::Interior => 1 + tree_depth(table, node.interior_right_child()),
    }
}

/// Invariant 1: leftmost-to-right leaf chain yields non-decreasing keys.
fn leaf_chain_keys(table: &mut Table) -> Vec<String> {
    let mut keys = Vec::new();
    let mut cursor = table.start().unwrap();
    while !cursor.end_of_table {
        keys.push(table.value(&cursor).unwrap().b);
        table.advance(&mut cursor).unwrap();
    }
    keys
}

fn multiset(rows: &[Row]) -> HashMap<(u32, String), usize> {
    let mut m = HashMap::new();
    for r in rows {
        *m.entry((r.a, r.b.clone())).or_insert(0) += 1;
    }
    m
}

#[test]
fn invariants_hold_after_mixed_inserts_and_deletes() {
    let (_file, mut table) = open_small();
    let mut expected: Vec<Row> = Vec::new();
    for i in 0..20u32 {
        let row = Row::new(i, &format!("k{:02}", i)).unwrap();
        table.insert(row.clone()).unwrap();
        expected.push(row);
    }
    for i in (0..20u32).step_by(2) {
        let key = format!("k{:02}", i);
        table.delete(&key).unwrap();
        expected.retain(|r| r.b != key);
    }

    let walk = check_tree_invariants(&mut table);
    assert!(walk.leaf_depths.windows(2).all(|w| w[0] == w[1]), "unequal leaf depths");

    let chain = leaf_chain_keys(&mut table);
    let mut sorted_chain = chain.clone();
    sorted_chain.sort();
    assert_eq!(chain, sorted_chain, "leaf chain not in non-decreasing order");

    let got = multiset(&table.select(None).unwrap());
    let want = multiset(&expected);
    assert_eq!(got, want, "multiset of surviving keys must match inserted minus deleted");
    assert_eq!(table.select(None).unwrap().len(), 10);
}

#[test]
fn select_sorted_and_by_key() {
    let (_file, mut table) = open_small();
    table.insert(Row::new(1, "apple").unwrap()).unwrap();
    table.insert(Row::new(2, "banana").unwrap()).unwrap();
    table.insert(Row::new(3, "cherry").unwrap()).unwrap();

    let all = table.select(None).unwrap();
    assert_eq!(
        all.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
        vec!["(1, apple)", "(2, banana)", "(3, cherry)"]
    );

    let by_key = table.select(Some("banana")).unwrap();
    assert_eq!(by_key.len(), 1);
    assert_eq!(by_key[0].a, 2);
}

#[test]
fn round_trip_insert_select_delete() {
    let (_file, mut table) = open_small();
    table.insert(Row::new(5, "grape").unwrap()).unwrap();
    assert_eq!(table.select(Some("grape")).unwrap().len(), 1);
    table.delete("grape").unwrap();
    assert!(table.select(Some("grape")).unwrap().is_empty());
}

#[test]
fn persistence_across_close_and_reopen() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();
    {
        let mut table = Table::open(&path, SMALL_PAGE).unwrap();
        for i in 0..10u32 {
            table.insert(Row::new(i, &format!("p{:02}", i)).unwrap()).unwrap();
        }
        table.close().unwrap();
    }
    {
        let mut table = Table::open(&path, SMALL_PAGE).unwrap();
        let rows = table.select(None).unwrap();
        assert_eq!(rows.len(), 10);
        check_tree_invariants(&mut table);
    }
}

#[test]
fn boundary_one_split_produces_expected_leaf_sizes() {
    let (_file, mut table) = open_small();
    let leaf_max = table.layout.leaf_max_cells;
    for i in 0..=leaf_max {
        table.insert(Row::new(i, &format!("b{:03}", i)).unwrap()).unwrap();
    }

    let root = table.read_node(ROOT_PAGE_NUM).unwrap();
    assert_eq!(root.node_type(), NodeType::Interior);
    assert_eq!(root.interior_num_keys(), 1);

    let left = table.read_node(root.interior_cell_child(0)).unwrap();
    let right = table.read_node(root.interior_right_child()).unwrap();
    assert_eq!(left.leaf_num_cells(), table.layout.leaf_left_split);
    assert_eq!(right.leaf_num_cells(), table.layout.leaf_right_split);
}

#[test]
fn scenario_duplicate_keys_all_selected() {
    let (_file, mut table) = open_small();
    table.insert(Row::new(10, "k").unwrap()).unwrap();
    table.insert(Row::new(11, "k").unwrap()).unwrap();
    table.insert(Row::new(12, "k").unwrap()).unwrap();

    let rows = table.select(Some("k")).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.b == "k"));
}

#[test]
fn scenario_seven_keys_forces_one_leaf_split_in_order() {
    let (_file, mut table) = open_small();
    for b in ["a", "b", "c", "d", "e", "f", "g"] {
        table.insert(Row::new(1, b).unwrap()).unwrap();
    }
    let chain = leaf_chain_keys(&mut table);
    assert_eq!(chain, vec!["a", "b", "c", "d", "e", "f", "g"]);
}

#[test]
fn scenario_root_interior_splits_into_depth_three() {
    let (_file, mut table) = open_small();
    let leaf_max = table.layout.leaf_max_cells;
    let interior_max = table.layout.interior_max_cells;
    // Enough distinct keys to force enough leaf splits to overflow one
    // interior level too.
    let n = (leaf_max + 1) * (interior_max + 2);
    for i in 0..n {
        table.insert(Row::new(i, &format!("z{:05}", i)).unwrap()).unwrap();
    }

    let depth = tree_depth(&mut table, ROOT_PAGE_NUM);
    assert_eq!(depth, 3, "expected the root to have split into a depth-3 tree");
    let root = table.read_node(ROOT_PAGE_NUM).unwrap();
    assert_eq!(root.node_type(), NodeType::Interior);
    assert_eq!(root.interior_num_keys(), 1);

    check_tree_invariants(&mut table);
}

#[test]
fn scenario_delete_back_to_empty() {
    let (_file, mut table) = open_small();
    let mut keys = Vec::new();
    for i in 0..15u32 {
        let key = format!("e{:02}", i);
        table.insert(Row::new(i, &key).unwrap()).unwrap();
        keys.push(key);
    }
    for key in &keys {
        table.delete(key).unwrap();
    }

    let root = table.read_node(ROOT_PAGE_NUM).unwrap();
    assert_eq!(root.node_type(), NodeType::Leaf);
    assert_eq!(root.leaf_num_cells(), 0);
    assert!(table.select(None).unwrap().is_empty());
}
