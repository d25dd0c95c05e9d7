//! Leaf insert, leaf split, interior insert, interior split, root promotion.
//!
//! The interior-insert placement rule (which slot gets the new key vs. the
//! new child pointer) is derived from invariant 4 of the node codec rather
//! than transcribed from either of the two historical, mutually
//! inconsistent code paths for it — there is exactly one `interior_insert`
//! here, called both for a leaf's direct parent and recursively for any
//! interior ancestor that itself overflows.

use std::cmp::Ordering;

use crate::errors::Error;
use crate::storage::btree::Node;
use crate::storage::row::{Row, ROW_SIZE};
use crate::storage::search::key_cmp;
use crate::storage::table::{Table, ROOT_PAGE_NUM};

pub fn insert(table: &mut Table, row: &Row) -> Result<(), Error> {
    let key = Row::encode_key(&row.b);
    let cur = crate::storage::search::table_find(table, &key)?;
    leaf_insert(table, cur.page_num, cur.cell_num, row)
}

fn leaf_insert(table: &mut Table, page_num: u32, cell_num: u32, row: &Row) -> Result<(), Error> {
    let mut node = table.read_node(page_num)?;
    let max = table.layout.leaf_max_cells;

    if node.leaf_num_cells() < max {
        let n = node.leaf_num_cells();
        node.leaf_shift_right(cell_num, n);
        node.set_leaf_cell(cell_num, &row.encode());
        node.set_leaf_num_cells(n + 1);
        table.write_node(page_num, &node)?;
        return Ok(());
    }

    leaf_split_and_insert(table, page_num, cell_num, row)
}

fn leaf_split_and_insert(
    table: &mut Table,
    page_num: u32,
    cell_num: u32,
    row: &Row,
) -> Result<(), Error> {
    let old = table.read_node(page_num)?;
    let is_root = old.is_root();
    let old_parent = old.parent();
    let old_next = old.leaf_next_leaf();
    let max = table.layout.leaf_max_cells;

    let mut cells: Vec<[u8; ROW_SIZE]> = Vec::with_capacity(max as usize + 1);
    for i in 0..max {
        if i == cell_num {
            cells.push(row.encode());
        }
        let cell: [u8; ROW_SIZE] = old.leaf_cell(i).try_into().expect("cell is ROW_SIZE bytes");
        cells.push(cell);
    }
    if cell_num == max {
        cells.push(row.encode());
    }

    let left_count = table.layout.leaf_left_split;
    let right_count = table.layout.leaf_right_split;
    let page_size = table.pager.page_size();

    let mut left = Node::new(page_size);
    left.init_leaf();
    for (i, cell) in cells[..left_count as usize].iter().enumerate() {
        left.set_leaf_cell(i as u32, cell);
    }
    left.set_leaf_num_cells(left_count);

    let mut right = Node::new(page_size);
    right.init_leaf();
    for (i, cell) in cells[left_count as usize..].iter().enumerate() {
        right.set_leaf_cell(i as u32, cell);
    }
    right.set_leaf_num_cells(right_count);
    right.set_leaf_next_leaf(old_next);

    if is_root {
        let left_page_num = table.pager.get_unused_page_num();
        table.pager.get_page_mut(left_page_num)?;
        let right_page_num = table.pager.get_unused_page_num();
        table.pager.get_page_mut(right_page_num)?;

        left.set_parent(ROOT_PAGE_NUM);
        right.set_parent(ROOT_PAGE_NUM);
        left.set_leaf_next_leaf(right_page_num);

        let sep = left.leaf_max_key();
        table.write_node(left_page_num, &left)?;
        table.write_node(right_page_num, &right)?;

        create_new_root(table, left_page_num, right_page_num, sep)
    } else {
        let right_page_num = table.pager.get_unused_page_num();
        table.pager.get_page_mut(right_page_num)?;

        left.set_parent(old_parent);
        left.set_leaf_next_leaf(right_page_num);
        right.set_parent(old_parent);

        let sep = left.leaf_max_key();
        table.write_node(page_num, &left)?;
        table.write_node(right_page_num, &right)?;

        interior_insert(table, old_parent, right_page_num, sep)
    }
}

fn create_new_root(
    table: &mut Table,
    left_page_num: u32,
    right_page_num: u32,
    sep_key: [u8; 12],
) -> Result<(), Error> {
    let mut root = Node::new(table.pager.page_size());
    root.init_interior();
    root.set_is_root(true);
    root.set_interior_num_keys(1);
    root.set_interior_cell_child(0, left_page_num);
    root.set_interior_key(0, &sep_key);
    root.set_interior_right_child(right_page_num);
    table.write_node(ROOT_PAGE_NUM, &root)
}

fn interior_insert(
    table: &mut Table,
    parent_page_num: u32,
    new_child_page_num: u32,
    sep_key: [u8; 12],
) -> Result<(), Error> {
    let mut parent = table.read_node(parent_page_num)?;
    let original_num_keys = parent.interior_num_keys();

    let is_append = original_num_keys == 0
        || key_cmp(&sep_key, &parent.interior_key(original_num_keys - 1)) != Ordering::Less;

    if is_append {
        let old_rightmost = parent.interior_right_child();
        parent.set_interior_cell_child(original_num_keys, old_rightmost);
        parent.set_interior_key(original_num_keys, &sep_key);
        parent.set_interior_right_child(new_child_page_num);
    } else {
        let mut idx = original_num_keys;
        for i in 0..original_num_keys {
            if key_cmp(&sep_key, &parent.interior_key(i)) != Ordering::Greater {
                idx = i;
                break;
            }
        }
        parent.interior_shift_right(idx, original_num_keys);
        parent.set_interior_key(idx, &sep_key);
        parent.set_interior_cell_child(idx + 1, new_child_page_num);
    }
    parent.set_interior_num_keys(original_num_keys + 1);

    let mut new_child = table.read_node(new_child_page_num)?;
    new_child.set_parent(parent_page_num);
    table.write_node(new_child_page_num, &new_child)?;

    if parent.interior_num_keys() <= table.layout.interior_max_cells {
        table.write_node(parent_page_num, &parent)?;
        return Ok(());
    }

    split_interior(table, parent_page_num, parent)
}

fn split_interior(table: &mut Table, parent_page_num: u32, parent: Node) -> Result<(), Error> {
    let num_keys_after = parent.interior_num_keys();
    let mid = num_keys_after / 2;
    let left_count = mid;
    let right_count = num_keys_after - mid - 1;
    let promoted_key = parent.interior_key(mid);
    let left_rightmost = parent.interior_cell_child(mid);

    let page_size = table.pager.page_size();
    let is_root = parent.is_root();
    let grandparent = parent.parent();

    let mut right = Node::new(page_size);
    right.init_interior();
    for i in 0..right_count {
        let cell = parent.interior_cell(mid + 1 + i).to_vec();
        right.set_interior_cell(i, &cell);
    }
    right.set_interior_num_keys(right_count);
    right.set_interior_right_child(parent.interior_right_child());

    if is_root {
        let mut left = Node::new(page_size);
        left.init_interior();
        for i in 0..left_count {
            let cell = parent.interior_cell(i).to_vec();
            left.set_interior_cell(i, &cell);
        }
        left.set_interior_num_keys(left_count);
        left.set_interior_right_child(left_rightmost);

        let left_page_num = table.pager.get_unused_page_num();
        table.pager.get_page_mut(left_page_num)?;
        let right_page_num = table.pager.get_unused_page_num();
        table.pager.get_page_mut(right_page_num)?;

        left.set_parent(ROOT_PAGE_NUM);
        right.set_parent(ROOT_PAGE_NUM);

        reparent_children(table, &left, left_page_num)?;
        reparent_children(table, &right, right_page_num)?;

        table.write_node(left_page_num, &left)?;
        table.write_node(right_page_num, &right)?;

        create_new_root(table, left_page_num, right_page_num, promoted_key)
    } else {
        let right_page_num = table.pager.get_unused_page_num();
        table.pager.get_page_mut(right_page_num)?;
        right.set_parent(grandparent);
        reparent_children(table, &right, right_page_num)?;
        table.write_node(right_page_num, &right)?;

        let mut left = parent;
        left.set_interior_num_keys(left_count);
        left.set_interior_right_child(left_rightmost);
        table.write_node(parent_page_num, &left)?;

        interior_insert(table, grandparent, right_page_num, promoted_key)
    }
}

/// Points every child (and the rightmost child) of `node` at `new_parent`.
pub(crate) fn reparent_children(table: &mut Table, node: &Node, new_parent: u32) -> Result<(), Error> {
    let num_keys = node.interior_num_keys();
    for i in 0..num_keys {
        let child_page = node.interior_cell_child(i);
        let mut child = table.read_node(child_page)?;
        child.set_parent(new_parent);
        table.write_node(child_page, &child)?;
    }
    let rightmost = node.interior_right_child();
    let mut child = table.read_node(rightmost)?;
    child.set_parent(new_parent);
    table.write_node(rightmost, &child)
}
