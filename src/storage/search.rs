//! Root-to-leaf descent. `table_find` returns a cursor at the leftmost
//! occurrence of a key, or at its correct insertion slot if absent.

use std::cmp::Ordering;

use crate::errors::Error;
use crate::storage::btree::{Node, NodeType};
use crate::storage::cursor::Cursor;
use crate::storage::row::KEY_SIZE;
use crate::storage::table::{Table, ROOT_PAGE_NUM};

/// Compares two 12-byte key fields by C-string semantics: bytes up to the
/// first NUL only.
pub fn key_cmp(a: &[u8; KEY_SIZE], b: &[u8; KEY_SIZE]) -> Ordering {
    let ae = a.iter().position(|&c| c == 0).unwrap_or(KEY_SIZE);
    let be = b.iter().position(|&c| c == 0).unwrap_or(KEY_SIZE);
    a[..ae].cmp(&b[..be])
}

pub fn table_find(table: &mut Table, key: &[u8; KEY_SIZE]) -> Result<Cursor, Error> {
    search_node(table, ROOT_PAGE_NUM, key)
}

fn search_node(table: &mut Table, page_num: u32, key: &[u8; KEY_SIZE]) -> Result<Cursor, Error> {
    let node = table.read_node(page_num)?;
    match node.node_type() {
        NodeType::Leaf => {
            let mut min = 0u32;
            let mut max = node.leaf_num_cells();
            while min < max {
                let mid = min + (max - min) / 2;
                let k = node.leaf_key(mid);
                if key_cmp(&k, key) == Ordering::Less {
                    min = mid + 1;
                } else {
                    max = mid;
                }
            }
            Ok(Cursor {
                page_num,
                cell_num: min,
                end_of_table: node.leaf_num_cells() == 0,
            })
        }
        NodeType::Interior => {
            let i = interior_find_child(&node, key);
            let child = node.interior_child(i);
            search_node(table, child, key)
        }
    }
}

/// Finds the index of the child (key slot, or `num_keys` for the rightmost
/// pointer) that `key` would route to in a single interior node. Shared by
/// tree descent and the delete engine's sibling/separator bookkeeping.
pub fn interior_find_child(node: &Node, key: &[u8; KEY_SIZE]) -> u32 {
    let num_keys = node.interior_num_keys();
    let mut min = 0u32;
    let mut max = num_keys;
    while min < max {
        let mid = min + (max - min) / 2;
        let sep = node.interior_key(mid);
        if key_cmp(key, &sep) == Ordering::Greater {
            min = mid + 1;
        } else {
            max = mid;
        }
    }
    // Duplicate keys may span multiple children: back up while the
    // preceding separator also equals `key`.
    let mut i = min;
    while i > 0 {
        let prev = node.interior_key(i - 1);
        if key_cmp(&prev, key) == Ordering::Equal {
            i -= 1;
        } else {
            break;
        }
    }
    i
}

/// Positions a cursor at the leftmost leaf by descending via child index 0
/// at every interior level.
pub fn table_start(table: &mut Table) -> Result<Cursor, Error> {
    let mut page_num = ROOT_PAGE_NUM;
    loop {
        let node = table.read_node(page_num)?;
        match node.node_type() {
            NodeType::Leaf => {
                return Ok(Cursor {
                    page_num,
                    cell_num: 0,
                    end_of_table: node.leaf_num_cells() == 0,
                });
            }
            NodeType::Interior => {
                page_num = node.interior_child(0);
            }
        }
    }
}
