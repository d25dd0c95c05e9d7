//! The `Table` type ties a `Pager` to a fixed page size and layout, and
//! exposes the executor-level operations (`insert`, `select`, `delete`)
//! that the REPL drives.

use std::path::Path;

use tracing::info;

use crate::errors::Error;
use crate::storage::btree::{Layout, Node};
use crate::storage::cursor::Cursor;
use crate::storage::delete;
use crate::storage::insert;
use crate::storage::row::Row;
use crate::storage::search;

/// Page 0 is permanently the tree root (see spec §9, "Root identity").
pub const ROOT_PAGE_NUM: u32 = 0;

pub const DEFAULT_PAGE_SIZE: usize = 4096;

pub struct Table {
    pub pager: crate::storage::pager::Pager,
    pub layout: Layout,
}

impl Table {
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Table, Error> {
        let mut pager = crate::storage::pager::Pager::open(path, page_size)?;
        let layout = Layout::new(page_size);
        if pager.num_pages() == 0 {
            let mut root = Node::new(page_size);
            root.init_leaf();
            root.set_is_root(true);
            let buf = pager.get_page_mut(ROOT_PAGE_NUM)?;
            buf.copy_from_slice(&root.data);
        }
        Ok(Table { pager, layout })
    }

    pub fn close(&mut self) -> Result<(), Error> {
        self.pager.close()
    }

    pub fn read_node(&mut self, page_num: u32) -> Result<Node, Error> {
        let buf = self.pager.get_page(page_num)?.clone();
        Ok(Node::from_bytes(buf))
    }

    pub fn write_node(&mut self, page_num: u32, node: &Node) -> Result<(), Error> {
        let buf = self.pager.get_page_mut(page_num)?;
        buf.copy_from_slice(&node.data);
        Ok(())
    }

    pub fn value(&mut self, cursor: &Cursor) -> Result<Row, Error> {
        let node = self.read_node(cursor.page_num)?;
        let raw = node.leaf_cell(cursor.cell_num).to_vec();
        Ok(Row::decode(&raw))
    }

    pub fn start(&mut self) -> Result<Cursor, Error> {
        search::table_start(self)
    }

    pub fn advance(&mut self, cursor: &mut Cursor) -> Result<(), Error> {
        let node = self.read_node(cursor.page_num)?;
        cursor.cell_num += 1;
        if cursor.cell_num >= node.leaf_num_cells() {
            let next = node.leaf_next_leaf();
            if next == 0 {
                cursor.end_of_table = true;
            } else {
                cursor.page_num = next;
                cursor.cell_num = 0;
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, row: Row) -> Result<(), Error> {
        insert::insert(self, &row)
    }

    /// `key = None` means "every row", in key order.
    pub fn select(&mut self, key: Option<&str>) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::new();
        match key {
            None => {
                let mut cur = self.start()?;
                while !cur.end_of_table {
                    rows.push(self.value(&cur)?);
                    self.advance(&mut cur)?;
                }
            }
            Some(b) => {
                let key_bytes = Row::encode_key(b);
                let mut cur = search::table_find(self, &key_bytes)?;
                while !cur.end_of_table {
                    let row = self.value(&cur)?;
                    if row.b != b {
                        break;
                    }
                    rows.push(row);
                    self.advance(&mut cur)?;
                }
            }
        }
        Ok(rows)
    }

    pub fn delete(&mut self, key: &str) -> Result<usize, Error> {
        let count = delete::delete(self, key)?;
        info!(key, count, "deleted rows");
        Ok(count)
    }
}
