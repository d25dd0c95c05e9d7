//! A `Cursor` is a lightweight `(page, cell)` position over leaf records. It
//! carries no borrow on the table it was produced from — callers pass the
//! table back in to every `Table` method that needs to read through it,
//! which sidesteps the aliasing trouble the teacher's borrowed-cursor design
//! ran into (`Cursor<'a>` holding `&'a mut Table` while also wanting a
//! `Table` method to hand one out).

#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}
