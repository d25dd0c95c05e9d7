//! Scriptable, line-oriented command loop over a generic `BufRead`/`Write`
//! pair. Deliberately not raw/cbreak terminal mode: a piped script of
//! commands must behave identically to interactive typing, both for the
//! test suite and for anyone scripting the database by shelling out to it.

mod statement;

use std::io::{BufRead, Write};

use tracing::info;

use crate::errors::Error;
use crate::storage::btree;
use crate::storage::row::Row;
use crate::storage::table::Table;
use statement::Statement;

/// Content length limit, matching the reference tool's fixed input buffer.
/// A line longer than this has its remainder discarded.
const MAX_LINE_LEN: usize = 31;
const PROMPT: &str = "myjql> ";

pub fn run<R: BufRead, W: Write>(
    table: &mut Table,
    db_path: &str,
    input: &mut R,
    output: &mut W,
) -> Result<(), Error> {
    info!(db_path, "session start");
    let mut line_count: u64 = 0;
    let mut buf = String::new();

    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        buf.clear();
        if input.read_line(&mut buf)? == 0 {
            break; // EOF
        }
        let line = buf.trim_end_matches(['\n', '\r']);

        if line.len() > MAX_LINE_LEN {
            writeln!(output, "Input is too long.")?;
            continue;
        }
        line_count += 1;

        if let Some(command) = line.strip_prefix('.') {
            match command {
                "exit" => break,
                "constants" => {
                    writeln!(output, "Constants:")?;
                    print_constants(table, output)?;
                }
                _ => writeln!(output, "Unrecognized command '{}'.", line)?,
            }
            continue;
        }

        match statement::prepare(line) {
            Ok(None) => continue,
            Ok(Some(stmt)) => match execute(table, stmt, output) {
                Ok(()) => write!(output, "\nExecuted.\n\n")?,
                Err(Error::BadInput(msg)) => writeln!(output, "{}", msg)?,
                Err(e) => return Err(e),
            },
            Err(msg) => writeln!(output, "{}", msg)?,
        }
    }

    writeln!(output, "bye~")?;
    info!(db_path, line_count, "session end");
    Ok(())
}

fn execute<W: Write>(table: &mut Table, stmt: Statement, output: &mut W) -> Result<(), Error> {
    match stmt {
        Statement::Insert { a, b } => {
            let row = Row::new(a, &b)?;
            table.insert(row)
        }
        Statement::Select { key } => {
            writeln!(output)?;
            let rows = table.select(key.as_deref())?;
            if rows.is_empty() {
                writeln!(output, "(Empty)")?;
            } else {
                for row in rows {
                    writeln!(output, "{}", row)?;
                }
            }
            Ok(())
        }
        Statement::Delete { key } => {
            table.delete(&key)?;
            Ok(())
        }
    }
}

fn print_constants<W: Write>(table: &Table, output: &mut W) -> Result<(), Error> {
    let layout = table.layout;
    writeln!(output, "ROW_SIZE: {}", crate::storage::row::ROW_SIZE)?;
    writeln!(
        output,
        "COMMON_NODE_HEADER_SIZE: {}",
        btree::COMMON_NODE_HEADER_SIZE
    )?;
    writeln!(
        output,
        "LEAF_NODE_HEADER_SIZE: {}",
        btree::LEAF_NODE_HEADER_SIZE
    )?;
    writeln!(output, "LEAF_NODE_CELL_SIZE: {}", btree::LEAF_NODE_CELL_SIZE)?;
    writeln!(
        output,
        "LEAF_NODE_SPACE_FOR_CELLS: {}",
        layout.page_size - btree::LEAF_NODE_HEADER_SIZE
    )?;
    writeln!(output, "LEAF_NODE_MAX_CELLS: {}", layout.leaf_max_cells)?;
    Ok(())
}
