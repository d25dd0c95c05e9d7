//! Turns one input line into a `Statement`, or the exact diagnostic string
//! the REPL prints for it. Keywords are matched by their first 6 bytes
//! (`"insert"`, `"select"`, `"delete"`) the same loose way the reference
//! tool's `strtok`-based parser does, rather than requiring a trailing word
//! boundary.

use crate::storage::row::COLUMN_B_MAX_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert { a: u32, b: String },
    Select { key: Option<String> },
    Delete { key: String },
}

const SYNTAX_ERROR: &str = "Syntax error. Could not parse statement.";
const STRING_TOO_LONG: &str = "String for column `b` is too long.";
const NEGATIVE_VALUE: &str = "Column `a` must be positive.";

/// `Ok(None)` means the line was blank: nothing to run, nothing to report.
pub fn prepare(line: &str) -> Result<Option<Statement>, String> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    match line.as_bytes().get(..6) {
        Some(b"insert") => prepare_insert(line).map(Some),
        Some(b"select") => prepare_select(line).map(Some),
        Some(b"delete") => prepare_delete(line).map(Some),
        _ => Err(format!("Unrecognized keyword at start of '{}'.", line)),
    }
}

fn prepare_insert(line: &str) -> Result<Statement, String> {
    let mut tokens = line.split_whitespace();
    tokens.next(); // keyword
    let (a_tok, b_tok) = match (tokens.next(), tokens.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(SYNTAX_ERROR.to_string()),
    };
    let a: i64 = a_tok.parse().map_err(|_| SYNTAX_ERROR.to_string())?;
    if a < 0 {
        return Err(NEGATIVE_VALUE.to_string());
    }
    if b_tok.len() > COLUMN_B_MAX_LEN {
        return Err(STRING_TOO_LONG.to_string());
    }
    Ok(Statement::Insert {
        a: a as u32,
        b: b_tok.to_string(),
    })
}

/// Shared by `select` and `delete`: an optional single key argument after
/// the keyword. `Ok(None)` means no argument was given at all.
fn prepare_condition(line: &str) -> Result<Option<String>, String> {
    let mut tokens = line.split_whitespace();
    tokens.next(); // keyword
    let b = match tokens.next() {
        Some(b) => b,
        None => return Ok(None),
    };
    if tokens.next().is_some() {
        return Err(SYNTAX_ERROR.to_string());
    }
    if b.len() > COLUMN_B_MAX_LEN {
        return Err(STRING_TOO_LONG.to_string());
    }
    Ok(Some(b.to_string()))
}

fn prepare_select(line: &str) -> Result<Statement, String> {
    Ok(Statement::Select {
        key: prepare_condition(line)?,
    })
}

fn prepare_delete(line: &str) -> Result<Statement, String> {
    match prepare_condition(line)? {
        Some(key) => Ok(Statement::Delete { key }),
        None => Err(SYNTAX_ERROR.to_string()),
    }
}
