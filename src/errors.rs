use std::fmt;

/// Crate-wide error type.
///
/// `Io`, `CorruptFile` and `PageOutOfRange` are fatal: callers at the REPL
/// boundary print a message and terminate the process. `NotFound` is consumed
/// internally by the delete path. `BadInput` is reported per line and never
/// unwinds the session.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    CorruptFile(String),
    PageOutOfRange(u32),
    NotFound,
    BadInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error. {}", e),
            Error::CorruptFile(msg) => write!(f, "Corrupt file. {}", msg),
            Error::PageOutOfRange(page) => write!(f, "Page {} is out of range.", page),
            Error::NotFound => write!(f, "Not found."),
            Error::BadInput(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl Error {
    /// True for the categories that must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::CorruptFile(_) | Error::PageOutOfRange(_)
        )
    }
}
