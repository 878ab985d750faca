use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    IllegalAdd { node: String, parent: String },
    InvalidHierarchy(String),
    InvalidName(String),
    InvalidPath(String),
    OutOfIndex(usize),
    RootElementExists,
    UndeclaredPrefix(String),
    UnsupportedOperation(String),
}

impl Error {
    pub(crate) fn read_only(node: &str) -> Self {
        Error::UnsupportedOperation(format!("{} is read-only and cannot be modified", node))
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::result::Result<(), fmt::Error> {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
