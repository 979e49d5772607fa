//! Result-set read/write error taxonomy, following the teacher's
//! `sparesults::error` pattern of one `thiserror` enum per crate boundary.
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResultsParseError {
    #[error("I/O error while reading results: {0}")]
    Io(#[from] io::Error),
    #[error("malformed {format} results: {message}")]
    Syntax { format: &'static str, message: String },
    #[error("no variable named {0:?} in the results header")]
    UnknownVariable(String),
}

#[derive(Debug, Error)]
pub enum ResultsWriteError {
    #[error("I/O error while writing results: {0}")]
    Io(#[from] io::Error),
    #[error("cannot write a {0} result set in this format")]
    UnsupportedResultKind(&'static str),
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ComparisonError {
    #[error("result sets do not share a compatible variable set")]
    IncompatibleVariables,
    #[error("result kinds differ ({0} vs {1})")]
    DifferentKinds(&'static str, &'static str),
}
