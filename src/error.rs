use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt data: {0}")]
    Corrupt(&'static str),
    #[error("index {index} out of range for list of {len} elements")]
    OutOfRange { index: usize, len: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to decode element {index}: {source}")]
    Codec {
        index: usize,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Classifies an I/O error raised while parsing list structure.
    ///
    /// Truncated streams and bad deflate data become `Corrupt`; anything else
    /// is a genuine device failure and is passed through.
    pub(crate) fn from_structure(err: io::Error, what: &'static str) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput => Error::Corrupt(what),
            _ => Error::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
