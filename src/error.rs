//! Error types for CPTV encoding and decoding

use std::io;
use thiserror::Error;

/// Errors that can occur while encoding or decoding CPTV streams
#[derive(Debug, Error)]
pub enum Error {
    /// Stream does not begin with the "CPTV" magic bytes
    #[error("bad magic (expected \"CPTV\")")]
    BadMagic,

    /// Unsupported container version
    #[error("unsupported CPTV version: {0}")]
    UnsupportedVersion(u8),

    /// A section or field is malformed or shorter than declared
    #[error("corrupt field data")]
    CorruptField,

    /// Write-side validation failure
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// End of the underlying byte stream
    ///
    /// Returned by frame iteration when the recording is exhausted;
    /// this is the normal termination sentinel, not a hard failure.
    #[error("end of stream")]
    EndOfStream,

    /// IO error from the underlying source or sink
    #[error("IO error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        // A short read anywhere in the container is the end-of-input
        // signal as far as the codec is concerned.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::EndOfStream
        } else {
            Error::Io(err)
        }
    }
}

impl Error {
    /// True for the normal end-of-recording sentinel
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

/// Result type alias for CPTV operations
pub type Result<T> = std::result::Result<T, Error>;
