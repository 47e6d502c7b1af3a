use std::fmt;
use std::io;

use thiserror::Error;

/// Why a fixed-size read came up short.
#[derive(Debug)]
pub enum ReadFailure {
    /// The underlying reader reported an error.
    Io(io::Error),
    /// The stream ended before the requested number of bytes.
    EndOfFile,
    /// Neither an error nor end of file was observed.
    Unknown,
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadFailure::Io(e) => write!(f, "{}", e),
            ReadFailure::EndOfFile => write!(f, "end of file"),
            ReadFailure::Unknown => write!(f, "unknown error?"),
        }
    }
}

/// Errors that stop processing of a single module file.
#[derive(Debug, Error)]
pub enum ModError {
    #[error("{0}")]
    Open(#[source] io::Error),

    #[error("could not seek to magic: {0}")]
    SeekMagic(#[source] io::Error),

    #[error("could not read magic: {0}")]
    ReadMagic(ReadFailure),

    #[error("not a valid .mod (tag {0:02x?})")]
    UnrecognizedTag([u8; 4]),

    #[error("invalid channel count!")]
    InvalidChannelCount,

    #[error("could not seek to beginning of file: {0}")]
    SeekStart(#[source] io::Error),

    #[error("could not read module data: {0}")]
    ReadHeader(ReadFailure),

    #[error("could not seek to beginning of sample data: {0}")]
    SeekSampleData(#[source] io::Error),
}

/// Errors raised by an encoder while writing one sample.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("could not open .wav file: {0}")]
    Open(#[source] hound::Error),

    #[error("could not write sample data: {0}")]
    Write(#[source] hound::Error),

    #[error("did not write entirely ({written} of {requested} bytes)")]
    ShortWrite { written: usize, requested: usize },

    #[error("could not finalize .wav file: {0}")]
    Close(#[source] hound::Error),

    #[error("could not pad .wav data chunk: {0}")]
    Pad(#[source] io::Error),
}
