//! The `errors` module defines the common error types.

use std::error;
use std::fmt;
use std::io;

use super::Result;

/// `Error` provides an enumeration of all possible errors reported by g7codec.
#[derive(Debug)]
pub enum Error {
    /// An IO error occurred while reading or writing a bitstream, container or file.
    IoError(io::Error),
    /// The stream contained malformed data and could not be parsed.
    ParseError(&'static str),
    /// An unsupported feature or format variant was requested.
    Unsupported(&'static str),
    /// The command line was invoked with missing or malformed arguments.
    UsageError(&'static str),
    /// A malformed WAV or Y4M container was encountered.
    ContainerError(&'static str),
    /// A parameter fell outside its valid domain, e.g. a Golomb `m < 2`.
    InvalidParameter(&'static str),
    /// A read operation was attempted on a write-only stream, or vice versa.
    WrongMode(&'static str),
    /// Decoding ran past the end of the bitstream before the expected amount
    /// of data had been produced.
    UnexpectedEof,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::IoError(ref err) => err.fmt(f),
            Error::ParseError(ref msg) => write!(f, "Malformed stream encountered: {}", msg),
            Error::Unsupported(ref what) => write!(f, "Unsupported: {}", what),
            Error::UsageError(ref msg) => write!(f, "Usage error: {}", msg),
            Error::ContainerError(ref msg) => write!(f, "Malformed container: {}", msg),
            Error::InvalidParameter(ref msg) => write!(f, "Invalid parameter: {}", msg),
            Error::WrongMode(ref msg) => write!(f, "Wrong stream mode: {}", msg),
            Error::UnexpectedEof => write!(f, "Unexpected end of stream while decoding"),
        }
    }
}

impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match *self {
            Error::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::IoError(err)
        }
    }
}

/// function to create a decode error.
pub fn parse_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::ParseError(desc))
}

/// function to create an unsupported codec error.
pub fn unsupported_error<T>(codec: &'static str) -> Result<T> {
    Err(Error::Unsupported(codec))
}

/// function to create a CLI usage error.
pub fn usage_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::UsageError(msg))
}

/// function to create a malformed-container error.
pub fn container_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::ContainerError(msg))
}

/// function to create an invalid-parameter error.
pub fn invalid_parameter<T>(msg: &'static str) -> Result<T> {
    Err(Error::InvalidParameter(msg))
}
