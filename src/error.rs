use crate::encoding::EncodeError;
use std::{fmt, io, path::PathBuf};

/// Errors produced while building or reading a bitboard dataset
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// A position could not be encoded
    Encode(EncodeError),
    /// Feature and label rows given to an append do not line up
    ShapeMismatch { features: usize, labels: usize },
    /// A container (or any other file) already exists at the path
    AlreadyExists(PathBuf),
    NotFound(PathBuf),
    /// The container header or length is not what we wrote
    Corrupted(String),
    IndexOutOfRange { index: usize, len: usize },
    /// A label other than 0 or 1
    InvalidLabel(u8),
    /// Append on a container opened read-only
    ReadOnly,
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {}", err),
            Error::Encode(err) => write!(f, "can't encode position: {}", err),
            Error::ShapeMismatch { features, labels } => write!(
                f,
                "shape mismatch: {} feature rows but {} label rows",
                features, labels
            ),
            Error::AlreadyExists(path) => write!(f, "{} already exists", path.display()),
            Error::NotFound(path) => write!(f, "{} does not exist", path.display()),
            Error::Corrupted(msg) => write!(f, "corrupted container: {}", msg),
            Error::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range (len {})", index, len)
            }
            Error::InvalidLabel(label) => write!(f, "invalid label {}, expected 0 or 1", label),
            Error::ReadOnly => write!(f, "container is read-only"),
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        Error::Encode(err)
    }
}
