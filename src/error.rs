use core::fmt;

use std::{error, io};

/// Errors from response entity construction.
#[derive(Debug)]
pub enum SendError {
    /// resource name is not present in the registry.
    ResourceNotFound,
    /// value failed json serialization.
    Json(serde_json::Error),
    Io(io::Error),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ResourceNotFound => f.write_str("resource not found"),
            Self::Json(ref e) => write!(f, "json serialize error: {e}"),
            Self::Io(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl error::Error for SendError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Self::ResourceNotFound => None,
            Self::Json(ref e) => Some(e),
            Self::Io(ref e) => Some(e),
        }
    }
}

impl From<io::Error> for SendError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for SendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
