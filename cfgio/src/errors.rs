// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for DiskIO operations.
pub type DiskIOResult<T = ()> = core::result::Result<T, DiskIOError>;

/// Error type for DiskIO operations.
#[derive(Debug)]
pub enum DiskIOError {
    /// Underlying file or device error.
    Io(std::io::Error),
    /// Access outside the addressable range of the backend.
    OutOfBounds { offset: u64, len: u64 },
    /// The medium returned fewer bytes than requested.
    ShortRead {
        offset: u64,
        read: usize,
        wanted: usize,
    },
    /// Read attempted on a region stream that already signalled its end.
    StreamExhausted,
    Other(&'static str),
}

impl DiskIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            DiskIOError::Io(_) => "IO error",
            DiskIOError::OutOfBounds { .. } => "Out of bounds",
            DiskIOError::ShortRead { .. } => "Short read",
            DiskIOError::StreamExhausted => "Stream exhausted",
            DiskIOError::Other(msg) => msg,
        }
    }
}

impl From<&'static str> for DiskIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        DiskIOError::Other(msg)
    }
}

impl From<std::io::Error> for DiskIOError {
    #[cold]
    #[inline(never)]
    fn from(e: std::io::Error) -> Self {
        DiskIOError::Io(e)
    }
}

impl From<DiskIOError> for std::io::Error {
    fn from(e: DiskIOError) -> Self {
        match e {
            DiskIOError::Io(inner) => inner,
            DiskIOError::OutOfBounds { .. } => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e.to_string())
            }
            DiskIOError::ShortRead { .. } => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e.to_string())
            }
            other => std::io::Error::other(other.to_string()),
        }
    }
}

impl fmt::Display for DiskIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            DiskIOError::Io(e) => write!(f, ": {e}")?,
            DiskIOError::OutOfBounds { offset, len } => {
                write!(f, " (offset: {offset}, len: {len})")?
            }
            DiskIOError::ShortRead {
                offset,
                read,
                wanted,
            } => write!(f, " at offset {offset} ({read} of {wanted} bytes)")?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for DiskIOError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiskIOError::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_details() {
        let e = DiskIOError::ShortRead {
            offset: 512,
            read: 3,
            wanted: 8,
        };
        assert_eq!(e.to_string(), "Short read at offset 512 (3 of 8 bytes)");
        assert_eq!(DiskIOError::StreamExhausted.to_string(), "Stream exhausted");
    }

    #[test]
    fn converts_into_io_error() {
        let e: std::io::Error = DiskIOError::OutOfBounds { offset: 0, len: 1 }.into();
        assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
