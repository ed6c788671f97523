// SPDX-License-Identifier: MIT

use core::fmt;

use cfgio::errors::DiskIOError;

/// Errors raised while formatting or filling a config-drive volume.
#[derive(Debug)]
pub enum FsError {
    /// Underlying block IO error.
    Io(DiskIOError),
    /// A metadata document could not be serialized.
    Encoding(serde_json::Error),
    InvalidLabel(&'static str),
    /// The region cannot hold a FAT32 volume.
    TooSmall { size: u64, min: u64 },
    /// No free cluster left for the data being written.
    NoSpace { needed: u32, free: u32 },
    /// Path component missing from its directory.
    NotFound(String),
    /// On-disk structures are inconsistent.
    Corrupted(&'static str),
    Other(&'static str),
}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::Io(e) => e.msg(),
            FsError::Encoding(_) => "Metadata encoding failed",
            FsError::InvalidLabel(msg) => msg,
            FsError::TooSmall { .. } => "Region too small for FAT32",
            FsError::NoSpace { .. } => "Volume is full",
            FsError::NotFound(_) => "No such file or directory",
            FsError::Corrupted(msg) => msg,
            FsError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::Io(e) => write!(f, "Filesystem IO error: {e}"),
            FsError::Encoding(e) => write!(f, "{}: {e}", self.msg()),
            FsError::TooSmall { size, min } => {
                write!(f, "{} ({size} bytes, need at least {min})", self.msg())
            }
            FsError::NoSpace { needed, free } => {
                write!(f, "{} ({needed} clusters needed, {free} free)", self.msg())
            }
            FsError::NotFound(name) => write!(f, "{}: '{name}'", self.msg()),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Io(e) => Some(e),
            FsError::Encoding(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DiskIOError> for FsError {
    fn from(e: DiskIOError) -> Self {
        FsError::Io(e)
    }
}

impl From<serde_json::Error> for FsError {
    fn from(e: serde_json::Error) -> Self {
        FsError::Encoding(e)
    }
}

impl From<&'static str> for FsError {
    fn from(s: &'static str) -> Self {
        FsError::Other(s)
    }
}

pub type FsResult<T = ()> = Result<T, FsError>;
