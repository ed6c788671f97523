// SPDX-License-Identifier: MIT

use core::fmt;

use cfgfs::FsError;
use cfgio::errors::DiskIOError;
use cfgpart::errors::{MbrError, PartError};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a provisioning run. Every variant is fatal; nothing is rolled back.
#[derive(Debug)]
pub enum ProvisionError {
    /// Sizes, offsets or sector sizes do not fit the disk.
    GeometryInvalid(String),
    /// The table would need more than four primary partitions.
    CapacityExceeded { required: usize },
    /// A partition stream was read past its end.
    StreamExhausted,
    /// Storage failure, with the step that hit it.
    IOFailure {
        context: &'static str,
        source: BoxError,
    },
    /// A metadata document or label could not be encoded.
    EncodingFailure(String),
}

impl ProvisionError {
    pub fn msg(&self) -> &'static str {
        match self {
            ProvisionError::GeometryInvalid(_) => "Invalid geometry",
            ProvisionError::CapacityExceeded { .. } => "Partition table full",
            ProvisionError::StreamExhausted => "Partition stream exhausted",
            ProvisionError::IOFailure { .. } => "IO failure",
            ProvisionError::EncodingFailure(_) => "Encoding failure",
        }
    }

    pub fn io<E: Into<BoxError>>(context: &'static str, err: E) -> Self {
        ProvisionError::IOFailure {
            context,
            source: err.into(),
        }
    }

    /// Classifies a partitioning error raised during `context`.
    pub fn from_part(err: PartError, context: &'static str) -> Self {
        match err {
            PartError::GeometryInvalid { .. } => ProvisionError::GeometryInvalid(err.to_string()),
            PartError::CapacityExceeded { required } => {
                ProvisionError::CapacityExceeded { required }
            }
            PartError::IO(DiskIOError::StreamExhausted) => ProvisionError::StreamExhausted,
            PartError::IO(e) => ProvisionError::io(context, e),
            PartError::Mbr(MbrError::InvalidSignature { .. }) => ProvisionError::io(context, err),
            PartError::Mbr(_)
            | PartError::SlotNotFound(_)
            | PartError::Invalid(_) => ProvisionError::GeometryInvalid(err.to_string()),
        }
    }

    /// Classifies a filesystem error raised during `context`.
    pub fn from_fs(err: FsError, context: &'static str) -> Self {
        match err {
            FsError::Encoding(_) | FsError::InvalidLabel(_) => {
                ProvisionError::EncodingFailure(err.to_string())
            }
            FsError::TooSmall { .. } | FsError::NoSpace { .. } => {
                ProvisionError::GeometryInvalid(err.to_string())
            }
            FsError::Io(_)
            | FsError::NotFound(_)
            | FsError::Corrupted(_)
            | FsError::Other(_) => ProvisionError::io(context, err),
        }
    }
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionError::GeometryInvalid(detail) | ProvisionError::EncodingFailure(detail) => {
                write!(f, "{}: {detail}", self.msg())
            }
            ProvisionError::CapacityExceeded { required } => write!(
                f,
                "{}: {required} primary partitions needed, MBR holds 4",
                self.msg()
            ),
            ProvisionError::StreamExhausted => write!(f, "{}", self.msg()),
            ProvisionError::IOFailure { context, source } => {
                write!(f, "{} while {context}: {source}", self.msg())
            }
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProvisionError::IOFailure { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;
