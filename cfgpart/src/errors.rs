// SPDX-License-Identifier: MIT

use core::fmt;

use cfgio::errors::*;

/// MBR structural errors (codec level).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbrError {
    InvalidSignature { expected: [u8; 2], found: [u8; 2] },
    ZeroSectors,
    InvalidBootFlag { got: u8 },
    LbaOverflow { value: u64 },
    Overlap {
        a_start: u64,
        a_end: u64,
        b_start: u64,
        b_end: u64,
    },
}

impl MbrError {
    pub fn msg(&self) -> &'static str {
        match self {
            MbrError::InvalidSignature { .. } => "MBR: invalid boot signature",
            MbrError::ZeroSectors => "MBR: non-empty entry with zero sectors",
            MbrError::InvalidBootFlag { .. } => "MBR: invalid boot flag",
            MbrError::LbaOverflow { .. } => "MBR: LBA does not fit in 32 bits",
            MbrError::Overlap { .. } => "MBR: overlapping partitions",
        }
    }
}

impl fmt::Display for MbrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            MbrError::InvalidSignature { expected, found } => {
                write!(f, " (expected {expected:02X?}, found {found:02X?})")
            }
            MbrError::InvalidBootFlag { got } => write!(f, " (0x{got:02X})"),
            MbrError::LbaOverflow { value } => write!(f, " ({value})"),
            MbrError::Overlap {
                a_start,
                a_end,
                b_start,
                b_end,
            } => write!(f, " ({a_start}..={a_end} and {b_start}..={b_end})"),
            MbrError::ZeroSectors => Ok(()),
        }
    }
}

/// Unified error type for partition planning, transplant and copy.
#[derive(Debug)]
pub enum PartError {
    IO(DiskIOError),
    Mbr(MbrError),
    /// Requested sizes or offsets do not fit the disk.
    GeometryInvalid {
        reason: &'static str,
        requested: u64,
        available: u64,
    },
    /// More than four primary partitions would be required.
    CapacityExceeded { required: usize },
    SlotNotFound(usize),
    Invalid(&'static str),
}

impl PartError {
    pub fn msg(&self) -> &'static str {
        match self {
            PartError::IO(e) => e.msg(),
            PartError::Mbr(e) => e.msg(),
            PartError::GeometryInvalid { reason, .. } => reason,
            PartError::CapacityExceeded { .. } => "MBR supports at most 4 primary partitions",
            PartError::SlotNotFound(_) => "No partition in this slot",
            PartError::Invalid(msg) => msg,
        }
    }

    #[inline]
    pub(crate) fn geometry(reason: &'static str, requested: u64, available: u64) -> Self {
        PartError::GeometryInvalid {
            reason,
            requested,
            available,
        }
    }
}

impl From<&'static str> for PartError {
    fn from(s: &'static str) -> Self {
        PartError::Invalid(s)
    }
}

impl From<DiskIOError> for PartError {
    fn from(e: DiskIOError) -> Self {
        PartError::IO(e)
    }
}

impl From<MbrError> for PartError {
    fn from(e: MbrError) -> Self {
        PartError::Mbr(e)
    }
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartError::IO(e) => write!(f, "{e}"),
            PartError::Mbr(e) => write!(f, "{e}"),
            PartError::GeometryInvalid {
                reason,
                requested,
                available,
            } => write!(f, "{reason} (requested {requested}, available {available})"),
            PartError::CapacityExceeded { required } => {
                write!(f, "{} (required {required})", self.msg())
            }
            PartError::SlotNotFound(slot) => write!(f, "{} (slot {slot})", self.msg()),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

impl std::error::Error for PartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PartError::IO(e) => Some(e),
            _ => None,
        }
    }
}

pub type PartResult<T = ()> = Result<T, PartError>;
