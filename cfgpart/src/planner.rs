// SPDX-License-Identifier: MIT

use core::fmt;

use crate::errors::*;
use crate::geometry::DiskGeometry;
use crate::kinds::PartitionKind;
use crate::mbr::MBR_MAX_ENTRIES;
use crate::table::{PartitionEntry, PartitionTable};

/// Where the new partition goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Starts at this sector; the size is rounded down to whole sectors.
    FixedOffset(u64),
    /// Ends on the last sector of the disk; the size is rounded up.
    Trailing,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::FixedOffset(s) => write!(f, "fixed at sector {s}"),
            Placement::Trailing => write!(f, "trailing"),
        }
    }
}

/// Computes the entry for a new `requested_bytes` partition.
///
/// Existing partitions are only counted, never checked for overlap with the
/// new one; callers that need that guarantee run `PartitionTable::validate`
/// on the final table.
pub fn compute_boundary(
    geometry: &DiskGeometry,
    existing: &PartitionTable,
    requested_bytes: u64,
    placement: Placement,
) -> PartResult<PartitionEntry> {
    let used = existing.non_empty_count();
    if used >= MBR_MAX_ENTRIES {
        return Err(PartError::CapacityExceeded { required: used + 1 });
    }

    let total_bytes = geometry.total_bytes();
    if requested_bytes >= total_bytes {
        return Err(PartError::geometry(
            "Requested partition is not smaller than the disk",
            requested_bytes,
            total_bytes,
        ));
    }

    let (start, count) = match placement {
        Placement::FixedOffset(start) => {
            let count = geometry.bytes_to_sectors_floor(requested_bytes);
            if count == 0 {
                return Err(PartError::geometry(
                    "Requested size is smaller than one sector",
                    requested_bytes,
                    geometry.logical_sector_size,
                ));
            }
            let end = start.checked_add(count).unwrap_or(u64::MAX);
            if end > geometry.total_sectors {
                return Err(PartError::geometry(
                    "Partition ends past the end of the disk",
                    end,
                    geometry.total_sectors,
                ));
            }
            (start, count)
        }
        Placement::Trailing => {
            let count = geometry.bytes_to_sectors_ceil(requested_bytes);
            if count == 0 {
                return Err(PartError::geometry(
                    "Requested size is zero",
                    requested_bytes,
                    geometry.total_bytes(),
                ));
            }
            (geometry.total_sectors - count, count)
        }
    };

    if !geometry.is_physically_aligned(start) {
        log::warn!(
            "Partition start {start} is not aligned to the {} B physical sector",
            geometry.physical_sector_size
        );
    }
    log::debug!("Planned partition ({placement}): start={start} sectors={count}");

    Ok(PartitionEntry::new(PartitionKind::Linux, start, count))
}
