// SPDX-License-Identifier: MIT

//! "LBA-aware" DiskIO helpers to avoid `* sector_size` everywhere.

use cfgio::errors::DiskIOError;
use cfgio::prelude::*;

/// Offset = LBA * sector_size (with overflow-check)
#[inline]
fn lba_offset(lba: u64, sector_size: u64) -> DiskIOResult<u64> {
    lba.checked_mul(sector_size)
        .ok_or(DiskIOError::Other("lba_offset overflow"))
}

/// Byte length of `sectors` sectors (with overflow-check)
#[inline]
fn lba_span(sectors: u64, sector_size: u64) -> DiskIOResult<u64> {
    sectors
        .checked_mul(sector_size)
        .ok_or(DiskIOError::Other("lba_span overflow"))
}

pub trait DiskIOLbaExt: DiskIO {
    /// Zeroes `sectors` sectors starting from an LBA.
    #[inline]
    fn zero_fill_lba(&mut self, lba: u64, sectors: u64, sector_size: u64) -> DiskIOResult {
        let off = lba_offset(lba, sector_size)?;
        let len = lba_span(sectors, sector_size)?;
        self.zero_fill(off, len)
    }
}

impl<T: DiskIO + ?Sized> DiskIOLbaExt for T {}
