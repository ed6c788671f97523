// SPDX-License-Identifier: MIT

//! Disk geometry snapshot used by every planning step.

use core::fmt;

use crate::{DEFAULT_SECTOR_SIZE, errors::*};
use cfgio::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    pub total_sectors: u64,
    pub logical_sector_size: u64,
    pub physical_sector_size: u64,
}

impl DiskGeometry {
    pub fn new(
        total_sectors: u64,
        logical_sector_size: u64,
        physical_sector_size: u64,
    ) -> PartResult<Self> {
        if logical_sector_size == 0 || !logical_sector_size.is_power_of_two() {
            return Err(PartError::geometry(
                "Logical sector size must be a power of two",
                logical_sector_size,
                0,
            ));
        }
        if physical_sector_size < logical_sector_size
            || !physical_sector_size.is_power_of_two()
        {
            return Err(PartError::geometry(
                "Physical sector size must be a power-of-two multiple of the logical size",
                physical_sector_size,
                logical_sector_size,
            ));
        }
        if total_sectors.checked_mul(logical_sector_size).is_none() {
            return Err(PartError::geometry(
                "Disk size overflows 64 bits",
                total_sectors,
                u64::MAX / logical_sector_size,
            ));
        }
        Ok(Self {
            total_sectors,
            logical_sector_size,
            physical_sector_size,
        })
    }

    /// Geometry of a medium of `len_bytes` bytes (trailing partial sector dropped).
    pub fn from_len(
        len_bytes: u64,
        logical_sector_size: u64,
        physical_sector_size: u64,
    ) -> PartResult<Self> {
        if logical_sector_size == 0 {
            return Err(PartError::geometry(
                "Logical sector size must be a power of two",
                0,
                0,
            ));
        }
        Self::new(
            len_bytes / logical_sector_size,
            logical_sector_size,
            physical_sector_size,
        )
    }

    /// Queries the backend size once.
    pub fn detect<IO: DiskIOLen + ?Sized>(
        io: &mut IO,
        logical_sector_size: u64,
        physical_sector_size: u64,
    ) -> PartResult<Self> {
        let len = io.len()?;
        let geometry = Self::from_len(len, logical_sector_size, physical_sector_size)?;
        log::debug!("Detected geometry: {geometry}");
        Ok(geometry)
    }

    /// 512-byte logical and physical sectors.
    pub fn with_default_sectors(total_sectors: u64) -> PartResult<Self> {
        Self::new(total_sectors, DEFAULT_SECTOR_SIZE, DEFAULT_SECTOR_SIZE)
    }

    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.total_sectors * self.logical_sector_size
    }

    #[inline]
    pub fn bytes_to_sectors_floor(&self, bytes: u64) -> u64 {
        bytes / self.logical_sector_size
    }

    #[inline]
    pub fn bytes_to_sectors_ceil(&self, bytes: u64) -> u64 {
        bytes.div_ceil(self.logical_sector_size)
    }

    #[inline]
    pub fn sectors_to_bytes(&self, sectors: u64) -> u64 {
        sectors.saturating_mul(self.logical_sector_size)
    }

    /// `true` if `lba` starts on a physical sector boundary.
    #[inline]
    pub fn is_physically_aligned(&self, lba: u64) -> bool {
        let ratio = self.physical_sector_size / self.logical_sector_size;
        lba % ratio == 0
    }
}

impl fmt::Display for DiskGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sectors x {} B (physical {} B, {} bytes)",
            self.total_sectors,
            self.logical_sector_size,
            self.physical_sector_size,
            self.total_bytes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_len_rounds_down() {
        let g = DiskGeometry::from_len(20 * 1024 * 1024 + 100, 512, 512).unwrap();
        assert_eq!(g.total_sectors, 40960);
        assert_eq!(g.total_bytes(), 20 * 1024 * 1024);
    }

    #[test]
    fn sector_conversions() {
        let g = DiskGeometry::with_default_sectors(1000).unwrap();
        assert_eq!(g.bytes_to_sectors_floor(1023), 1);
        assert_eq!(g.bytes_to_sectors_ceil(1023), 2);
        assert_eq!(g.bytes_to_sectors_ceil(1024), 2);
        assert_eq!(g.sectors_to_bytes(3), 1536);
    }

    #[test]
    fn invalid_sector_sizes() {
        assert!(DiskGeometry::new(10, 0, 512).is_err());
        assert!(DiskGeometry::new(10, 500, 500).is_err());
        assert!(DiskGeometry::new(10, 4096, 512).is_err());
        assert!(DiskGeometry::new(u64::MAX, 512, 512).is_err());
    }

    #[test]
    fn physical_alignment() {
        let g = DiskGeometry::new(4096, 512, 4096).unwrap();
        assert!(g.is_physically_aligned(2048));
        assert!(!g.is_physically_aligned(2049));
        let flat = DiskGeometry::with_default_sectors(4096).unwrap();
        assert!(flat.is_physically_aligned(2049));
    }

    #[test]
    fn detect_uses_backend_len() {
        let mut buf = vec![0u8; 8192];
        let mut io = MemDiskIO::new(&mut buf);
        let g = DiskGeometry::detect(&mut io, 512, 512).unwrap();
        assert_eq!(g.total_sectors, 16);
    }
}
