// SPDX-License-Identifier: MIT

use crate::{DiskIO, DiskIOError, DiskIOLen, DiskIOResult};

/// In-memory implementation of `DiskIO`.
///
/// Useful for tests and small virtual disks.
#[derive(Debug)]
pub struct MemDiskIO<'a> {
    buffer: &'a mut [u8],
}

impl<'a> MemDiskIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer }
    }

    #[inline]
    fn check_bounds(&self, offset: u64, len: usize) -> DiskIOResult {
        let end = offset
            .checked_add(len as u64)
            .ok_or(DiskIOError::OutOfBounds {
                offset,
                len: len as u64,
            })?;
        if end > self.buffer.len() as u64 {
            return Err(DiskIOError::OutOfBounds {
                offset,
                len: len as u64,
            });
        }
        Ok(())
    }
}

impl DiskIO for MemDiskIO<'_> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> DiskIOResult {
        self.check_bounds(offset, data.len())?;
        let start = offset as usize;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult {
        self.check_bounds(offset, buf.len())?;
        let start = offset as usize;
        buf.copy_from_slice(&self.buffer[start..start + buf.len()]);
        Ok(())
    }

    fn read_at_partial(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult<usize> {
        if offset >= self.buffer.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.buffer.len() - start);
        buf[..n].copy_from_slice(&self.buffer[start..start + n]);
        Ok(n)
    }

    #[inline]
    fn flush(&mut self) -> DiskIOResult {
        Ok(())
    }
}

impl DiskIOLen for MemDiskIO<'_> {
    fn len(&mut self) -> DiskIOResult<u64> {
        Ok(self.buffer.len() as u64)
    }
}
