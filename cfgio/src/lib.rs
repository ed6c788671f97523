// SPDX-License-Identifier: MIT

// Core modules
pub mod errors;
mod macros;
pub mod region;
pub mod stats;
pub mod stream;

// Backend modules
mod file;
mod mem;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::DiskIO;
    pub use super::DiskIOExt;
    pub use super::DiskIOLen;
    pub use super::DiskIOSetLen;
    pub use super::DiskIOStructExt;
    pub use super::errors::*;
    pub use super::file::StdDiskIO;
    pub use super::mem::MemDiskIO;
    pub use super::region::{RegionChunk, RegionReader};
    pub use super::stats::*;
    pub use super::stream::DiskIOStream;
}

// Internal use
use errors::*;

// Constants

/// Size of the internal scratch buffer used for chunked ops.
/// 4 KiB = typical page size and common physical sector size.
pub const BLOCK_BUF_SIZE: usize = 4096;

/// Chunk size used when streaming whole partitions (64 KiB).
pub const COPY_BUF_SIZE: usize = 64 * 1024;

// Traits

/// Block IO abstraction trait.
///
/// Allows read/write/flush at arbitrary absolute offsets.
/// Implementations may target RAM, image files or block devices.
pub trait DiskIO {
    /// Writes `data` at `offset` (absolute).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> DiskIOResult;

    /// Reads exactly `buf.len()` bytes into `buf` from `offset` (absolute).
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult;

    /// Reads up to `buf.len()` bytes from `offset` and returns the count.
    ///
    /// Returns fewer bytes only when the medium ends before `buf` is full,
    /// and `0` when `offset` is at or past the end.
    fn read_at_partial(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult<usize> {
        self.read_at(offset, buf)?;
        Ok(buf.len())
    }

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> DiskIOResult;
}

/// Extension helpers for DiskIO.
///
/// - zero fill
/// - little-endian primitive helpers (read_u16_at, write_u32_at, ...)
pub trait DiskIOExt: DiskIO {
    /// Fills `len` bytes starting at `offset` with zeroes.
    ///
    /// Used to wipe a partition before a filesystem is created on it.
    #[inline(always)]
    fn zero_fill(&mut self, offset: u64, len: u64) -> DiskIOResult {
        static ZERO_BUF: [u8; COPY_BUF_SIZE] = [0u8; COPY_BUF_SIZE];
        let mut remaining = len;
        let mut off = offset;
        while remaining > 0 {
            let chunk = remaining.min(ZERO_BUF.len() as u64) as usize;
            self.write_at(off, &ZERO_BUF[..chunk])?;
            off += chunk as u64;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    // Implements read/write helpers for primitive types (u16, u32, u64)
    diskio_impl_primitive_rw!(u16, u32, u64);
}

impl<T: DiskIO + ?Sized> DiskIOExt for T {}

/// Backends that know their total addressable size.
pub trait DiskIOLen: DiskIO {
    /// Total size in bytes.
    fn len(&mut self) -> DiskIOResult<u64>;

    fn is_empty(&mut self) -> DiskIOResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Backends whose storage can be resized (image files).
pub trait DiskIOSetLen: DiskIO {
    /// Sets the length of the storage; growing a file leaves it sparse.
    fn set_len(&mut self, len: u64) -> DiskIOResult;
}

/// Extension trait for reading and writing structs using zerocopy.
///
/// Requires the struct to implement zerocopy traits for safe conversion.
pub trait DiskIOStructExt: DiskIO {
    /// Reads a struct of type `T` from the given offset.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
    ) -> DiskIOResult<T> {
        let size = core::mem::size_of::<T>();
        if size > BLOCK_BUF_SIZE {
            return Err(DiskIOError::Other("read_struct: type too large"));
        }
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        self.read_at(offset, &mut buf[..size])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| DiskIOError::Other("read_struct failed"))
    }

    /// Writes a struct of type `T` at the given offset.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
        val: &T,
    ) -> DiskIOResult {
        self.write_at(offset, val.as_bytes())
    }
}

impl<T: DiskIO + ?Sized> DiskIOStructExt for T {}
