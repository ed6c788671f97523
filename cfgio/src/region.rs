// SPDX-License-Identifier: MIT

//! Bounded, forward-only view over a byte range of a `DiskIO`.
//!
//! `RegionReader` exposes `[start, start + len)` of its source as a
//! sequential stream. End of stream is reported by the call that consumes
//! the last byte of the window, together with that call's byte count.
//! Any call after that fails with `DiskIOError::StreamExhausted`.

use crate::{DiskIO, DiskIOError, DiskIOResult};

/// Outcome of one `RegionReader::read` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionChunk {
    /// Bytes written into the caller's buffer.
    pub len: usize,
    /// `true` once the window has been fully consumed.
    pub done: bool,
}

pub struct RegionReader<'a, IO: DiskIO + ?Sized> {
    io: &'a mut IO,
    start: u64,
    len: u64,
    cursor: u64,
    finished: bool,
}

impl<'a, IO: DiskIO + ?Sized> RegionReader<'a, IO> {
    /// Opens a window of `len` bytes starting at absolute offset `start`.
    pub fn new(io: &'a mut IO, start: u64, len: u64) -> DiskIOResult<Self> {
        start
            .checked_add(len)
            .ok_or(DiskIOError::OutOfBounds { offset: start, len })?;
        Ok(Self {
            io,
            start,
            len,
            cursor: 0,
            finished: false,
        })
    }

    /// Reads the next bytes of the window into `buf`.
    ///
    /// Reads at most `min(buf.len(), remaining)` bytes. A medium that ends
    /// inside the window yields `ShortRead` after the cursor has been moved
    /// past the bytes that were actually read.
    pub fn read(&mut self, buf: &mut [u8]) -> DiskIOResult<RegionChunk> {
        if self.finished {
            return Err(DiskIOError::StreamExhausted);
        }

        let wanted = (buf.len() as u64).min(self.remaining()) as usize;
        if wanted > 0 {
            let offset = self.start + self.cursor;
            let read = self.io.read_at_partial(offset, &mut buf[..wanted])?;
            self.cursor += read as u64;
            if read < wanted {
                return Err(DiskIOError::ShortRead {
                    offset,
                    read,
                    wanted,
                });
            }
        }

        let done = self.cursor == self.len;
        self.finished = done;
        Ok(RegionChunk { len: wanted, done })
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Window length in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.cursor
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        self.len - self.cursor
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.finished
    }
}
