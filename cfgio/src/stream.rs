// SPDX-License-Identifier: MIT

//! View over a byte range of a `DiskIO`.
//!
//! Offsets are relative to the start of the range, both through `DiskIO`
//! and through `std::io`, so filesystem code can work on a single partition
//! as if it were a disk of its own.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::{DiskIO, DiskIOError, DiskIOLen, DiskIOResult};

pub struct DiskIOStream<'a, IO: DiskIO + ?Sized> {
    io: &'a mut IO,
    start: u64,
    len: u64,
    pos: u64,
}

impl<'a, IO: DiskIO + ?Sized> DiskIOStream<'a, IO> {
    pub fn new(io: &'a mut IO, start: u64, len: u64) -> Result<Self, DiskIOError> {
        start
            .checked_add(len)
            .ok_or(DiskIOError::OutOfBounds { offset: start, len })?;
        Ok(Self {
            io,
            start,
            len,
            pos: 0,
        })
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Absolute offset of `[offset, offset + len)`, if it lies in the range.
    fn absolute(&self, offset: u64, len: usize) -> DiskIOResult<u64> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.len => Ok(self.start + offset),
            _ => Err(DiskIOError::OutOfBounds {
                offset,
                len: len as u64,
            }),
        }
    }

    fn clamp_pos(&self, pos: i128) -> io::Result<u64> {
        if pos < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid seek"));
        }
        if pos > self.len as i128 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek out of range",
            ));
        }
        Ok(pos as u64)
    }
}

impl<IO: DiskIO + ?Sized> Read for DiskIOStream<'_, IO> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len {
            return Ok(0);
        }
        let n = (self.len - self.pos).min(buf.len() as u64) as usize;
        self.io.read_at(self.start + self.pos, &mut buf[..n])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<IO: DiskIO + ?Sized> Write for DiskIOStream<'_, IO> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos >= self.len {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "no space"));
        }
        let n = (self.len - self.pos).min(buf.len() as u64) as usize;
        self.io.write_at(self.start + self.pos, &buf[..n])?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.io.flush()?;
        Ok(())
    }
}

impl<IO: DiskIO + ?Sized> Seek for DiskIOStream<'_, IO> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = match pos {
            SeekFrom::Start(off) => self.clamp_pos(off as i128)?,
            SeekFrom::End(off) => self.clamp_pos(self.len as i128 + off as i128)?,
            SeekFrom::Current(off) => self.clamp_pos(self.pos as i128 + off as i128)?,
        };
        Ok(self.pos)
    }
}

impl<IO: DiskIO + ?Sized> DiskIO for DiskIOStream<'_, IO> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> DiskIOResult {
        let abs = self.absolute(offset, data.len())?;
        self.io.write_at(abs, data)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult {
        let abs = self.absolute(offset, buf.len())?;
        self.io.read_at(abs, buf)
    }

    fn read_at_partial(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult<usize> {
        if offset >= self.len {
            return Ok(0);
        }
        let n = (self.len - offset).min(buf.len() as u64) as usize;
        self.io.read_at_partial(self.start + offset, &mut buf[..n])
    }

    fn flush(&mut self) -> DiskIOResult {
        self.io.flush()
    }
}

impl<IO: DiskIO + ?Sized> DiskIOLen for DiskIOStream<'_, IO> {
    fn len(&mut self) -> DiskIOResult<u64> {
        Ok(self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn confined_to_region() {
        let mut disk = vec![0u8; 64];
        let mut io = MemDiskIO::new(&mut disk);
        {
            let mut stream = DiskIOStream::new(&mut io, 16, 8).unwrap();
            assert_eq!(stream.write(&[0xAB; 12]).unwrap(), 8);
            assert!(stream.write(&[1]).is_err());

            assert_eq!(stream.seek(SeekFrom::End(-2)).unwrap(), 6);
            let mut tail = [0u8; 4];
            assert_eq!(stream.read(&mut tail).unwrap(), 2);
            assert_eq!(stream.read(&mut tail).unwrap(), 0);
            assert!(stream.seek(SeekFrom::Current(1)).is_err());
        }
        assert_eq!(&disk[..16], &[0u8; 16]);
        assert_eq!(&disk[16..24], &[0xAB; 8]);
        assert_eq!(&disk[24..], &[0u8; 40]);
    }

    #[test]
    fn diskio_offsets_are_relative() {
        let mut disk = vec![0u8; 64];
        let mut io = MemDiskIO::new(&mut disk);
        {
            let mut region = DiskIOStream::new(&mut io, 32, 16).unwrap();
            region.write_u32_at(0, 0x0FFF_FFFF).unwrap();
            region.zero_fill(4, 12).unwrap();
            assert_eq!(region.read_u32_at(0).unwrap(), 0x0FFF_FFFF);
            assert_eq!(DiskIOLen::len(&mut region).unwrap(), 16);

            assert!(matches!(
                region.write_at(14, &[1, 2, 3]),
                Err(DiskIOError::OutOfBounds { offset: 14, len: 3 })
            ));
            let mut buf = [0xAAu8; 8];
            assert_eq!(region.read_at_partial(12, &mut buf).unwrap(), 4);
            assert_eq!(region.read_at_partial(16, &mut buf).unwrap(), 0);
        }
        assert_eq!(&disk[32..36], &[0xFF, 0xFF, 0xFF, 0x0F]);
        assert!(disk[..32].iter().all(|&b| b == 0));
    }

    #[test]
    fn read_to_end_stops_at_region_end() {
        let mut disk: Vec<u8> = (0..32u8).collect();
        let mut io = MemDiskIO::new(&mut disk);
        let mut stream = DiskIOStream::new(&mut io, 4, 6).unwrap();

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![4, 5, 6, 7, 8, 9]);
    }
}
