// SPDX-License-Identifier: MIT

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::{DiskIO, DiskIOLen, DiskIOResult, DiskIOSetLen};

/// `DiskIO` over any seekable std stream (image file, block device, cursor).
#[derive(Debug)]
pub struct StdDiskIO<'a, T: Read + Write + Seek> {
    io: &'a mut T,
}

impl<'a, T: Read + Write + Seek> StdDiskIO<'a, T> {
    #[inline]
    pub fn new(io: &'a mut T) -> Self {
        Self { io }
    }
}

impl<T: Read + Write + Seek> DiskIO for StdDiskIO<'_, T> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> DiskIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn read_at_partial(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult<usize> {
        self.io.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.io.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn flush(&mut self) -> DiskIOResult {
        self.io.flush()?;
        Ok(())
    }
}

impl<T: Read + Write + Seek> DiskIOLen for StdDiskIO<'_, T> {
    /// Works for regular files and block devices alike (seek to end).
    fn len(&mut self) -> DiskIOResult<u64> {
        let len = self.io.seek(SeekFrom::End(0))?;
        self.io.seek(SeekFrom::Start(0))?;
        Ok(len)
    }
}

impl DiskIOSetLen for StdDiskIO<'_, std::fs::File> {
    fn set_len(&mut self, len: u64) -> DiskIOResult {
        self.io.set_len(len)?;
        self.flush()?;
        self.io.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::*;
    use tempfile::tempfile;

    #[test]
    fn test_rw() {
        let mut file = tempfile().unwrap();
        let mut io = StdDiskIO::new(&mut file);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_set_len_and_len() {
        let mut file = tempfile().unwrap();
        let mut io = StdDiskIO::new(&mut file);

        io.set_len(4096).unwrap();
        assert_eq!(io.len().unwrap(), 4096);
        assert!(io.set_len(u64::MAX).is_err());
    }

    #[test]
    fn test_read_partial_past_end() {
        let mut file = tempfile().unwrap();
        let mut io = StdDiskIO::new(&mut file);
        io.set_len(100).unwrap();
        io.write_at(96, &[9, 9, 9, 9]).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(io.read_at_partial(96, &mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], &[9, 9, 9, 9]);
        assert_eq!(io.read_at_partial(100, &mut buf).unwrap(), 0);
        assert!(io.read_at(96, &mut buf).is_err());
    }

    #[test]
    fn test_zero_fill() {
        let mut file = tempfile().unwrap();
        let mut io = StdDiskIO::new(&mut file);

        io.write_at(42, &[0xFF; 8]).unwrap();
        io.zero_fill(42, 8).unwrap();

        let mut buf = [0xAA; 8];
        io.read_at(42, &mut buf).unwrap();

        assert_eq!(buf, [0u8; 8]);
    }

    #[test]
    fn test_primitive_rw() {
        let mut file = tempfile().unwrap();
        let mut io = StdDiskIO::new(&mut file);

        io.write_u16_at(510, 0xAA55).unwrap();
        assert_eq!(io.read_u16_at(510).unwrap(), 0xAA55);

        let mut raw = [0u8; 2];
        io.read_at(510, &mut raw).unwrap();
        assert_eq!(raw, [0x55, 0xAA]);
    }
}
