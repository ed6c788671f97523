// SPDX-License-Identifier: MIT

use crate::{DiskIO, DiskIOLen, DiskIOResult};

/// Simple IO counters.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub flushes: u64,

    // Largest single transfer, useful to diagnose granularity
    pub max_read: u64,
    pub max_write: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }

    fn on_read(&mut self, len: u64) {
        self.reads += 1;
        self.read_bytes += len;
        self.max_read = self.max_read.max(len);
    }

    fn on_write(&mut self, len: u64) {
        self.writes += 1;
        self.write_bytes += len;
        self.max_write = self.max_write.max(len);
    }
}

/// Transparent instrumentation wrapper.
pub struct IOCounter<'a, IO: DiskIO + ?Sized> {
    inner: &'a mut IO,
    pub stats: IoStats,
}

impl<'a, IO: DiskIO + ?Sized> IOCounter<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }
}

impl<IO: DiskIO + ?Sized> DiskIO for IOCounter<'_, IO> {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> DiskIOResult {
        self.stats.on_write(data.len() as u64);
        self.inner.write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult {
        self.stats.on_read(buf.len() as u64);
        self.inner.read_at(offset, buf)
    }

    #[inline]
    fn read_at_partial(&mut self, offset: u64, buf: &mut [u8]) -> DiskIOResult<usize> {
        let n = self.inner.read_at_partial(offset, buf)?;
        self.stats.on_read(n as u64);
        Ok(n)
    }

    #[inline]
    fn flush(&mut self) -> DiskIOResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }
}

impl<IO: DiskIOLen + ?Sized> DiskIOLen for IOCounter<'_, IO> {
    fn len(&mut self) -> DiskIOResult<u64> {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn counts_transfers() {
        let mut buf = [0u8; 128];
        let mut io = MemDiskIO::new(&mut buf);
        let mut counter = IOCounter::new(&mut io);

        counter.write_at(0, &[1; 16]).unwrap();
        counter.write_at(16, &[2; 4]).unwrap();
        let mut out = [0u8; 8];
        counter.read_at(0, &mut out).unwrap();
        counter.flush().unwrap();

        let stats = counter.snapshot();
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.write_bytes, 20);
        assert_eq!(stats.max_write, 16);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.flushes, 1);

        counter.stats.reset();
        assert_eq!(counter.snapshot(), IoStats::default());
    }
}
