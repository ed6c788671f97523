// SPDX-License-Identifier: MIT

//! Partition content transfer between images.

use crate::errors::*;
use crate::geometry::DiskGeometry;
use crate::io_ext::DiskIOLbaExt;
use crate::table::PartitionTable;
use crate::transplant::PartitionMove;
use cfgio::COPY_BUF_SIZE;
use cfgio::prelude::*;

/// Streams the source partition of `mv` into its destination slot.
///
/// `progress` receives `(bytes_written, bytes_total)` after every chunk.
pub fn copy_partition<S, D, F>(
    src: &mut S,
    src_geometry: &DiskGeometry,
    mv: &PartitionMove,
    dest: &mut D,
    dest_table: &PartitionTable,
    progress: F,
) -> PartResult<u64>
where
    S: DiskIO + ?Sized,
    D: DiskIO + ?Sized,
    F: FnMut(u64, u64),
{
    let sector = src_geometry.logical_sector_size;
    let start = mv
        .source
        .start_sector
        .checked_mul(sector)
        .ok_or(PartError::Invalid("Source partition offset overflows"))?;
    let len = mv
        .source
        .sector_count
        .checked_mul(sector)
        .ok_or(PartError::Invalid("Source partition length overflows"))?;

    log::debug!(
        "Copying source partition {} ({len} bytes at {start}) into slot {}",
        mv.source_slot,
        mv.dest_slot
    );
    let mut reader = RegionReader::new(src, start, len)?;
    write_partition_contents(dest, dest_table, mv.dest_slot, &mut reader, progress)
}

/// Writes everything `reader` yields from the first sector of `slot`.
///
/// Returns the number of bytes written. A stream longer than the partition
/// fails before anything is written.
pub fn write_partition_contents<S, D, F>(
    dest: &mut D,
    table: &PartitionTable,
    slot: usize,
    reader: &mut RegionReader<'_, S>,
    mut progress: F,
) -> PartResult<u64>
where
    S: DiskIO + ?Sized,
    D: DiskIO + ?Sized,
    F: FnMut(u64, u64),
{
    let entry = table.slot(slot)?;
    let sector = table.geometry().logical_sector_size;
    let capacity = entry.byte_len(sector);
    let total = reader.remaining();
    if total > capacity {
        return Err(PartError::geometry(
            "Partition contents do not fit the destination slot",
            total,
            capacity,
        ));
    }

    let base = entry
        .start_sector
        .checked_mul(sector)
        .ok_or(PartError::Invalid("Destination partition offset overflows"))?;
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut written = 0u64;
    loop {
        let chunk = reader.read(&mut buf)?;
        if chunk.len > 0 {
            dest.write_at(base + written, &buf[..chunk.len])?;
            written += chunk.len as u64;
            progress(written, total);
        }
        if chunk.done {
            break;
        }
    }
    dest.flush()?;
    Ok(written)
}

/// Zero-fills the whole extent of `slot`. Returns the number of bytes cleared.
pub fn zero_partition<D: DiskIO + ?Sized>(
    dest: &mut D,
    table: &PartitionTable,
    slot: usize,
) -> PartResult<u64> {
    let entry = table.slot(slot)?;
    let sector = table.geometry().logical_sector_size;
    dest.zero_fill_lba(entry.start_sector, entry.sector_count, sector)?;
    dest.flush()?;
    log::debug!(
        "Zeroed slot {slot}: {} sectors from {}",
        entry.sector_count,
        entry.start_sector
    );
    Ok(entry.byte_len(sector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::PartitionKind;
    use crate::table::PartitionEntry;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 253) as u8 + 1).collect()
    }

    fn table(total: u64, entries: &[PartitionEntry]) -> PartitionTable {
        PartitionTable::from_entries(DiskGeometry::with_default_sectors(total).unwrap(), entries)
            .unwrap()
    }

    #[test]
    fn copies_partition_to_new_offset() {
        let mut src_buf = patterned(512 * 400);
        let expected = src_buf[512 * 100..512 * 300].to_vec();
        let src_geometry = DiskGeometry::with_default_sectors(400).unwrap();
        let src_entry = PartitionEntry::new(PartitionKind::Linux, 100, 200);

        let dest_table = table(
            600,
            &[
                PartitionEntry::new(PartitionKind::Linux, 10, 50),
                PartitionEntry::new(PartitionKind::Linux, 300, 200),
            ],
        );
        let mv = PartitionMove {
            source: src_entry,
            source_slot: 1,
            dest_slot: 2,
        };

        let mut dest_buf = vec![0u8; 512 * 600];
        let mut calls = Vec::new();
        {
            let mut src = MemDiskIO::new(&mut src_buf);
            let mut dest = MemDiskIO::new(&mut dest_buf);
            let n = copy_partition(
                &mut src,
                &src_geometry,
                &mv,
                &mut dest,
                &dest_table,
                |done, total| calls.push((done, total)),
            )
            .unwrap();
            assert_eq!(n, 200 * 512);
        }
        assert_eq!(&dest_buf[512 * 300..512 * 500], &expected[..]);
        assert!(dest_buf[..512 * 300].iter().all(|&b| b == 0));
        assert!(dest_buf[512 * 500..].iter().all(|&b| b == 0));
        assert_eq!(calls.last(), Some(&(102_400, 102_400)));
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn oversized_stream_is_rejected() {
        let mut src_buf = patterned(4096);
        let mut dest_buf = vec![0u8; 4096];
        let dest_table = table(8, &[PartitionEntry::new(PartitionKind::Linux, 1, 2)]);

        let mut src = MemDiskIO::new(&mut src_buf);
        let mut dest = MemDiskIO::new(&mut dest_buf);
        let mut reader = RegionReader::new(&mut src, 0, 3 * 512).unwrap();
        let res = write_partition_contents(&mut dest, &dest_table, 1, &mut reader, |_, _| {});
        assert!(matches!(
            res,
            Err(PartError::GeometryInvalid {
                requested: 1536,
                available: 1024,
                ..
            })
        ));
        drop(dest);
        assert!(dest_buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn truncated_source_is_a_short_read() {
        let mut src_buf = patterned(512 * 10);
        let mut dest_buf = vec![0u8; 512 * 64];
        let dest_table = table(64, &[PartitionEntry::new(PartitionKind::Linux, 8, 32)]);
        let mv = PartitionMove {
            source: PartitionEntry::new(PartitionKind::Linux, 4, 20),
            source_slot: 1,
            dest_slot: 1,
        };

        let mut src = MemDiskIO::new(&mut src_buf);
        let mut dest = MemDiskIO::new(&mut dest_buf);
        let res = copy_partition(
            &mut src,
            &DiskGeometry::with_default_sectors(10).unwrap(),
            &mv,
            &mut dest,
            &dest_table,
            |_, _| {},
        );
        assert!(matches!(
            res,
            Err(PartError::IO(DiskIOError::ShortRead { .. }))
        ));
    }

    #[test]
    fn zero_partition_clears_exact_extent() {
        let mut buf = vec![0xAAu8; 512 * 16];
        let t = table(16, &[PartitionEntry::new(PartitionKind::Linux, 4, 8)]);
        {
            let mut io = MemDiskIO::new(&mut buf);
            assert_eq!(zero_partition(&mut io, &t, 1).unwrap(), 8 * 512);
            assert!(zero_partition(&mut io, &t, 2).is_err());
        }
        assert!(buf[..512 * 4].iter().all(|&b| b == 0xAA));
        assert!(buf[512 * 4..512 * 12].iter().all(|&b| b == 0));
        assert!(buf[512 * 12..].iter().all(|&b| b == 0xAA));
    }
}
