// SPDX-License-Identifier: MIT

use cfgio::prelude::*;
use zerocopy::IntoBytes;

use crate::errors::*;
use crate::fat32::{constant::*, meta::Fat32Meta, names::FatTimestamp, types::*};

/// Writes an empty FAT32 filesystem described by a `Fat32Meta`.
///
/// Everything the volume needs is written explicitly: the reserved area,
/// both FATs and the root directory cluster. The data clusters are left
/// untouched.
pub struct Fat32Formatter<'a, IO: DiskIO + ?Sized> {
    io: &'a mut IO,
    meta: &'a Fat32Meta,
}

impl<'a, IO: DiskIO + ?Sized> Fat32Formatter<'a, IO> {
    pub fn new(io: &'a mut IO, meta: &'a Fat32Meta) -> Self {
        Self { io, meta }
    }

    fn write_reserved_area(&mut self) -> FsResult {
        let len = self.meta.sector_offset(self.meta.reserved_sectors as u64);
        self.io.zero_fill(0, len)?;

        let vbr = Fat32Vbr::from_meta(self.meta);
        for sector in [FAT_VBR_SECTOR, FAT_VBR_BACKUP_SECTOR] {
            self.io.write_at(self.meta.sector_offset(sector), vbr.as_bytes())?;
        }

        // the root directory holds the only used cluster
        let fsinfo = Fat32FsInfo::new(Some(self.meta.cluster_count - 1), FAT_ROOT_CLUSTER + 1);
        for sector in [FAT_FSINFO_SECTOR, FAT_FSINFO_BACKUP_SECTOR] {
            self.io.write_at(self.meta.sector_offset(sector), fsinfo.as_bytes())?;
        }
        Ok(())
    }

    fn write_fat_region(&mut self) -> FsResult {
        let mut head = [0u8; FAT_RESERVED_ENTRIES.len() + FAT_ENTRY_SIZE];
        head[..FAT_RESERVED_ENTRIES.len()].copy_from_slice(FAT_RESERVED_ENTRIES);
        head[FAT_RESERVED_ENTRIES.len()..].copy_from_slice(&FAT_EOC.to_le_bytes());

        for fat_index in 0..self.meta.num_fats {
            let offset = self.meta.fat_entry_offset(0, fat_index);
            self.io.zero_fill(offset, self.meta.fat_size_bytes())?;
            self.io.write_at(offset, &head)?;
        }
        Ok(())
    }

    fn write_root_dir_cluster(&mut self) -> FsResult {
        let offset = self.meta.unit_offset(self.meta.root_cluster);
        self.io
            .zero_fill(offset, self.meta.bytes_per_cluster as u64)?;

        let mut buf = Vec::with_capacity(FAT_DIR_ENTRY_SIZE);
        Fat32Entries::volume_label(self.meta.volume_label, FatTimestamp::now())
            .to_raw_buffer(&mut buf);
        self.io.write_at(offset, &buf)?;
        Ok(())
    }

    pub fn format(&mut self) -> FsResult {
        self.write_reserved_area()?;
        self.write_fat_region()?;
        self.write_root_dir_cluster()?;
        self.io.flush()?;
        log::debug!(
            "FAT32 layout: {} clusters of {} B, FAT {} sectors x{}",
            self.meta.cluster_count,
            self.meta.bytes_per_cluster,
            self.meta.fat_size_sectors,
            self.meta.num_fats
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: usize = 10 * 1024 * 1024;

    #[test]
    fn writes_boot_sectors_fats_and_root() {
        let meta = Fat32Meta::new_custom(SIZE as u64, *b"config-2   ", 0xABCD, 512).unwrap();
        let mut disk = vec![0xA5u8; SIZE];
        let mut io = MemDiskIO::new(&mut disk);
        Fat32Formatter::new(&mut io, &meta).format().unwrap();
        drop(io);

        for sector in [0usize, 6] {
            let vbr = &disk[sector * 512..(sector + 1) * 512];
            assert_eq!(&vbr[510..512], &[0x55, 0xAA]);
            assert_eq!(&vbr[71..82], b"config-2   ");
        }
        assert_eq!(&disk[512..516], b"RRaA");
        assert_eq!(&disk[7 * 512 + 508..8 * 512], &[0x00, 0x00, 0x55, 0xAA]);
        // reserved sectors that carry nothing are wiped
        assert!(disk[2 * 512..6 * 512].iter().all(|&b| b == 0));

        for fat in 0..2u8 {
            let off = meta.fat_entry_offset(0, fat) as usize;
            assert_eq!(&disk[off..off + 8], FAT_RESERVED_ENTRIES);
            assert_eq!(&disk[off + 8..off + 12], &FAT_EOC.to_le_bytes());
            let end = off + meta.fat_size_bytes() as usize;
            assert!(disk[off + 12..end].iter().all(|&b| b == 0));
        }

        let root = meta.unit_offset(FAT_ROOT_CLUSTER) as usize;
        assert_eq!(&disk[root..root + 11], b"config-2   ");
        assert_eq!(disk[root + 11], 0x08);
        assert!(disk[root + 32..root + 512].iter().all(|&b| b == 0));
        // the data area after the root cluster is left alone
        assert_eq!(disk[root + 512], 0xA5);
    }
}
