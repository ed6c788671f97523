// SPDX-License-Identifier: MIT

use crate::errors::*;
use crate::fat32::{constant::*, types::Fat32Vbr};

/// Layout of one FAT32 volume, all offsets relative to its first byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fat32Meta {
    pub volume_id: u32,
    pub volume_label: [u8; 11],

    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub bytes_per_cluster: u32,
    pub reserved_sectors: u16,

    pub volume_size_sectors: u32,

    pub num_fats: u8,
    pub fat_offset: u64,
    pub fat_size_sectors: u32,

    pub cluster_heap_offset: u64,
    pub cluster_count: u32,
    pub root_cluster: u32,
}

impl Fat32Meta {
    /// Layout for a new volume of `size_bytes`, with a random volume id.
    pub fn new(size_bytes: u64, volume_label: [u8; 11]) -> FsResult<Self> {
        Self::new_custom(
            size_bytes,
            volume_label,
            rand::random(),
            default_cluster_size(size_bytes),
        )
    }

    pub fn new_custom(
        size_bytes: u64,
        volume_label: [u8; 11],
        volume_id: u32,
        bytes_per_cluster: u32,
    ) -> FsResult<Self> {
        let bytes_per_sector = FAT_SECTOR_SIZE as u32;
        let sectors_per_cluster = bytes_per_cluster / bytes_per_sector;
        if bytes_per_cluster % bytes_per_sector != 0
            || !sectors_per_cluster.is_power_of_two()
            || sectors_per_cluster > FAT_MAX_SECTORS_PER_CLUSTER
        {
            return Err(FsError::Other(
                "Cluster size must be a power-of-two multiple of the sector size",
            ));
        }

        let total_sectors = size_bytes / bytes_per_sector as u64;
        let volume_size_sectors = u32::try_from(total_sectors)
            .map_err(|_| FsError::Other("Volume too large for FAT32"))?;

        let (fat_size_sectors, cluster_count) = converge_fat_layout(
            bytes_per_sector,
            total_sectors,
            FAT_RESERVED_SECTORS as u32,
            FAT_ENTRY_SIZE as u32,
            FAT_FIRST_CLUSTER,
            FAT_NUM_FATS,
            sectors_per_cluster,
        );
        if cluster_count < FAT_MIN_CLUSTERS {
            return Err(FsError::TooSmall {
                size: size_bytes,
                min: min_volume_bytes(bytes_per_cluster),
            });
        }
        if cluster_count > FAT_MAX_CLUSTERS {
            return Err(FsError::Other("Too many clusters for FAT32"));
        }

        Ok(Self::with_layout(
            volume_id,
            volume_label,
            FAT_SECTOR_SIZE,
            sectors_per_cluster as u8,
            FAT_RESERVED_SECTORS,
            volume_size_sectors,
            FAT_NUM_FATS,
            fat_size_sectors,
            cluster_count,
            FAT_ROOT_CLUSTER,
        ))
    }

    /// Reads the layout back from a boot sector found on a `region_len`
    /// byte region.
    pub fn from_vbr(vbr: &Fat32Vbr, region_len: u64) -> FsResult<Self> {
        let signature = vbr.signature;
        if signature != FAT_SIGNATURE {
            return Err(FsError::Corrupted("Missing boot sector signature"));
        }

        let bytes_per_sector = vbr.bytes_per_sector;
        if !bytes_per_sector.is_power_of_two() || !(512..=4096).contains(&bytes_per_sector) {
            return Err(FsError::Corrupted("Invalid bytes per sector"));
        }
        if !vbr.sectors_per_cluster.is_power_of_two() {
            return Err(FsError::Corrupted("Invalid sectors per cluster"));
        }

        let (fat_size_16, root_entry_count) = (vbr.fat_size_16, vbr.root_entry_count);
        let fat_size_sectors = vbr.fat_size_32;
        if fat_size_16 != 0 || root_entry_count != 0 || fat_size_sectors == 0 {
            return Err(FsError::Corrupted("Not a FAT32 volume"));
        }

        let reserved_sectors = vbr.reserved_sectors;
        if reserved_sectors == 0 || vbr.num_fats == 0 {
            return Err(FsError::Corrupted("Invalid reserved area"));
        }

        let total_sectors = vbr.total_sectors_32;
        if total_sectors as u64 * bytes_per_sector as u64 > region_len {
            return Err(FsError::Corrupted("Volume is larger than its region"));
        }

        let system_sectors =
            reserved_sectors as u64 + fat_size_sectors as u64 * vbr.num_fats as u64;
        if total_sectors as u64 <= system_sectors {
            return Err(FsError::Corrupted("No room left for data clusters"));
        }
        let data_clusters = (total_sectors as u64 - system_sectors) / vbr.sectors_per_cluster as u64;
        // the FAT may map fewer clusters than the data area holds
        let fat_entries = fat_size_sectors as u64 * bytes_per_sector as u64 / FAT_ENTRY_SIZE as u64;
        let cluster_count = data_clusters
            .min(fat_entries.saturating_sub(FAT_FIRST_CLUSTER as u64))
            .min(FAT_MAX_CLUSTERS as u64) as u32;

        let root_cluster = vbr.root_cluster;
        if root_cluster < FAT_FIRST_CLUSTER || root_cluster >= FAT_FIRST_CLUSTER + cluster_count {
            return Err(FsError::Corrupted("Root cluster out of range"));
        }

        Ok(Self::with_layout(
            vbr.volume_id,
            vbr.volume_label,
            bytes_per_sector,
            vbr.sectors_per_cluster,
            reserved_sectors,
            total_sectors,
            vbr.num_fats,
            fat_size_sectors,
            cluster_count,
            root_cluster,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn with_layout(
        volume_id: u32,
        volume_label: [u8; 11],
        bytes_per_sector: u16,
        sectors_per_cluster: u8,
        reserved_sectors: u16,
        volume_size_sectors: u32,
        num_fats: u8,
        fat_size_sectors: u32,
        cluster_count: u32,
        root_cluster: u32,
    ) -> Self {
        let fat_offset = reserved_sectors as u64 * bytes_per_sector as u64;
        let cluster_heap_offset =
            fat_offset + fat_size_sectors as u64 * num_fats as u64 * bytes_per_sector as u64;
        Self {
            volume_id,
            volume_label,
            bytes_per_sector,
            sectors_per_cluster,
            bytes_per_cluster: sectors_per_cluster as u32 * bytes_per_sector as u32,
            reserved_sectors,
            volume_size_sectors,
            num_fats,
            fat_offset,
            fat_size_sectors,
            cluster_heap_offset,
            cluster_count,
            root_cluster,
        }
    }

    #[inline]
    pub fn sector_offset(&self, sector: u64) -> u64 {
        sector * self.bytes_per_sector as u64
    }

    #[inline]
    pub fn volume_size_bytes(&self) -> u64 {
        self.sector_offset(self.volume_size_sectors as u64)
    }

    #[inline]
    pub fn fat_size_bytes(&self) -> u64 {
        self.sector_offset(self.fat_size_sectors as u64)
    }

    /// Byte offset of `cluster` in the cluster heap.
    #[inline]
    pub fn unit_offset(&self, cluster: u32) -> u64 {
        self.cluster_heap_offset
            + (cluster - FAT_FIRST_CLUSTER) as u64 * self.bytes_per_cluster as u64
    }

    /// Byte offset of the entry for `cluster` in FAT copy `fat_index`.
    #[inline]
    pub fn fat_entry_offset(&self, cluster: u32, fat_index: u8) -> u64 {
        self.fat_offset
            + fat_index as u64 * self.fat_size_bytes()
            + cluster as u64 * FAT_ENTRY_SIZE as u64
    }

    #[inline]
    pub fn first_data_cluster(&self) -> u32 {
        FAT_FIRST_CLUSTER
    }

    #[inline]
    pub fn last_data_cluster(&self) -> u32 {
        FAT_FIRST_CLUSTER + self.cluster_count - 1
    }

    #[inline]
    pub fn is_data_cluster(&self, cluster: u32) -> bool {
        (FAT_FIRST_CLUSTER..=self.last_data_cluster()).contains(&cluster)
    }

    /// Label with its padding removed.
    pub fn label(&self) -> String {
        String::from_utf8_lossy(&self.volume_label)
            .trim_end()
            .to_string()
    }
}

/// Usual FAT32 cluster size for a volume of `size_bytes`.
pub fn default_cluster_size(size_bytes: u64) -> u32 {
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * MIB;
    match size_bytes {
        s if s <= 260 * MIB => 512,
        s if s <= 8 * GIB => 4096,
        s if s <= 16 * GIB => 8192,
        s if s <= 32 * GIB => 16384,
        _ => 32768,
    }
}

/// Smallest volume that still gets `FAT_MIN_CLUSTERS` data clusters.
pub fn min_volume_bytes(bytes_per_cluster: u32) -> u64 {
    let sector = FAT_SECTOR_SIZE as u64;
    let fat_sectors = ((FAT_MIN_CLUSTERS + FAT_FIRST_CLUSTER) as u64 * FAT_ENTRY_SIZE as u64)
        .div_ceil(sector);
    (FAT_RESERVED_SECTORS as u64 + FAT_NUM_FATS as u64 * fat_sectors) * sector
        + FAT_MIN_CLUSTERS as u64 * bytes_per_cluster as u64
}

/// Computes the FAT size (sectors) and the cluster count of a volume.
///
/// The two depend on each other: iterate until both are stable, then grow
/// the FAT if the last step left it one sector short of the cluster count.
pub fn converge_fat_layout(
    sector_size: u32,
    total_sectors: u64,
    reserved_sectors: u32,
    entry_size: u32,
    min_entries: u32,
    num_fats: u8,
    sectors_per_cluster: u32,
) -> (u32, u32) {
    let sector_size = sector_size as u64;
    let spc = sectors_per_cluster.max(1) as u64;
    let reserved = reserved_sectors as u64;
    let entry_size = entry_size as u64;
    let min_entries = min_entries as u64;

    let data_clusters = |fat_size: u64| {
        total_sectors
            .saturating_sub(reserved)
            .saturating_sub(fat_size * num_fats as u64)
            / spc
    };

    let mut cluster_count = 0u64;
    let mut fat_size = 0u64;

    for _ in 0..32 {
        let fat_size_new = ((cluster_count + min_entries) * entry_size).div_ceil(sector_size);
        let cluster_count_new = data_clusters(fat_size);

        if cluster_count_new == cluster_count && fat_size_new == fat_size {
            break;
        }

        cluster_count = cluster_count_new;
        fat_size = fat_size_new;
    }

    while (cluster_count + min_entries) * entry_size > fat_size * sector_size {
        fat_size += 1;
        cluster_count = data_clusters(fat_size);
    }

    (
        fat_size.min(u32::MAX as u64) as u32,
        cluster_count.min(u32::MAX as u64) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;
    const LABEL: [u8; 11] = *b"config-2   ";

    #[test]
    fn ten_megabyte_volume() {
        let meta = Fat32Meta::new_custom(10 * MIB, LABEL, 0x1234_5678, 512).unwrap();
        assert_eq!(meta.volume_size_sectors, 20480);
        assert_eq!(meta.fat_size_sectors, 158);
        assert_eq!(meta.cluster_count, 20132);
        assert_eq!(meta.cluster_heap_offset, (32 + 2 * 158) * 512);
        assert_eq!(meta.unit_offset(FAT_ROOT_CLUSTER), meta.cluster_heap_offset);
        // far below the 65525 clusters a cluster-count based FAT type would need
        assert!(meta.cluster_count < 65525);
    }

    #[test]
    fn layout_fits_the_volume() {
        for size in [min_volume_bytes(512), 3 * MIB + 17, 10 * MIB, 48 * MIB, 600 * MIB] {
            let meta = Fat32Meta::new(size, LABEL).unwrap();
            let fat_entries = meta.fat_size_bytes() / FAT_ENTRY_SIZE as u64;
            assert!(fat_entries >= meta.cluster_count as u64 + 2, "{size}");
            let used = meta.cluster_heap_offset
                + meta.cluster_count as u64 * meta.bytes_per_cluster as u64;
            assert!(used <= size, "{size}");
            assert!(size - used < 2 * meta.bytes_per_cluster as u64 + 4 * 512, "{size}");
        }
    }

    #[test]
    fn tiny_region_is_too_small() {
        let min = min_volume_bytes(512);
        assert!(Fat32Meta::new_custom(min, LABEL, 0, 512).is_ok());
        assert!(matches!(
            Fat32Meta::new_custom(min - 512, LABEL, 0, 512),
            Err(FsError::TooSmall { min: m, .. }) if m == min
        ));
        assert!(Fat32Meta::new(0, LABEL).is_err());
    }

    #[test]
    fn cluster_size_follows_volume_size() {
        assert_eq!(default_cluster_size(10 * MIB), 512);
        assert_eq!(default_cluster_size(260 * MIB), 512);
        assert_eq!(default_cluster_size(1024 * MIB), 4096);
        assert_eq!(default_cluster_size(20 * 1024 * MIB), 16384);
        assert!(Fat32Meta::new_custom(10 * MIB, LABEL, 0, 1536).is_err());
        assert!(Fat32Meta::new_custom(10 * MIB, LABEL, 0, 128 * 1024).is_err());
    }

    #[test]
    fn boot_sector_gives_the_same_layout() {
        let meta = Fat32Meta::new_custom(10 * MIB, LABEL, 0xCAFE_F00D, 512).unwrap();
        let vbr = Fat32Vbr::from_meta(&meta);
        assert_eq!(Fat32Meta::from_vbr(&vbr, 10 * MIB).unwrap(), meta);

        assert!(matches!(
            Fat32Meta::from_vbr(&vbr, 5 * MIB),
            Err(FsError::Corrupted(_))
        ));
        let mut fat16 = vbr;
        fat16.fat_size_16 = 20;
        assert!(Fat32Meta::from_vbr(&fat16, 10 * MIB).is_err());
        let mut unsigned = vbr;
        unsigned.signature = 0;
        assert!(Fat32Meta::from_vbr(&unsigned, 10 * MIB).is_err());
    }
}
