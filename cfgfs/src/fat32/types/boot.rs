// SPDX-License-Identifier: MIT

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::fat32::{constant::*, meta::Fat32Meta};

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Fat32Vbr {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entry_count: u16,
    pub total_sectors_16: u16,
    pub media: u8,
    pub fat_size_16: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,

    // FAT32 Extended BPB
    pub fat_size_32: u32,
    pub ext_flags: u16,
    pub fs_version: u16,
    pub root_cluster: u32,
    pub fsinfo_sector: u16,
    pub backup_boot_sector: u16,
    pub reserved: [u8; 12],

    pub drive_number: u8,
    pub reserved1: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],

    pub boot_code: [u8; 420],
    pub signature: u16,
}

impl Fat32Vbr {
    pub fn from_meta(meta: &Fat32Meta) -> Self {
        Self {
            jump_boot: FAT_JUMP_BOOT,
            oem_name: *FAT_OEM_NAME,
            bytes_per_sector: meta.bytes_per_sector,
            sectors_per_cluster: meta.sectors_per_cluster,
            reserved_sectors: meta.reserved_sectors,
            num_fats: meta.num_fats,
            // both zero: this is what marks the volume as FAT32
            root_entry_count: 0,
            total_sectors_16: 0,
            media: FAT_MEDIA_DESCRIPTOR,
            fat_size_16: 0,
            sectors_per_track: FAT_SECTORS_PER_TRACK,
            num_heads: FAT_HEADS,
            hidden_sectors: 0,
            total_sectors_32: meta.volume_size_sectors,
            fat_size_32: meta.fat_size_sectors,
            ext_flags: 0,
            fs_version: 0,
            root_cluster: meta.root_cluster,
            fsinfo_sector: FAT_FSINFO_SECTOR as u16,
            backup_boot_sector: FAT_VBR_BACKUP_SECTOR as u16,
            reserved: [0u8; 12],
            drive_number: FAT_DRIVE_NUMBER,
            reserved1: 0,
            boot_signature: FAT_BOOT_SIGNATURE,
            volume_id: meta.volume_id,
            volume_label: meta.volume_label,
            fs_type: *FAT_FS_TYPE,
            boot_code: [0u8; 420],
            signature: FAT_SIGNATURE,
        }
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Fat32FsInfo {
    pub lead_signature: [u8; 4],
    pub reserved1: [u8; 480],
    pub struct_signature: [u8; 4],
    pub free_cluster_count: u32,
    pub next_free_cluster: u32,
    pub reserved2: [u8; 12],
    pub trail_signature: [u8; 4],
}

impl Fat32FsInfo {
    pub fn new(free_cluster_count: Option<u32>, next_free_cluster: u32) -> Self {
        Self {
            lead_signature: *FAT_FSINFO_LEAD_SIGNATURE,
            reserved1: [0u8; 480],
            struct_signature: *FAT_FSINFO_STRUCT_SIGNATURE,
            free_cluster_count: free_cluster_count.unwrap_or(FAT_FSINFO_UNKNOWN),
            next_free_cluster,
            reserved2: [0u8; 12],
            trail_signature: *FAT_FSINFO_TRAIL_SIGNATURE,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lead_signature == *FAT_FSINFO_LEAD_SIGNATURE
            && self.struct_signature == *FAT_FSINFO_STRUCT_SIGNATURE
            && self.trail_signature == *FAT_FSINFO_TRAIL_SIGNATURE
    }

    /// Free count, if recorded and plausible for `cluster_count` clusters.
    pub fn free_clusters(&self, cluster_count: u32) -> Option<u32> {
        let free = self.free_cluster_count;
        (self.is_valid() && free != FAT_FSINFO_UNKNOWN && free <= cluster_count).then_some(free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_sized_structures() {
        assert_eq!(core::mem::size_of::<Fat32Vbr>(), 512);
        assert_eq!(core::mem::size_of::<Fat32FsInfo>(), 512);
    }

    #[test]
    fn signatures_at_their_offsets() {
        let meta = Fat32Meta::new_custom(10 << 20, *b"CONFIG-2   ", 7, 512).unwrap();
        let vbr = Fat32Vbr::from_meta(&meta);
        let raw = vbr.as_bytes();
        assert_eq!(&raw[510..512], &[0x55, 0xAA]);
        assert_eq!(&raw[82..90], b"FAT32   ");
        assert_eq!(&raw[71..82], b"CONFIG-2   ");
        // BPB_FATSz16 and BPB_FATSz32
        assert_eq!(&raw[22..24], &[0, 0]);
        assert_eq!(&raw[36..40], &meta.fat_size_sectors.to_le_bytes());

        let info = Fat32FsInfo::new(Some(12), 3);
        let raw = info.as_bytes();
        assert_eq!(&raw[0..4], b"RRaA");
        assert_eq!(&raw[484..488], b"rrAa");
        assert_eq!(&raw[488..492], &12u32.to_le_bytes());
        assert_eq!(&raw[508..512], &[0x00, 0x00, 0x55, 0xAA]);
        assert_eq!(info.free_clusters(20), Some(12));
        assert_eq!(info.free_clusters(10), None);
        assert_eq!(Fat32FsInfo::new(None, 3).free_clusters(20), None);
    }
}
