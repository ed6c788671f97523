// SPDX-License-Identifier: MIT

// === Geometry ===

pub const FAT_SECTOR_SIZE: u16 = 512;
pub const FAT_RESERVED_SECTORS: u16 = 32;
pub const FAT_NUM_FATS: u8 = 2;
pub const FAT_ENTRY_SIZE: usize = 4;
pub const FAT_MAX_SECTORS_PER_CLUSTER: u32 = 128;

// === Cluster values ===

pub const FAT_FIRST_CLUSTER: u32 = 2;
pub const FAT_ROOT_CLUSTER: u32 = 2;
pub const FAT_MASK: u32 = 0x0FFF_FFFF;
pub const FAT_FREE: u32 = 0;
pub const FAT_BAD_CLUSTER: u32 = 0x0FFF_FFF7;
/// Values at or above this one end a chain.
pub const FAT_EOC_MIN: u32 = 0x0FFF_FFF8;
pub const FAT_EOC: u32 = 0x0FFF_FFFF;
pub const FAT_MAX_CLUSTERS: u32 = 0x0FFF_FFF5;
/// Fewest data clusters a formatted volume may have.
pub const FAT_MIN_CLUSTERS: u32 = 64;

/// FAT[0] (media byte) and FAT[1] (clean, no IO error).
pub const FAT_RESERVED_ENTRIES: &[u8; 8] = &[0xF8, 0xFF, 0xFF, 0x0F, 0xFF, 0xFF, 0xFF, 0x0F];

// === Reserved area ===

pub const FAT_VBR_SECTOR: u64 = 0;
pub const FAT_VBR_BACKUP_SECTOR: u64 = 6;
pub const FAT_FSINFO_SECTOR: u64 = 1;
pub const FAT_FSINFO_BACKUP_SECTOR: u64 = 7;

// === Boot sector ===

pub const FAT_JUMP_BOOT: [u8; 3] = [0xEB, 0x58, 0x90];
pub const FAT_OEM_NAME: &[u8; 8] = b"MSWIN4.1";
pub const FAT_MEDIA_DESCRIPTOR: u8 = 0xF8;
pub const FAT_SECTORS_PER_TRACK: u16 = 63;
pub const FAT_HEADS: u16 = 255;
pub const FAT_DRIVE_NUMBER: u8 = 0x80;
pub const FAT_BOOT_SIGNATURE: u8 = 0x29;
pub const FAT_FS_TYPE: &[u8; 8] = b"FAT32   ";
pub const FAT_SIGNATURE: u16 = 0xAA55;

// === FSINFO ===

pub const FAT_FSINFO_LEAD_SIGNATURE: &[u8; 4] = b"RRaA";
pub const FAT_FSINFO_STRUCT_SIGNATURE: &[u8; 4] = b"rrAa";
pub const FAT_FSINFO_TRAIL_SIGNATURE: &[u8; 4] = &[0x00, 0x00, 0x55, 0xAA];
pub const FAT_FSINFO_UNKNOWN: u32 = 0xFFFF_FFFF;

// === Directory entries ===

pub const FAT_DIR_ENTRY_SIZE: usize = 32;
pub const FAT_EOD: u8 = 0x00;
pub const FAT_DELETED: u8 = 0xE5;
pub const FAT_DOT_NAME: &[u8; 11] = b".          ";
pub const FAT_DOTDOT_NAME: &[u8; 11] = b"..         ";
pub const FAT_LFN_LAST: u8 = 0x40;
pub const FAT_LFN_CHARS: usize = 13;
pub const FAT_MAX_LFN_CHARS: usize = 255;
