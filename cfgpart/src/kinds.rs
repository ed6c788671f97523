// SPDX-License-Identifier: MIT

//! MBR partition type ids understood by the planner and the codec.

define_partition_kinds! {
    Empty => "Empty", 0x00,
    Fat12 => "FAT12", 0x01,
    Fat16Small => "FAT16 (<32M)", 0x04,
    Extended => "Extended (CHS)", 0x05,
    Fat16 => "FAT16", 0x06,
    Ntfs => "NTFS/exFAT", 0x07,
    Fat32 => "FAT32 (CHS)", 0x0B,
    Fat32Lba => "FAT32 (LBA)", 0x0C,
    Fat16Lba => "FAT16 (LBA)", 0x0E,
    ExtendedLba => "Extended (LBA)", 0x0F,
    LinuxSwap => "Linux swap", 0x82,
    Linux => "Linux", 0x83,
    LinuxExtended => "Linux extended", 0x85,
    LinuxLvm => "Linux LVM", 0x8E,
    GptProtective => "GPT protective", 0xEE,
    EfiSystem => "EFI System", 0xEF,
    LinuxRaid => "Linux RAID", 0xFD,
}

impl PartitionKind {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PartitionKind::Empty)
    }

    #[inline]
    pub fn is_protective(&self) -> bool {
        matches!(self, PartitionKind::GptProtective)
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            PartitionKind::Extended | PartitionKind::ExtendedLba | PartitionKind::LinuxExtended
        )
    }
}
