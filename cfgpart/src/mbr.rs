// SPDX-License-Identifier: MIT

//! On-disk MBR layout (boot code, four 16-byte entries, 0x55AA signature).

use crate::errors::*;
use crate::kinds::MBR_TYPE_GPT_PROTECTIVE;
use cfgio::prelude::*;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const MBR_BOOT_CODE_SIZE: usize = 446;
pub const MBR_MAX_ENTRIES: usize = 4;

pub const BOOT_FLAG_ACTIVE: u8 = 0x80;
pub const BOOT_FLAG_INACTIVE: u8 = 0x00;

/// CHS value stored when the LBA cannot be expressed in CHS.
pub const CHS_MAX: [u8; 3] = [0xFE, 0xFF, 0xFF];

const CHS_HEADS: u64 = 255;
const CHS_SECTORS: u64 = 63;

/// Translates an LBA to the packed CHS triplet (255 heads, 63 sectors/track).
///
/// Addresses beyond cylinder 1023 saturate to `CHS_MAX`.
pub fn lba_to_chs(lba: u64) -> [u8; 3] {
    let cylinder = lba / (CHS_HEADS * CHS_SECTORS);
    if cylinder > 1023 {
        return CHS_MAX;
    }
    let head = (lba / CHS_SECTORS) % CHS_HEADS;
    let sector = (lba % CHS_SECTORS) + 1;
    [
        head as u8,
        (((cylinder >> 2) & 0xC0) as u8) | (sector as u8 & 0x3F),
        (cylinder & 0xFF) as u8,
    ]
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)] // 16 bytes, correctly aligned
pub struct MbrEntry {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub part_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: u32,
    pub sectors: u32,
}

impl MbrEntry {
    #[inline]
    pub fn new(
        boot_flag: u8,
        starting_chs: [u8; 3],
        part_type: u8,
        end_chs: [u8; 3],
        start_lba: u32,
        sectors: u32,
    ) -> Self {
        Self {
            boot_flag,
            starting_chs,
            part_type,
            end_chs,
            start_lba,
            sectors,
        }
    }

    /// Builds an entry with CHS fields derived from the LBA range.
    pub fn from_lba(bootable: bool, part_type: u8, start_lba: u32, sectors: u32) -> Self {
        let end = (start_lba as u64 + sectors as u64).saturating_sub(1);
        Self::new(
            if bootable {
                BOOT_FLAG_ACTIVE
            } else {
                BOOT_FLAG_INACTIVE
            },
            lba_to_chs(start_lba as u64),
            part_type,
            lba_to_chs(end),
            start_lba,
            sectors,
        )
    }

    #[inline]
    pub fn new_empty() -> Self {
        Self::new(0x00, [0, 0, 0], 0x00, [0, 0, 0], 0, 0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.part_type == 0
    }

    #[inline]
    pub fn is_protective(&self) -> bool {
        self.part_type == MBR_TYPE_GPT_PROTECTIVE
    }

    #[inline]
    pub fn is_bootable(&self) -> bool {
        self.boot_flag == BOOT_FLAG_ACTIVE
    }

    #[inline]
    pub fn validate_basic(&self) -> PartResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        if self.sectors == 0 {
            return Err(MbrError::ZeroSectors.into());
        }
        if !(self.boot_flag == BOOT_FLAG_INACTIVE || self.boot_flag == BOOT_FLAG_ACTIVE) {
            return Err(MbrError::InvalidBootFlag {
                got: self.boot_flag,
            }
            .into());
        }
        Ok(())
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct MbrEntryPacked {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub part_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: u32,
    pub sectors: u32,
}

impl MbrEntryPacked {
    #[inline]
    pub fn to_aligned(self) -> MbrEntry {
        MbrEntry {
            boot_flag: self.boot_flag,
            starting_chs: self.starting_chs,
            part_type: self.part_type,
            end_chs: self.end_chs,
            start_lba: u32::from_le(self.start_lba),
            sectors: u32::from_le(self.sectors),
        }
    }

    #[inline]
    pub fn from_aligned(e: &MbrEntry) -> Self {
        Self {
            boot_flag: e.boot_flag,
            starting_chs: e.starting_chs,
            part_type: e.part_type,
            end_chs: e.end_chs,
            start_lba: e.start_lba.to_le(),
            sectors: e.sectors.to_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbrKind {
    Empty,
    Protective,
    Legacy,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Mbr {
    pub boot_code: [u8; MBR_BOOT_CODE_SIZE],
    pub entries: [MbrEntryPacked; MBR_MAX_ENTRIES],
    pub signature: [u8; 2],
}

impl Mbr {
    #[inline]
    pub fn new_from_entries(entries: [MbrEntry; MBR_MAX_ENTRIES]) -> Self {
        let packed = entries.map(|e| MbrEntryPacked::from_aligned(&e));
        Self {
            boot_code: [0u8; MBR_BOOT_CODE_SIZE],
            entries: packed,
            signature: MBR_SIGNATURE,
        }
    }

    #[inline]
    pub fn new_empty() -> Self {
        Self::new_from_entries([MbrEntry::new_empty(); MBR_MAX_ENTRIES])
    }

    /// Replaces the partition entries, keeping the boot code as is.
    #[inline]
    pub fn set_entries(&mut self, entries: [MbrEntry; MBR_MAX_ENTRIES]) {
        self.entries = entries.map(|e| MbrEntryPacked::from_aligned(&e));
        self.signature = MBR_SIGNATURE;
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        self.signature == MBR_SIGNATURE
    }

    #[inline]
    pub fn aligned_entries(&self) -> [MbrEntry; MBR_MAX_ENTRIES] {
        [
            self.entries[0].to_aligned(),
            self.entries[1].to_aligned(),
            self.entries[2].to_aligned(),
            self.entries[3].to_aligned(),
        ]
    }

    #[inline]
    pub fn first_non_empty(&self) -> Option<MbrEntry> {
        self.aligned_entries().into_iter().find(|e| !e.is_empty())
    }

    pub fn kind(&self) -> MbrKind {
        let Some(first) = self.first_non_empty() else {
            return MbrKind::Empty;
        };
        if first.is_protective() {
            MbrKind::Protective
        } else {
            MbrKind::Legacy
        }
    }

    #[inline]
    pub fn validate_header(&self) -> PartResult<()> {
        if !self.has_valid_signature() {
            return Err(MbrError::InvalidSignature {
                expected: MBR_SIGNATURE,
                found: self.signature,
            }
            .into());
        }
        Ok(())
    }

    #[inline]
    pub fn validate_entries_basic(&self) -> PartResult<()> {
        for e in self.aligned_entries().iter() {
            e.validate_basic()?;
        }
        Ok(())
    }
}

pub fn write_mbr<IO: DiskIO + ?Sized>(io: &mut IO, mbr: &Mbr) -> PartResult<()> {
    io.write_struct(0, mbr)?;
    io.flush()?;
    Ok(())
}

/// Rewrites the four entries and the signature, preserving the boot code
/// already present in sector 0.
pub fn write_mbr_entries<IO: DiskIO + ?Sized>(
    io: &mut IO,
    entries: [MbrEntry; MBR_MAX_ENTRIES],
) -> PartResult<()> {
    let mut mbr = read_mbr_raw(io)?;
    mbr.set_entries(entries);
    write_mbr(io, &mbr)
}

/// Reads sector 0 without validating it.
pub fn read_mbr_raw<IO: DiskIO + ?Sized>(io: &mut IO) -> PartResult<Mbr> {
    Ok(io.read_struct(0)?)
}

pub fn read_mbr<IO: DiskIO + ?Sized>(io: &mut IO) -> PartResult<Mbr> {
    let mbr = read_mbr_raw(io)?;
    mbr.validate_header()?;
    Ok(mbr)
}

/// Copies the boot code area of `src` into `dest` (entries untouched).
pub fn copy_boot_code<S, D>(src: &mut S, dest: &mut D) -> PartResult<()>
where
    S: DiskIO + ?Sized,
    D: DiskIO + ?Sized,
{
    let mut code = [0u8; MBR_BOOT_CODE_SIZE];
    src.read_at(0, &mut code)?;
    dest.write_at(0, &code)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux(start: u32, sectors: u32) -> MbrEntry {
        MbrEntry::from_lba(false, 0x83, start, sectors)
    }

    #[test]
    fn mbr_is_one_sector() {
        assert_eq!(core::mem::size_of::<Mbr>(), 512);
        assert_eq!(core::mem::size_of::<MbrEntry>(), 16);
    }

    #[test]
    fn write_and_parse_legacy_mbr() {
        let mut buf = [0u8; 512];
        let mut io = MemDiskIO::new(&mut buf);

        let mut es = [MbrEntry::new_empty(); 4];
        es[0] = MbrEntry::from_lba(true, 0x0C, 2048, 4096);
        es[1] = linux(6144, 100);
        write_mbr_entries(&mut io, es).unwrap();

        let mbr = read_mbr(&mut io).unwrap();
        mbr.validate_entries_basic().unwrap();
        assert_eq!(mbr.kind(), MbrKind::Legacy);
        assert_eq!(mbr.aligned_entries(), es);
        assert!(mbr.aligned_entries()[0].is_bootable());
    }

    #[test]
    fn entries_rewrite_keeps_boot_code() {
        let mut buf = [0u8; 512];
        buf[..4].copy_from_slice(&[0xEB, 0x63, 0x90, 0x10]);
        let mut io = MemDiskIO::new(&mut buf);

        let mut es = [MbrEntry::new_empty(); 4];
        es[0] = linux(2048, 8);
        es[3] = MbrEntry::new(0x42, [0; 3], 0x83, [0; 3], 4096, 8);
        assert!(matches!(
            Mbr::new_from_entries(es).validate_entries_basic(),
            Err(PartError::Mbr(MbrError::InvalidBootFlag { got: 0x42 }))
        ));
        es[3] = MbrEntry::new_empty();
        write_mbr_entries(&mut io, es).unwrap();

        assert_eq!(&buf[..4], &[0xEB, 0x63, 0x90, 0x10]);
        assert_eq!(&buf[510..], &MBR_SIGNATURE);
        // start_lba little-endian at 446 + 8
        assert_eq!(&buf[454..458], &2048u32.to_le_bytes());
    }

    #[test]
    fn validate_mbr_invalid_signature() {
        let buf = [0u8; 512];
        let mut copy = buf;
        let mut io = MemDiskIO::new(&mut copy);
        assert!(matches!(
            read_mbr(&mut io),
            Err(PartError::Mbr(MbrError::InvalidSignature { .. }))
        ));
    }

    #[test]
    fn mbr_kind_empty_and_protective() {
        assert_eq!(Mbr::new_empty().kind(), MbrKind::Empty);

        let mut es = [MbrEntry::new_empty(); 4];
        es[0] = MbrEntry::new(0, [0, 2, 0], MBR_TYPE_GPT_PROTECTIVE, CHS_MAX, 1, 1000);
        let mbr = Mbr::new_from_entries(es);
        assert_eq!(mbr.kind(), MbrKind::Protective);
    }

    #[test]
    fn zero_sized_entry_rejected() {
        let mut es = [MbrEntry::new_empty(); 4];
        es[0] = linux(2048, 0);
        assert!(matches!(
            Mbr::new_from_entries(es).validate_entries_basic(),
            Err(PartError::Mbr(MbrError::ZeroSectors))
        ));
    }

    #[test]
    fn chs_translation() {
        assert_eq!(lba_to_chs(0), [0, 1, 0]);
        // LBA 2048 -> C0 H32 S33
        assert_eq!(lba_to_chs(2048), [32, 33, 0]);
        assert_eq!(lba_to_chs(u32::MAX as u64), CHS_MAX);
    }

    #[test]
    fn boot_code_copy() {
        let mut src_buf = [0xCCu8; 512];
        let mut dest_buf = [0u8; 512];
        let mut src = MemDiskIO::new(&mut src_buf);
        let mut dest = MemDiskIO::new(&mut dest_buf);
        copy_boot_code(&mut src, &mut dest).unwrap();
        assert_eq!(&dest_buf[..MBR_BOOT_CODE_SIZE], &[0xCC; MBR_BOOT_CODE_SIZE]);
        assert_eq!(&dest_buf[MBR_BOOT_CODE_SIZE..], &[0u8; 66]);
    }
}
