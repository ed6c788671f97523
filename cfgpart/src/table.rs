// SPDX-License-Identifier: MIT

//! Typed view of the four MBR slots, independent of the on-disk encoding.

use core::fmt;

use crate::errors::*;
use crate::geometry::DiskGeometry;
use crate::kinds::PartitionKind;
use crate::mbr::{self, MBR_MAX_ENTRIES, MbrEntry, MbrKind};
use cfgio::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEntry {
    pub bootable: bool,
    pub kind: PartitionKind,
    pub start_sector: u64,
    pub sector_count: u64,
}

impl PartitionEntry {
    pub const EMPTY: Self = Self {
        bootable: false,
        kind: PartitionKind::Empty,
        start_sector: 0,
        sector_count: 0,
    };

    #[inline]
    pub fn new(kind: PartitionKind, start_sector: u64, sector_count: u64) -> Self {
        Self {
            bootable: false,
            kind,
            start_sector,
            sector_count,
        }
    }

    #[inline]
    pub fn bootable(mut self, bootable: bool) -> Self {
        self.bootable = bootable;
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    /// First sector past the partition.
    #[inline]
    pub fn end_sector(&self) -> u64 {
        self.start_sector.saturating_add(self.sector_count)
    }

    #[inline]
    pub fn byte_offset(&self, sector_size: u64) -> u64 {
        self.start_sector.saturating_mul(sector_size)
    }

    #[inline]
    pub fn byte_len(&self, sector_size: u64) -> u64 {
        self.sector_count.saturating_mul(sector_size)
    }

    /// Same partition, moved to `start_sector`.
    #[inline]
    pub fn rebased(&self, start_sector: u64) -> Self {
        Self {
            start_sector,
            ..*self
        }
    }

    pub fn to_mbr_entry(&self) -> PartResult<MbrEntry> {
        if self.is_empty() {
            return Ok(MbrEntry::new_empty());
        }
        let start = u32::try_from(self.start_sector).map_err(|_| MbrError::LbaOverflow {
            value: self.start_sector,
        })?;
        let count = u32::try_from(self.sector_count).map_err(|_| MbrError::LbaOverflow {
            value: self.sector_count,
        })?;
        Ok(MbrEntry::from_lba(
            self.bootable,
            self.kind.as_byte(),
            start,
            count,
        ))
    }

    pub fn from_mbr_entry(e: &MbrEntry) -> Self {
        if e.is_empty() {
            return Self::EMPTY;
        }
        Self {
            bootable: e.is_bootable(),
            kind: PartitionKind::from_byte(e.part_type),
            start_sector: e.start_lba as u64,
            sector_count: e.sectors as u64,
        }
    }
}

/// Up to four primary partitions and the geometry they were laid out on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTable {
    geometry: DiskGeometry,
    slots: [PartitionEntry; MBR_MAX_ENTRIES],
}

impl PartitionTable {
    pub fn new(geometry: DiskGeometry) -> Self {
        Self {
            geometry,
            slots: [PartitionEntry::EMPTY; MBR_MAX_ENTRIES],
        }
    }

    /// Builds a table with `entries` in slots 1, 2, ... (empty entries keep their slot).
    pub fn from_entries(geometry: DiskGeometry, entries: &[PartitionEntry]) -> PartResult<Self> {
        if entries.len() > MBR_MAX_ENTRIES {
            return Err(PartError::CapacityExceeded {
                required: entries.iter().filter(|e| !e.is_empty()).count(),
            });
        }
        let mut table = Self::new(geometry);
        table.slots[..entries.len()].copy_from_slice(entries);
        Ok(table)
    }

    pub fn from_mbr(geometry: DiskGeometry, mbr: &mbr::Mbr) -> Self {
        let mut table = Self::new(geometry);
        for (slot, e) in table.slots.iter_mut().zip(mbr.aligned_entries().iter()) {
            *slot = PartitionEntry::from_mbr_entry(e);
        }
        table
    }

    #[inline]
    pub fn geometry(&self) -> &DiskGeometry {
        &self.geometry
    }

    #[inline]
    pub fn slots(&self) -> &[PartitionEntry; MBR_MAX_ENTRIES] {
        &self.slots
    }

    /// Places `entry` in the first unused slot and returns its 1-based number.
    pub fn push(&mut self, entry: PartitionEntry) -> PartResult<usize> {
        if entry.is_empty() {
            return Err(PartError::Invalid("Cannot push an empty partition entry"));
        }
        let idx = self
            .slots
            .iter()
            .position(|s| s.is_empty())
            .ok_or(PartError::CapacityExceeded {
                required: MBR_MAX_ENTRIES + 1,
            })?;
        self.slots[idx] = entry;
        Ok(idx + 1)
    }

    /// Non-empty entries with their 1-based slot numbers.
    pub fn non_empty(&self) -> impl Iterator<Item = (usize, &PartitionEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_empty())
            .map(|(i, e)| (i + 1, e))
    }

    #[inline]
    pub fn non_empty_count(&self) -> usize {
        self.slots.iter().filter(|e| !e.is_empty()).count()
    }

    /// Entry in the 1-based `slot`.
    pub fn slot(&self, slot: usize) -> PartResult<&PartitionEntry> {
        if slot == 0 || slot > MBR_MAX_ENTRIES {
            return Err(PartError::SlotNotFound(slot));
        }
        let e = &self.slots[slot - 1];
        if e.is_empty() {
            return Err(PartError::SlotNotFound(slot));
        }
        Ok(e)
    }

    /// Checks that every non-empty entry is sized, inside the disk and
    /// addressable with 32-bit LBAs.
    pub fn validate_bounds(&self) -> PartResult<()> {
        let total = self.geometry.total_sectors;
        for (_, e) in self.non_empty() {
            if e.sector_count == 0 {
                return Err(MbrError::ZeroSectors.into());
            }
            if e.end_sector() > total {
                return Err(PartError::geometry(
                    "Partition ends past the end of the disk",
                    e.end_sector(),
                    total,
                ));
            }
            e.to_mbr_entry()?;
        }
        Ok(())
    }

    /// `validate_bounds` plus pairwise overlap of non-empty entries.
    pub fn validate(&self) -> PartResult<()> {
        self.validate_bounds()?;

        let mut segs: Vec<(u64, u64)> = self
            .non_empty()
            .map(|(_, e)| (e.start_sector, e.end_sector()))
            .collect();
        segs.sort_unstable();
        for pair in segs.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.0 < a.1 {
                return Err(MbrError::Overlap {
                    a_start: a.0,
                    a_end: a.1 - 1,
                    b_start: b.0,
                    b_end: b.1 - 1,
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn to_mbr_entries(&self) -> PartResult<[MbrEntry; MBR_MAX_ENTRIES]> {
        let mut out = [MbrEntry::new_empty(); MBR_MAX_ENTRIES];
        for (dst, e) in out.iter_mut().zip(self.slots.iter()) {
            *dst = e.to_mbr_entry()?;
        }
        Ok(out)
    }
}

impl fmt::Display for PartitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Disk: {}", self.geometry)?;
        writeln!(
            f,
            "  ┌──────┬──────────────────┬────────────┬────────────┬──────┐"
        )?;
        writeln!(
            f,
            "  | Slot | Kind             |      Start |    Sectors | Boot |"
        )?;
        writeln!(
            f,
            "  ├──────┼──────────────────┼────────────┼────────────┼──────┤"
        )?;
        for (slot, e) in self.non_empty() {
            writeln!(
                f,
                "  | {slot:<4} | {k:<16} | {s:>10} | {c:>10} | {b:>4} |",
                k = e.kind.to_string(),
                s = e.start_sector,
                c = e.sector_count,
                b = if e.bootable { "yes" } else { "no" },
            )?;
        }
        write!(
            f,
            "  └──────┴──────────────────┴────────────┴────────────┴──────┘"
        )
    }
}

/// What sector 0 of a disk holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskTable {
    /// No boot signature.
    Blank,
    Legacy(PartitionTable),
    /// Protective MBR in front of a GPT.
    Protective,
}

const MBR_SIGNATURE_OFFSET: u64 = 510;
const MBR_SIGNATURE_LE: u16 = u16::from_le_bytes(mbr::MBR_SIGNATURE);

pub fn read_table<IO: DiskIO + ?Sized>(
    io: &mut IO,
    geometry: DiskGeometry,
) -> PartResult<DiskTable> {
    if io.read_u16_at(MBR_SIGNATURE_OFFSET)? != MBR_SIGNATURE_LE {
        log::debug!("No MBR signature, disk treated as blank");
        return Ok(DiskTable::Blank);
    }

    let m = mbr::read_mbr(io)?;
    match m.kind() {
        MbrKind::Protective => Ok(DiskTable::Protective),
        MbrKind::Empty => Ok(DiskTable::Legacy(PartitionTable::new(geometry))),
        MbrKind::Legacy => {
            m.validate_entries_basic()?;
            let table = PartitionTable::from_mbr(geometry, &m);
            for (slot, e) in table.non_empty() {
                if let PartitionKind::Unknown(ty) = e.kind {
                    log::warn!("MBR: slot {slot} has unknown partition type 0x{ty:02X}");
                }
            }
            Ok(DiskTable::Legacy(table))
        }
    }
}

/// Writes `table` into sector 0, keeping the boot code.
///
/// Only bounds are checked here; overlap is the caller's policy.
pub fn write_table<IO: DiskIO + ?Sized>(io: &mut IO, table: &PartitionTable) -> PartResult<()> {
    table.validate_bounds()?;
    let entries = table.to_mbr_entries()?;
    mbr::write_mbr_entries(io, entries)?;
    log::debug!(
        "MBR written with {} partition(s)",
        table.non_empty_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::PartitionKind::*;

    fn geometry(total: u64) -> DiskGeometry {
        DiskGeometry::with_default_sectors(total).unwrap()
    }

    #[test]
    fn push_fills_first_empty_slot() {
        let mut t = PartitionTable::from_entries(
            geometry(10_000),
            &[
                PartitionEntry::new(Linux, 100, 10),
                PartitionEntry::EMPTY,
                PartitionEntry::new(Linux, 200, 10),
            ],
        )
        .unwrap();
        assert_eq!(t.push(PartitionEntry::new(Fat32Lba, 300, 10)).unwrap(), 2);
        assert_eq!(t.push(PartitionEntry::new(Fat32Lba, 400, 10)).unwrap(), 4);
        assert!(matches!(
            t.push(PartitionEntry::new(Fat32Lba, 500, 10)),
            Err(PartError::CapacityExceeded { .. })
        ));
        assert_eq!(t.non_empty_count(), 4);
    }

    #[test]
    fn slot_lookup_is_one_based() {
        let t = PartitionTable::from_entries(
            geometry(10_000),
            &[PartitionEntry::EMPTY, PartitionEntry::new(Linux, 100, 10)],
        )
        .unwrap();
        assert!(matches!(t.slot(1), Err(PartError::SlotNotFound(1))));
        assert_eq!(t.slot(2).unwrap().start_sector, 100);
        assert!(matches!(t.slot(0), Err(PartError::SlotNotFound(0))));
        assert!(matches!(t.slot(5), Err(PartError::SlotNotFound(5))));
        let slots: Vec<usize> = t.non_empty().map(|(s, _)| s).collect();
        assert_eq!(slots, vec![2]);
    }

    #[test]
    fn validate_rejects_out_of_disk_and_overlap() {
        let past_end =
            PartitionTable::from_entries(geometry(1000), &[PartitionEntry::new(Linux, 900, 101)])
                .unwrap();
        assert!(matches!(
            past_end.validate(),
            Err(PartError::GeometryInvalid { .. })
        ));

        let overlapping = PartitionTable::from_entries(
            geometry(1000),
            &[
                PartitionEntry::new(Linux, 100, 100),
                PartitionEntry::new(Linux, 199, 10),
            ],
        )
        .unwrap();
        assert!(matches!(
            overlapping.validate(),
            Err(PartError::Mbr(MbrError::Overlap { .. }))
        ));

        let touching = PartitionTable::from_entries(
            geometry(1000),
            &[
                PartitionEntry::new(Linux, 100, 100),
                PartitionEntry::new(Linux, 200, 10),
            ],
        )
        .unwrap();
        touching.validate().unwrap();
    }

    #[test]
    fn lba_beyond_32_bits_is_rejected() {
        let huge = geometry(u32::MAX as u64 + 100);
        let t = PartitionTable::from_entries(
            huge,
            &[PartitionEntry::new(Linux, u32::MAX as u64 + 1, 10)],
        )
        .unwrap();
        assert!(matches!(
            t.validate(),
            Err(PartError::Mbr(MbrError::LbaOverflow { .. }))
        ));
    }

    #[test]
    fn write_then_read_round_trip() {
        let mut buf = vec![0u8; 512 * 64];
        let mut io = MemDiskIO::new(&mut buf);
        let g = geometry(64);
        let t = PartitionTable::from_entries(
            g,
            &[
                PartitionEntry::new(Fat32Lba, 2, 20).bootable(true),
                PartitionEntry::EMPTY,
                PartitionEntry::new(Linux, 30, 34),
            ],
        )
        .unwrap();

        assert_eq!(read_table(&mut io, g).unwrap(), DiskTable::Blank);
        write_table(&mut io, &t).unwrap();

        match read_table(&mut io, g).unwrap() {
            DiskTable::Legacy(back) => {
                assert_eq!(back, t);
                let e = back.slot(1).unwrap();
                assert!(e.bootable);
                assert_eq!(e.kind, Fat32Lba);
                assert!(back.slot(2).is_err());
            }
            other => panic!("expected legacy table, got {other:?}"),
        }
    }

    #[test]
    fn write_table_checks_bounds_only() {
        let mut buf = vec![0u8; 512 * 64];
        let mut io = MemDiskIO::new(&mut buf);
        let g = geometry(64);
        let overlapping = PartitionTable::from_entries(
            g,
            &[PartitionEntry::new(Linux, 2, 30), PartitionEntry::new(Linux, 20, 30)],
        )
        .unwrap();
        write_table(&mut io, &overlapping).unwrap();
        assert!(matches!(
            read_table(&mut io, g).unwrap(),
            DiskTable::Legacy(t) if t.non_empty_count() == 2
        ));

        let past_end =
            PartitionTable::from_entries(g, &[PartitionEntry::new(Linux, 40, 30)]).unwrap();
        assert!(write_table(&mut io, &past_end).is_err());
    }

    #[test]
    fn protective_mbr_is_reported() {
        let mut buf = vec![0u8; 512 * 8];
        let mut io = MemDiskIO::new(&mut buf);
        let mut es = [MbrEntry::new_empty(); 4];
        es[0] = MbrEntry::from_lba(false, 0xEE, 1, 7);
        mbr::write_mbr_entries(&mut io, es).unwrap();
        assert_eq!(
            read_table(&mut io, geometry(8)).unwrap(),
            DiskTable::Protective
        );
    }

    #[test]
    fn display_lists_non_empty_slots() {
        let t = PartitionTable::from_entries(
            geometry(100),
            &[PartitionEntry::EMPTY, PartitionEntry::new(Linux, 10, 20)],
        )
        .unwrap();
        let s = t.to_string();
        assert!(s.contains("| 2    | Linux"));
        assert!(!s.contains("| 1    |"));
    }
}
