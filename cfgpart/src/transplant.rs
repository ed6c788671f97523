// SPDX-License-Identifier: MIT

use crate::errors::*;
use crate::geometry::DiskGeometry;
use crate::planner::{Placement, compute_boundary};
use crate::table::{PartitionEntry, PartitionTable};

/// Position of the config-drive among the transplanted partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOrder {
    /// Drive in slot 1, source partitions packed right after it.
    First,
    /// Source partitions packed from `base_sector`, drive appended last.
    Last { base_sector: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransplantOptions {
    pub order: DriveOrder,
    pub placement: Placement,
}

/// One source partition and where it lands on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionMove {
    pub source: PartitionEntry,
    /// 1-based slot in the source table.
    pub source_slot: usize,
    /// 1-based slot in the destination table.
    pub dest_slot: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transplant {
    pub table: PartitionTable,
    pub moves: Vec<PartitionMove>,
    pub drive_slot: usize,
}

impl Transplant {
    #[inline]
    pub fn drive(&self) -> PartResult<&PartitionEntry> {
        self.table.slot(self.drive_slot)
    }
}

/// Lays the non-empty partitions of `source` out on a disk of geometry
/// `dest` and adds a `drive_bytes` config-drive partition.
pub fn transplant(
    source: &PartitionTable,
    dest: &DiskGeometry,
    drive_bytes: u64,
    options: TransplantOptions,
) -> PartResult<Transplant> {
    let src_geometry = source.geometry();
    if src_geometry.logical_sector_size != dest.logical_sector_size {
        return Err(PartError::geometry(
            "Source and destination logical sector sizes differ",
            src_geometry.logical_sector_size,
            dest.logical_sector_size,
        ));
    }

    let retained: Vec<(usize, PartitionEntry)> =
        source.non_empty().map(|(slot, e)| (slot, *e)).collect();
    log::debug!(
        "Transplanting {} partition(s) onto {dest} ({:?}, {})",
        retained.len(),
        options.order,
        options.placement
    );

    let mut table = PartitionTable::new(*dest);
    let mut moves = Vec::with_capacity(retained.len());

    let drive_slot = match options.order {
        DriveOrder::First => {
            if !matches!(options.placement, Placement::FixedOffset(_)) {
                return Err(PartError::Invalid(
                    "Drive-first order needs a fixed drive offset",
                ));
            }
            let pending: Vec<PartitionEntry> = retained.iter().map(|(_, e)| *e).collect();
            let existing = PartitionTable::from_entries(*dest, &pending)?;
            let drive = compute_boundary(dest, &existing, drive_bytes, options.placement)?;
            let drive_slot = table.push(drive)?;
            place_after(&mut table, &mut moves, &retained, drive.end_sector())?;
            drive_slot
        }
        DriveOrder::Last { base_sector } => {
            place_after(&mut table, &mut moves, &retained, base_sector)?;
            let drive = compute_boundary(dest, &table, drive_bytes, options.placement)?;
            table.push(drive)?
        }
    };

    Ok(Transplant {
        table,
        moves,
        drive_slot,
    })
}

/// Packs `retained` back to back from `cursor`, sizes and flags unchanged.
fn place_after(
    table: &mut PartitionTable,
    moves: &mut Vec<PartitionMove>,
    retained: &[(usize, PartitionEntry)],
    mut cursor: u64,
) -> PartResult<()> {
    let total = table.geometry().total_sectors;
    for (source_slot, entry) in retained {
        let placed = entry.rebased(cursor);
        if placed.end_sector() > total {
            return Err(PartError::geometry(
                "Transplanted partition ends past the end of the disk",
                placed.end_sector(),
                total,
            ));
        }
        let dest_slot = table.push(placed)?;
        log::debug!(
            "Partition {source_slot} ({}) {} -> slot {dest_slot} at {}",
            entry.kind,
            entry.start_sector,
            placed.start_sector
        );
        moves.push(PartitionMove {
            source: *entry,
            source_slot: *source_slot,
            dest_slot,
        });
        cursor = placed.end_sector();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::PartitionKind;

    const MB: u64 = 1024 * 1024;

    fn geometry(bytes: u64) -> DiskGeometry {
        DiskGeometry::from_len(bytes, 512, 512).unwrap()
    }

    fn source(entries: &[PartitionEntry]) -> PartitionTable {
        PartitionTable::from_entries(geometry(8 * MB), entries).unwrap()
    }

    fn linux(start: u64, count: u64) -> PartitionEntry {
        PartitionEntry::new(PartitionKind::Linux, start, count)
    }

    #[test]
    fn drive_first_packs_sources_after_drive() {
        let src = source(&[linux(63, 100), PartitionEntry::EMPTY, linux(500, 200)]);
        let t = transplant(
            &src,
            &geometry(64 * MB),
            50 * 512,
            TransplantOptions {
                order: DriveOrder::First,
                placement: Placement::FixedOffset(2048),
            },
        )
        .unwrap();

        let layout: Vec<(u64, u64)> = t
            .table
            .non_empty()
            .map(|(_, e)| (e.start_sector, e.sector_count))
            .collect();
        assert_eq!(layout, vec![(2048, 50), (2098, 100), (2198, 200)]);
        assert_eq!(t.drive_slot, 1);
        assert_eq!(t.drive().unwrap().kind, PartitionKind::Linux);

        let slots: Vec<(usize, usize)> =
            t.moves.iter().map(|m| (m.source_slot, m.dest_slot)).collect();
        assert_eq!(slots, vec![(1, 2), (3, 3)]);
    }

    #[test]
    fn drive_last_trailing() {
        let boot = PartitionEntry::new(PartitionKind::Fat32Lba, 2048, 4096).bootable(true);
        let src = source(&[boot, linux(6144, 8192)]);
        let dest = geometry(64 * MB);
        let t = transplant(
            &src,
            &dest,
            MB,
            TransplantOptions {
                order: DriveOrder::Last { base_sector: 2048 },
                placement: Placement::Trailing,
            },
        )
        .unwrap();

        assert_eq!(t.drive_slot, 3);
        let drive = t.drive().unwrap();
        assert_eq!(drive.end_sector(), dest.total_sectors);
        assert_eq!(drive.sector_count, 2048);

        let first = t.table.slot(1).unwrap();
        assert_eq!(*first, boot);
        let second = t.table.slot(2).unwrap();
        assert_eq!((second.start_sector, second.sector_count), (6144, 8192));
        t.table.validate().unwrap();
    }

    #[test]
    fn empty_slots_are_dropped() {
        let src = source(&[
            PartitionEntry::EMPTY,
            linux(100, 10),
            PartitionEntry::EMPTY,
            linux(200, 10),
        ]);
        let t = transplant(
            &src,
            &geometry(16 * MB),
            MB,
            TransplantOptions {
                order: DriveOrder::Last { base_sector: 2048 },
                placement: Placement::Trailing,
            },
        )
        .unwrap();
        assert_eq!(t.table.non_empty_count(), 3);
        assert_eq!(t.moves.len(), 2);
    }

    #[test]
    fn four_sources_exceed_capacity() {
        let src = source(&[linux(100, 10), linux(200, 10), linux(300, 10), linux(400, 10)]);
        let before = src.clone();
        for order in [DriveOrder::First, DriveOrder::Last { base_sector: 2048 }] {
            let res = transplant(
                &src,
                &geometry(16 * MB),
                MB,
                TransplantOptions {
                    order,
                    placement: Placement::FixedOffset(4096),
                },
            );
            assert!(matches!(res, Err(PartError::CapacityExceeded { .. })));
        }
        assert_eq!(src, before);
    }

    #[test]
    fn drive_first_requires_fixed_offset() {
        let src = source(&[linux(100, 10)]);
        let res = transplant(
            &src,
            &geometry(16 * MB),
            MB,
            TransplantOptions {
                order: DriveOrder::First,
                placement: Placement::Trailing,
            },
        );
        assert!(matches!(res, Err(PartError::Invalid(_))));
    }

    #[test]
    fn sector_size_mismatch() {
        let src = source(&[linux(100, 10)]);
        let dest = DiskGeometry::from_len(64 * MB, 4096, 4096).unwrap();
        let res = transplant(
            &src,
            &dest,
            MB,
            TransplantOptions {
                order: DriveOrder::Last { base_sector: 256 },
                placement: Placement::Trailing,
            },
        );
        assert!(matches!(res, Err(PartError::GeometryInvalid { .. })));
    }

    #[test]
    fn source_larger_than_destination() {
        let src = source(&[linux(2048, 10_000)]);
        let res = transplant(
            &src,
            &geometry(4 * MB),
            MB,
            TransplantOptions {
                order: DriveOrder::Last { base_sector: 2048 },
                placement: Placement::Trailing,
            },
        );
        assert!(matches!(res, Err(PartError::GeometryInvalid { .. })));
    }
}
