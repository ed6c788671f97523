// SPDX-License-Identifier: MIT

#[macro_use]
mod macros;
mod io_ext;

pub mod errors;
/// Known MBR partition type ids.
pub mod kinds;
/// Master Boot Record codec.
pub mod mbr;

pub mod copier;
pub mod geometry;
/// Placement of the config-drive partition.
pub mod planner;
pub mod table;
/// Re-basing of a source table onto a destination disk.
pub mod transplant;

pub use copier::{copy_partition, write_partition_contents, zero_partition};
pub use geometry::DiskGeometry;
pub use io_ext::DiskIOLbaExt;
pub use kinds::PartitionKind;
pub use planner::{Placement, compute_boundary};
pub use table::{DiskTable, PartitionEntry, PartitionTable, read_table, write_table};
pub use transplant::{DriveOrder, PartitionMove, Transplant, TransplantOptions, transplant};

pub const DEFAULT_SECTOR_SIZE: u64 = 512;
