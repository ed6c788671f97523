// SPDX-License-Identifier: MIT

pub mod errors;
/// FAT32 volumes, formatted and written natively.
pub mod fat32;
/// Cloud-init documents.
pub mod payload;
pub mod provision;
/// FAT32 volumes over a partition.
pub mod volume;

pub use errors::{FsError, FsResult};
pub use payload::{ConfigDrivePayload, Link, MetaData, Network, NetworkData};
pub use provision::{ProvisionSummary, provision};
pub use volume::{CONFIG_DRIVE_LABEL, format_fat32, plan_fat32, with_volume};
