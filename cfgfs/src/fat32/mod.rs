// SPDX-License-Identifier: MIT

//! FAT32 on a single partition.
//!
//! The FAT type is recorded in the boot sector (no FAT16 root area, a
//! 32-bit FAT size), so volumes far below the 65525 clusters some tools
//! expect are still FAT32. Cloud-init only checks the label.

pub mod attr;
pub mod constant;
pub mod meta;
pub mod names;
pub mod types;

mod formatter;
mod fs;

pub use formatter::Fat32Formatter;
pub use fs::{DirItem, Fat32Fs};
pub use meta::Fat32Meta;
