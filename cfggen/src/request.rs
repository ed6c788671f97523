// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::path::PathBuf;

use cfgfs::payload::NetworkData;
use cfgpart::{DEFAULT_SECTOR_SIZE, DriveOrder, Placement};

use crate::config::size::Size;

/// Sector the first partition starts at when none is configured.
pub const DEFAULT_BASE_SECTOR: u64 = 2048;

/// Config-drive size when none is configured.
pub const DEFAULT_DRIVE_SIZE: Size = Size(64 * Size::MIB);

/// Everything one provisioning run needs. No other state is consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Destination image or block device.
    pub image: PathBuf,
    /// Image whose partitions are transplanted first, if any.
    pub source: Option<PathBuf>,
    /// Size of the destination when it has to be created.
    pub image_size: Option<u64>,
    pub logical_sector_size: u64,
    pub physical_sector_size: u64,

    pub drive_size: u64,
    pub label: String,
    pub placement: Placement,
    pub order: DriveOrder,
    /// Skip the overlap check on the final table.
    pub allow_overlap: bool,

    pub hostname: String,
    pub public_keys: BTreeMap<String, String>,
    pub network: NetworkData,

    /// Draw progress bars for partition copies.
    pub show_progress: bool,
}

impl ProvisionRequest {
    /// Request with default geometry and drive settings for `image`.
    pub fn new(image: impl Into<PathBuf>, hostname: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            source: None,
            image_size: None,
            logical_sector_size: DEFAULT_SECTOR_SIZE,
            physical_sector_size: DEFAULT_SECTOR_SIZE,
            drive_size: DEFAULT_DRIVE_SIZE.bytes(),
            label: cfgfs::CONFIG_DRIVE_LABEL.to_string(),
            placement: Placement::Trailing,
            order: DriveOrder::Last {
                base_sector: DEFAULT_BASE_SECTOR,
            },
            allow_overlap: false,
            hostname: hostname.into(),
            public_keys: BTreeMap::new(),
            network: NetworkData::default(),
            show_progress: false,
        }
    }
}
