// SPDX-License-Identifier: MIT

//! `drive.toml` schema.

pub mod size;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cfgfs::payload::NetworkData;
use cfgpart::{DEFAULT_SECTOR_SIZE, DriveOrder, Placement};
use serde::Deserialize;

use crate::request::{DEFAULT_BASE_SECTOR, DEFAULT_DRIVE_SIZE, ProvisionRequest};
use size::Size;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub network: NetworkData,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Size used when the destination image does not exist yet.
    pub size: Option<Size>,
    #[serde(default = "default_sector_size")]
    pub sector_size: u64,
    pub physical_sector_size: Option<u64>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            size: None,
            sector_size: DEFAULT_SECTOR_SIZE,
            physical_sector_size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlacementConfig {
    #[default]
    Trailing,
    Fixed(u64),
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderConfig {
    First,
    #[default]
    Last,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DriveConfig {
    #[serde(default = "default_drive_size")]
    pub size: Size,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub order: OrderConfig,
    #[serde(default = "default_base_sector")]
    pub base_sector: u64,
    #[serde(default)]
    pub allow_overlap: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_DRIVE_SIZE,
            label: default_label(),
            placement: PlacementConfig::default(),
            order: OrderConfig::default(),
            base_sector: DEFAULT_BASE_SECTOR,
            allow_overlap: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetadataConfig {
    pub hostname: String,
    #[serde(default)]
    pub public_keys: BTreeMap<String, String>,
}

fn default_sector_size() -> u64 {
    DEFAULT_SECTOR_SIZE
}

fn default_drive_size() -> Size {
    DEFAULT_DRIVE_SIZE
}

fn default_label() -> String {
    cfgfs::CONFIG_DRIVE_LABEL.to_string()
}

fn default_base_sector() -> u64 {
    DEFAULT_BASE_SECTOR
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config '{}': {e}", path.display()))?;
        let config = Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {e}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.metadata.hostname.trim().is_empty() {
            anyhow::bail!("metadata.hostname must not be empty");
        }
        if self.drive.size.bytes() == 0 {
            anyhow::bail!("drive.size must not be zero");
        }
        cfgfs::volume::volume_label(&self.drive.label)
            .map_err(|e| anyhow::anyhow!("drive.label: {e}"))?;
        for link in &self.network.links {
            if link.id.is_empty() {
                anyhow::bail!("network.links entries need an id");
            }
        }
        for net in &self.network.networks {
            if !self.network.links.iter().any(|l| l.id == net.link) {
                log::warn!("Network references unknown link '{}'", net.link);
            }
        }
        Ok(())
    }

    pub fn placement(&self) -> Placement {
        match self.drive.placement {
            PlacementConfig::Trailing => Placement::Trailing,
            PlacementConfig::Fixed(sector) => Placement::FixedOffset(sector),
        }
    }

    pub fn order(&self) -> DriveOrder {
        match self.drive.order {
            OrderConfig::First => DriveOrder::First,
            OrderConfig::Last => DriveOrder::Last {
                base_sector: self.drive.base_sector,
            },
        }
    }

    /// Builds the request for `image`, optionally transplanting `source`.
    pub fn to_request(&self, image: PathBuf, source: Option<PathBuf>) -> ProvisionRequest {
        let mut req = ProvisionRequest::new(image, self.metadata.hostname.clone());
        req.source = source;
        req.image_size = self.image.size.map(|s| s.bytes());
        req.logical_sector_size = self.image.sector_size;
        req.physical_sector_size = self
            .image
            .physical_sector_size
            .unwrap_or(self.image.sector_size);
        req.drive_size = self.drive.size.bytes();
        req.label = self.drive.label.clone();
        req.placement = self.placement();
        req.order = self.order();
        req.allow_overlap = self.drive.allow_overlap;
        req.public_keys = self.metadata.public_keys.clone();
        req.network = self.network.clone();
        req
    }
}
