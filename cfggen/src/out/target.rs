// SPDX-License-Identifier: MIT

use std::fs::File;
use std::path::{Path, PathBuf};

use cfgio::prelude::*;

use crate::errors::*;

/// Destination image (or block device) opened for the duration of a run.
pub struct TargetImage {
    file: File,
    pub path: PathBuf,
    /// `true` if this run created the file.
    pub created: bool,
}

impl TargetImage {
    /// Opens `path` read/write, or creates it as a sparse file of
    /// `create_size` bytes when it does not exist.
    pub fn open_or_create(path: &Path, create_size: Option<u64>) -> ProvisionResult<Self> {
        if path.exists() {
            let file = File::options()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|e| ProvisionError::io("opening destination image", e))?;
            log::debug!("Opened existing image {}", path.display());
            return Ok(Self {
                file,
                path: path.to_path_buf(),
                created: false,
            });
        }

        let size = create_size.ok_or_else(|| {
            ProvisionError::GeometryInvalid(format!(
                "'{}' does not exist and no image size is configured",
                path.display()
            ))
        })?;
        let mut file = File::options()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| ProvisionError::io("creating destination image", e))?;
        StdDiskIO::new(&mut file)
            .set_len(size)
            .map_err(|e| ProvisionError::io("sizing destination image", e))?;
        log::info!(
            "Created image {} ({})",
            path.display(),
            crate::utils::pretty_bytes(size)
        );
        Ok(Self {
            file,
            path: path.to_path_buf(),
            created: true,
        })
    }

    pub fn as_io(&mut self) -> StdDiskIO<'_, File> {
        StdDiskIO::new(&mut self.file)
    }

    pub fn sync(&mut self) -> ProvisionResult<()> {
        self.file
            .sync_all()
            .map_err(|e| ProvisionError::io("syncing destination image", e))
    }
}

/// Source image, opened read-only.
pub struct SourceImage {
    file: File,
    pub path: PathBuf,
}

impl SourceImage {
    pub fn open(path: &Path) -> ProvisionResult<Self> {
        let file = File::open(path).map_err(|e| ProvisionError::io("opening source image", e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn as_io(&mut self) -> StdDiskIO<'_, File> {
        StdDiskIO::new(&mut self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_sparse_image_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");

        let t = TargetImage::open_or_create(&path, Some(1 << 20)).unwrap();
        assert!(t.created);
        drop(t);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1 << 20);

        let mut t = TargetImage::open_or_create(&path, Some(4 << 20)).unwrap();
        assert!(!t.created);
        let mut io = t.as_io();
        assert_eq!(io.len().unwrap(), 1 << 20);
        let mut tail = [0xFFu8; 512];
        io.read_at((1 << 20) - 512, &mut tail).unwrap();
        assert_eq!(tail, [0u8; 512]);
    }

    #[test]
    fn missing_image_without_size() {
        let dir = tempfile::tempdir().unwrap();
        let res = TargetImage::open_or_create(&dir.path().join("none.img"), None);
        assert!(matches!(res, Err(ProvisionError::GeometryInvalid(_))));
    }
}
