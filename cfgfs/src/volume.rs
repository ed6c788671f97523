// SPDX-License-Identifier: MIT

//! FAT32 formatting and mounting over a byte range of a `DiskIO`.

use cfgio::prelude::*;

use crate::errors::*;
use crate::fat32::{Fat32Formatter, Fat32Fs, Fat32Meta};

/// Volume label cloud-init looks for.
pub const CONFIG_DRIVE_LABEL: &str = "config-2";

/// Mounted config volume, borrowed for the duration of `with_volume`.
pub type Volume<'a, IO> = Fat32Fs<DiskIOStream<'a, IO>>;

/// Pads `label` to the 11 bytes of a FAT volume label.
pub fn volume_label(label: &str) -> FsResult<[u8; 11]> {
    if label.is_empty() {
        return Err(FsError::InvalidLabel("Volume label is empty"));
    }
    if label.len() > 11 {
        return Err(FsError::InvalidLabel(
            "Volume label is longer than 11 characters",
        ));
    }
    if !label.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        return Err(FsError::InvalidLabel(
            "Volume label must be printable ASCII",
        ));
    }
    let mut out = [b' '; 11];
    out[..label.len()].copy_from_slice(label.as_bytes());
    Ok(out)
}

/// Layout of a FAT32 volume filling `len` bytes; fails when the region
/// cannot hold a usable one.
pub fn plan_fat32(len: u64, label: &str) -> FsResult<Fat32Meta> {
    Fat32Meta::new(len, volume_label(label)?)
}

/// Creates an empty FAT32 filesystem on `[offset, offset + len)`.
pub fn format_fat32<IO: DiskIO + ?Sized>(
    io: &mut IO,
    offset: u64,
    len: u64,
    label: &str,
) -> FsResult<()> {
    let meta = plan_fat32(len, label)?;
    let mut region = DiskIOStream::new(io, offset, len)?;
    Fat32Formatter::new(&mut region, &meta).format()?;
    log::debug!("FAT32 volume formatted at {offset} ({len} bytes)");
    Ok(())
}

/// Mounts the FAT volume at `[offset, offset + len)`, runs `f` on it and
/// flushes the volume back to `io`.
pub fn with_volume<'a, IO, R, F>(io: &'a mut IO, offset: u64, len: u64, f: F) -> FsResult<R>
where
    IO: DiskIO + ?Sized,
    F: FnOnce(&mut Volume<'a, IO>) -> FsResult<R>,
{
    let region = DiskIOStream::new(io, offset, len)?;
    let mut fs = Fat32Fs::mount(region)?;
    let result = f(&mut fs)?;
    fs.flush()?;
    Ok(result)
}
