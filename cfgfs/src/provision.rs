// SPDX-License-Identifier: MIT

use cfgio::prelude::*;

use crate::errors::*;
use crate::fat32::Fat32Fs;
use crate::payload::{CLOUD_INIT_DIRS, ConfigDrivePayload};

/// Files written by one `provision` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionSummary {
    /// Path (from the volume root) and size of each file.
    pub files: Vec<(String, u64)>,
}

/// Path of the document directory, from the volume root.
pub fn cloud_init_prefix() -> String {
    CLOUD_INIT_DIRS.join("/")
}

fn open_prefix<IO: DiskIO>(fs: &mut Fat32Fs<IO>, create: bool) -> FsResult<u32> {
    let mut dir = fs.root_dir();
    for name in CLOUD_INIT_DIRS {
        dir = if create {
            fs.create_dir(dir, name)?
        } else {
            fs.open_dir(dir, name)?
        };
    }
    Ok(dir)
}

/// Writes the payload documents under `/openstack/latest`.
///
/// Missing directories are created and existing files are rewritten in
/// place, so provisioning an already provisioned volume leaves exactly one
/// copy of each document.
pub fn provision<IO: DiskIO>(
    fs: &mut Fat32Fs<IO>,
    payload: &ConfigDrivePayload,
) -> FsResult<ProvisionSummary> {
    let prefix = cloud_init_prefix();
    log::debug!("Creating /{prefix}");
    let dir = open_prefix(fs, true)?;

    let mut files = Vec::with_capacity(3);
    for (name, data) in payload.documents()? {
        fs.write_file(dir, name, &data)?;
        log::debug!("Wrote /{prefix}/{name} ({} bytes)", data.len());
        files.push((format!("{prefix}/{name}"), data.len() as u64));
    }

    log::info!(
        "Provisioned config drive for '{}' (uuid {})",
        payload.meta.hostname,
        payload.meta.uuid
    );
    Ok(ProvisionSummary { files })
}

/// Reads one document back from `/openstack/latest`.
pub fn read_document<IO: DiskIO>(fs: &mut Fat32Fs<IO>, name: &str) -> FsResult<Vec<u8>> {
    let dir = open_prefix(fs, false)?;
    fs.read_file(dir, name)
}

/// Names of the entries under `/openstack/latest`, sorted.
pub fn list_documents<IO: DiskIO>(fs: &mut Fat32Fs<IO>) -> FsResult<Vec<String>> {
    let dir = open_prefix(fs, false)?;
    let mut names: Vec<String> = fs.read_dir(dir)?.into_iter().map(|item| item.name).collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{META_DATA_FILE, MetaData, NetworkData, USER_DATA};
    use crate::volume::{CONFIG_DRIVE_LABEL, format_fat32, with_volume};
    use std::collections::BTreeMap;

    const SIZE: u64 = 10 * 1024 * 1024;

    fn payload() -> ConfigDrivePayload {
        let mut keys = BTreeMap::new();
        keys.insert("ops".to_string(), "ssh-rsa AAAAB3Nza ops".to_string());
        ConfigDrivePayload::new("my-hostname", keys, NetworkData::default())
    }

    #[test]
    fn provision_writes_three_documents() {
        let mut disk = vec![0u8; SIZE as usize];
        let mut io = MemDiskIO::new(&mut disk);
        format_fat32(&mut io, 0, SIZE, CONFIG_DRIVE_LABEL).unwrap();

        let p = payload();
        let summary = with_volume(&mut io, 0, SIZE, |fs| provision(fs, &p)).unwrap();
        assert_eq!(summary.files.len(), 3);
        assert_eq!(summary.files[0].0, "openstack/latest/meta_data.json");

        let mut io = MemDiskIO::new(&mut disk);
        let (names, meta, user) = with_volume(&mut io, 0, SIZE, |fs| {
            Ok((
                list_documents(fs)?,
                read_document(fs, META_DATA_FILE)?,
                read_document(fs, "user_data")?,
            ))
        })
        .unwrap();

        assert_eq!(
            names,
            vec!["meta_data.json", "network_data.json", "user_data"]
        );
        let parsed: MetaData = serde_json::from_slice(&meta).unwrap();
        assert_eq!(parsed, p.meta);
        assert_eq!(user, USER_DATA.as_bytes());
    }

    #[test]
    fn reprovision_overwrites_with_new_uuid() {
        let mut disk = vec![0u8; SIZE as usize];
        let mut io = MemDiskIO::new(&mut disk);
        format_fat32(&mut io, 0, SIZE, CONFIG_DRIVE_LABEL).unwrap();

        let mut long = payload();
        long.meta.hostname = "a-much-longer-hostname-than-the-second-run".into();
        with_volume(&mut io, 0, SIZE, |fs| provision(fs, &long)).unwrap();

        let short = payload();
        with_volume(&mut io, 0, SIZE, |fs| provision(fs, &short)).unwrap();

        let (names, meta) = with_volume(&mut io, 0, SIZE, |fs| {
            Ok((list_documents(fs)?, read_document(fs, META_DATA_FILE)?))
        })
        .unwrap();
        assert_eq!(names.len(), 3);

        let parsed: MetaData = serde_json::from_slice(&meta).unwrap();
        assert_eq!(parsed.hostname, "my-hostname");
        assert_eq!(parsed.uuid, short.meta.uuid);
        assert_ne!(parsed.uuid, long.meta.uuid);
        assert_eq!(meta, short.meta_data_json().unwrap());
    }

    #[test]
    fn reading_an_unprovisioned_volume_fails() {
        let mut disk = vec![0u8; SIZE as usize];
        let mut io = MemDiskIO::new(&mut disk);
        format_fat32(&mut io, 0, SIZE, CONFIG_DRIVE_LABEL).unwrap();

        let res = with_volume(&mut io, 0, SIZE, |fs| read_document(fs, META_DATA_FILE));
        assert!(matches!(res, Err(FsError::NotFound(name)) if name == "openstack"));
    }
}
