// SPDX-License-Identifier: MIT

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::*;
use crate::fat32::{
    attr::Fat32Attributes,
    constant::{FAT_DOT_NAME, FAT_DOTDOT_NAME, FAT_LFN_LAST},
    names::{self, FatTimestamp},
};

/// Short entry plus the long-name slots written in front of it.
#[derive(Debug, Clone)]
pub struct Fat32Entries {
    pub lfn: Vec<Fat32LfnEntry>,
    pub entry: Fat32Entry,
}

impl Fat32Entries {
    fn named(name: &str, short_name: [u8; 11], entry: Fat32Entry) -> Self {
        let lfn = if names::needs_lfn(name, &short_name) {
            names::lfn_entries(name, &short_name)
        } else {
            vec![]
        };
        Self { lfn, entry }
    }

    pub fn dir(name: &str, short_name: [u8; 11], cluster: u32, stamp: FatTimestamp) -> Self {
        let entry = Fat32Entry::new(
            short_name,
            Fat32Attributes::DIRECTORY.bits(),
            cluster,
            0,
            stamp,
        );
        Self::named(name, short_name, entry)
    }

    pub fn file(
        name: &str,
        short_name: [u8; 11],
        cluster: u32,
        size: u32,
        stamp: FatTimestamp,
    ) -> Self {
        let entry = Fat32Entry::new(
            short_name,
            Fat32Attributes::ARCHIVE.bits(),
            cluster,
            size,
            stamp,
        );
        Self::named(name, short_name, entry)
    }

    pub fn volume_label(label: [u8; 11], stamp: FatTimestamp) -> Self {
        let entry = Fat32Entry::new(label, Fat32Attributes::VOLUME_ID.bits(), 0, 0, stamp);
        Self { lfn: vec![], entry }
    }

    pub fn dot(cluster: u32, stamp: FatTimestamp) -> Self {
        let entry = Fat32Entry::new(
            *FAT_DOT_NAME,
            Fat32Attributes::DIRECTORY.bits(),
            cluster,
            0,
            stamp,
        );
        Self { lfn: vec![], entry }
    }

    /// `..` of a directory; a parent in the root is stored as cluster 0.
    pub fn dotdot(parent: u32, stamp: FatTimestamp) -> Self {
        let entry = Fat32Entry::new(
            *FAT_DOTDOT_NAME,
            Fat32Attributes::DIRECTORY.bits(),
            parent,
            0,
            stamp,
        );
        Self { lfn: vec![], entry }
    }

    /// Number of 32-byte slots these entries occupy.
    #[inline]
    pub fn slots(&self) -> usize {
        self.lfn.len() + 1
    }

    #[inline(always)]
    pub fn to_raw_buffer(&self, buf: &mut Vec<u8>) {
        for lfn in &self.lfn {
            buf.extend_from_slice(lfn.as_bytes());
        }
        buf.extend_from_slice(self.entry.as_bytes());
    }

    /// Decoded name: the long name when its slots match the short entry.
    pub fn name(&self) -> FsResult<String> {
        let short = self.entry.name;
        let checksum = names::lfn_checksum(&short);
        if !self.lfn.is_empty() && self.lfn.iter().all(|l| l.checksum == checksum) {
            names::decode_lfn(&self.lfn)
        } else {
            Ok(names::decode_sfn(&short))
        }
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Fat32Entry {
    pub name: [u8; 11],
    pub attr: u8,
    pub nt_reserved: u8,
    pub creation_time_tenth: u8,
    pub creation_time: u16,
    pub creation_date: u16,
    pub access_date: u16,
    pub first_cluster_high: u16,
    pub write_time: u16,
    pub write_date: u16,
    pub first_cluster_low: u16,
    pub file_size: u32,
}

impl Fat32Entry {
    pub fn new(name: [u8; 11], attr: u8, cluster: u32, size: u32, stamp: FatTimestamp) -> Self {
        let mut entry = Self {
            name,
            attr,
            nt_reserved: 0,
            creation_time_tenth: stamp.tenths,
            creation_time: stamp.time,
            creation_date: stamp.date,
            access_date: stamp.date,
            first_cluster_high: 0,
            write_time: stamp.time,
            write_date: stamp.date,
            first_cluster_low: 0,
            file_size: size,
        };
        entry.set_first_cluster(cluster);
        entry
    }

    pub fn first_cluster(&self) -> u32 {
        ((self.first_cluster_high as u32) << 16) | (self.first_cluster_low as u32)
    }

    pub fn set_first_cluster(&mut self, cluster: u32) {
        self.first_cluster_high = (cluster >> 16) as u16;
        self.first_cluster_low = (cluster & 0xFFFF) as u16;
    }

    /// Records a rewrite of the content.
    pub fn touch(&mut self, stamp: FatTimestamp) {
        self.write_time = stamp.time;
        self.write_date = stamp.date;
        self.access_date = stamp.date;
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.attr & Fat32Attributes::DIRECTORY.bits() != 0
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Fat32LfnEntry {
    pub order: u8,
    pub name1: [u16; 5],
    pub attr: u8,
    pub type_field: u8,
    pub checksum: u8,
    pub name2: [u16; 6],
    pub zero: u16,
    pub name3: [u16; 2],
}

impl Fat32LfnEntry {
    /// `chars` is the 13-character slice of the name, already padded.
    pub fn new(order: u8, is_last: bool, chars: &[u16; 13], checksum: u8) -> Self {
        let mut name1 = [0u16; 5];
        let mut name2 = [0u16; 6];
        let mut name3 = [0u16; 2];
        name1.copy_from_slice(&chars[0..5]);
        name2.copy_from_slice(&chars[5..11]);
        name3.copy_from_slice(&chars[11..13]);

        Self {
            order: if is_last { order | FAT_LFN_LAST } else { order },
            name1,
            attr: Fat32Attributes::LFN.bits(),
            type_field: 0x00,
            checksum,
            name2,
            zero: 0,
            name3,
        }
    }

    pub fn extract_utf16(&self) -> [u16; 13] {
        let mut out = [0xFFFFu16; 13];
        let (name1, name2, name3) = (self.name1, self.name2, self.name3);
        out[0..5].copy_from_slice(&name1);
        out[5..11].copy_from_slice(&name2);
        out[11..13].copy_from_slice(&name3);
        out
    }
}
