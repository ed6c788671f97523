// SPDX-License-Identifier: MIT

//! Read/write access to a formatted FAT32 volume.

use cfgio::prelude::*;
use zerocopy::FromBytes;

use crate::errors::*;
use crate::fat32::{
    attr::Fat32Attributes,
    constant::*,
    meta::Fat32Meta,
    names::{self, FatTimestamp},
    types::*,
};

/// One file or directory, as listed by `Fat32Fs::read_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirItem {
    pub name: String,
    pub short_name: [u8; 11],
    pub first_cluster: u32,
    pub size: u32,
    pub is_dir: bool,
    /// Slot of the short entry in its directory.
    slot: usize,
}

fn find<'i>(items: &'i [DirItem], name: &str) -> Option<&'i DirItem> {
    items.iter().find(|item| {
        item.name.eq_ignore_ascii_case(name)
            || names::decode_sfn(&item.short_name).eq_ignore_ascii_case(name)
    })
}

/// Short name for `name` that no entry of the directory uses yet.
fn unique_short_name(items: &[DirItem], name: &str) -> [u8; 11] {
    let (basis, lossy) = names::to_short_name(name);
    let taken = |short: &[u8; 11]| items.iter().any(|item| &item.short_name == short);
    if !lossy && !taken(&basis) {
        return basis;
    }
    (1..=999_999u32)
        .map(|n| names::with_numeric_tail(&basis, n))
        .find(|short| !taken(short))
        .unwrap_or(basis)
}

/// Entries of a raw directory and the slot of its end marker.
fn parse_dir(raw: &[u8]) -> FsResult<(Vec<DirItem>, usize)> {
    let mut items = Vec::new();
    let mut lfn: Vec<Fat32LfnEntry> = Vec::new();

    for (slot, chunk) in raw.chunks_exact(FAT_DIR_ENTRY_SIZE).enumerate() {
        match chunk[0] {
            FAT_EOD => return Ok((items, slot)),
            FAT_DELETED => {
                lfn.clear();
                continue;
            }
            _ => {}
        }

        if Fat32Attributes::is_lfn(chunk[11]) {
            let entry = Fat32LfnEntry::read_from_bytes(chunk)
                .map_err(|_| FsError::Corrupted("Unreadable long name entry"))?;
            if entry.order & FAT_LFN_LAST != 0 {
                lfn.clear();
            }
            lfn.push(entry);
            continue;
        }

        let entry = Fat32Entry::read_from_bytes(chunk)
            .map_err(|_| FsError::Corrupted("Unreadable directory entry"))?;
        let slots = core::mem::take(&mut lfn);
        let short_name = entry.name;
        if entry.attr & Fat32Attributes::VOLUME_ID.bits() != 0
            || short_name == *FAT_DOT_NAME
            || short_name == *FAT_DOTDOT_NAME
        {
            continue;
        }

        let name = Fat32Entries { lfn: slots, entry }.name()?;
        items.push(DirItem {
            name,
            short_name,
            first_cluster: entry.first_cluster(),
            size: entry.file_size,
            is_dir: entry.is_dir(),
            slot,
        });
    }

    Ok((items, raw.len() / FAT_DIR_ENTRY_SIZE))
}

/// A mounted FAT32 volume; offsets of `io` start at the boot sector.
///
/// Changes reach the FATs and directories as they are made; `flush`
/// records the free cluster count in FSINFO and flushes `io`.
pub struct Fat32Fs<IO: DiskIO> {
    io: IO,
    meta: Fat32Meta,
    fsinfo_sector: Option<u64>,
    next_free: u32,
    free_count: Option<u32>,
    dirty: bool,
}

impl<IO: DiskIO> Fat32Fs<IO> {
    pub fn mount(mut io: IO) -> FsResult<Self>
    where
        IO: DiskIOLen,
    {
        let len = io.len()?;
        let vbr: Fat32Vbr = io.read_struct(0)?;
        let meta = Fat32Meta::from_vbr(&vbr, len)?;

        let sector = vbr.fsinfo_sector as u64;
        let fsinfo_sector = (sector != 0 && sector < meta.reserved_sectors as u64).then_some(sector);
        let (free_count, hint) = match fsinfo_sector {
            Some(sector) => {
                let info: Fat32FsInfo = io.read_struct(meta.sector_offset(sector))?;
                (info.free_clusters(meta.cluster_count), info.next_free_cluster)
            }
            None => (None, FAT_FSINFO_UNKNOWN),
        };
        let next_free = if meta.is_data_cluster(hint) {
            hint
        } else {
            meta.first_data_cluster()
        };

        log::debug!(
            "Mounted FAT32 '{}': {} clusters of {} B",
            meta.label(),
            meta.cluster_count,
            meta.bytes_per_cluster
        );
        Ok(Self {
            io,
            meta,
            fsinfo_sector,
            next_free,
            free_count,
            dirty: false,
        })
    }

    #[inline]
    pub fn meta(&self) -> &Fat32Meta {
        &self.meta
    }

    pub fn volume_label(&self) -> String {
        self.meta.label()
    }

    #[inline]
    pub fn root_dir(&self) -> u32 {
        self.meta.root_cluster
    }

    /// Free clusters, when known.
    #[inline]
    pub fn free_clusters(&self) -> Option<u32> {
        self.free_count
    }

    // === FAT ===

    fn read_fat(&mut self, cluster: u32) -> FsResult<u32> {
        let offset = self.meta.fat_entry_offset(cluster, 0);
        Ok(self.io.read_u32_at(offset)? & FAT_MASK)
    }

    /// Sets the entry of `cluster` in every FAT copy; the top 4 bits are kept.
    fn write_fat(&mut self, cluster: u32, value: u32) -> FsResult {
        for fat_index in 0..self.meta.num_fats {
            let offset = self.meta.fat_entry_offset(cluster, fat_index);
            let old = self.io.read_u32_at(offset)?;
            self.io
                .write_u32_at(offset, (old & !FAT_MASK) | (value & FAT_MASK))?;
        }
        self.dirty = true;
        Ok(())
    }

    fn chain(&mut self, first: u32) -> FsResult<Vec<u32>> {
        let mut chain = Vec::new();
        let mut cluster = first;
        loop {
            if !self.meta.is_data_cluster(cluster) {
                return Err(FsError::Corrupted("Cluster chain leaves the data area"));
            }
            if chain.len() >= self.meta.cluster_count as usize {
                return Err(FsError::Corrupted("Cluster chain loops"));
            }
            chain.push(cluster);
            let next = self.read_fat(cluster)?;
            if next >= FAT_EOC_MIN {
                return Ok(chain);
            }
            cluster = next;
        }
    }

    /// Allocates and links `count` free clusters, appended to the chain
    /// ending at `after` when given.
    fn allocate(&mut self, count: u32, after: Option<u32>) -> FsResult<Vec<u32>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let (first, last) = (self.meta.first_data_cluster(), self.meta.last_data_cluster());
        let mut found = Vec::with_capacity(count as usize);
        let mut cluster = self.next_free.clamp(first, last);
        for _ in 0..self.meta.cluster_count {
            if self.read_fat(cluster)? == FAT_FREE {
                found.push(cluster);
                if found.len() == count as usize {
                    break;
                }
            }
            cluster = if cluster == last { first } else { cluster + 1 };
        }
        if found.len() < count as usize {
            return Err(FsError::NoSpace {
                needed: count,
                free: found.len() as u32,
            });
        }

        for pair in found.windows(2) {
            self.write_fat(pair[0], pair[1])?;
        }
        if let (Some(&head), Some(&tail)) = (found.first(), found.last()) {
            self.write_fat(tail, FAT_EOC)?;
            if let Some(prev) = after {
                self.write_fat(prev, head)?;
            }
            self.next_free = if tail == last { first } else { tail + 1 };
        }
        if let Some(free) = self.free_count.as_mut() {
            *free = free.saturating_sub(count);
        }
        Ok(found)
    }

    fn free_chain(&mut self, first: u32) -> FsResult {
        let chain = self.chain(first)?;
        for &cluster in &chain {
            self.write_fat(cluster, FAT_FREE)?;
        }
        let max = self.meta.cluster_count;
        if let Some(free) = self.free_count.as_mut() {
            *free = (*free + chain.len() as u32).min(max);
        }
        self.next_free = self.next_free.min(first);
        Ok(())
    }

    fn write_clusters(&mut self, clusters: &[u32], data: &[u8]) -> FsResult {
        let cluster_size = self.meta.bytes_per_cluster as usize;
        for (&cluster, chunk) in clusters.iter().zip(data.chunks(cluster_size)) {
            let offset = self.meta.unit_offset(cluster);
            self.io.write_at(offset, chunk)?;
            if chunk.len() < cluster_size {
                self.io.zero_fill(
                    offset + chunk.len() as u64,
                    (cluster_size - chunk.len()) as u64,
                )?;
            }
        }
        Ok(())
    }

    // === Directories ===

    /// Clusters of a directory and their content.
    fn load_dir(&mut self, dir: u32) -> FsResult<(Vec<u32>, Vec<u8>)> {
        let chain = self.chain(dir)?;
        let cluster_size = self.meta.bytes_per_cluster as usize;
        let mut raw = vec![0u8; chain.len() * cluster_size];
        for (&cluster, buf) in chain.iter().zip(raw.chunks_mut(cluster_size)) {
            self.io.read_at(self.meta.unit_offset(cluster), buf)?;
        }
        Ok((chain, raw))
    }

    fn slot_offset(&self, chain: &[u32], slot: usize) -> FsResult<u64> {
        let byte = slot * FAT_DIR_ENTRY_SIZE;
        let cluster_size = self.meta.bytes_per_cluster as usize;
        let cluster = chain
            .get(byte / cluster_size)
            .ok_or(FsError::Corrupted("Directory slot out of range"))?;
        Ok(self.meta.unit_offset(*cluster) + (byte % cluster_size) as u64)
    }

    /// Writes `entries` at slot `end` of the directory held by `chain`,
    /// growing it by zeroed clusters when it is full.
    fn append_entries(&mut self, mut chain: Vec<u32>, end: usize, entries: &Fat32Entries) -> FsResult {
        let cluster_size = self.meta.bytes_per_cluster as usize;
        let slots_per_cluster = cluster_size / FAT_DIR_ENTRY_SIZE;
        while chain.len() * slots_per_cluster < end + entries.slots() {
            let added = self.allocate(1, chain.last().copied())?;
            for &cluster in &added {
                self.io
                    .zero_fill(self.meta.unit_offset(cluster), cluster_size as u64)?;
            }
            chain.extend(added);
        }

        let mut raw = Vec::with_capacity(entries.slots() * FAT_DIR_ENTRY_SIZE);
        entries.to_raw_buffer(&mut raw);
        for (i, slot) in raw.chunks(FAT_DIR_ENTRY_SIZE).enumerate() {
            let offset = self.slot_offset(&chain, end + i)?;
            self.io.write_at(offset, slot)?;
        }
        self.dirty = true;
        Ok(())
    }

    fn update_entry(
        &mut self,
        chain: &[u32],
        slot: usize,
        first_cluster: u32,
        size: u32,
        stamp: FatTimestamp,
    ) -> FsResult {
        let offset = self.slot_offset(chain, slot)?;
        let mut entry: Fat32Entry = self.io.read_struct(offset)?;
        entry.set_first_cluster(first_cluster);
        entry.file_size = size;
        entry.touch(stamp);
        self.io.write_struct(offset, &entry)?;
        self.dirty = true;
        Ok(())
    }

    pub fn read_dir(&mut self, dir: u32) -> FsResult<Vec<DirItem>> {
        let (_, raw) = self.load_dir(dir)?;
        Ok(parse_dir(&raw)?.0)
    }

    /// Finds `name` in `dir`, by long or short name, ignoring ASCII case.
    pub fn lookup(&mut self, dir: u32, name: &str) -> FsResult<Option<DirItem>> {
        let items = self.read_dir(dir)?;
        Ok(find(&items, name).cloned())
    }

    pub fn open_dir(&mut self, parent: u32, name: &str) -> FsResult<u32> {
        match self.lookup(parent, name)? {
            Some(item) if item.is_dir => Ok(match item.first_cluster {
                0 => self.meta.root_cluster,
                cluster => cluster,
            }),
            Some(_) => Err(FsError::Other("Not a directory")),
            None => Err(FsError::NotFound(name.to_string())),
        }
    }

    /// Returns the directory `name` of `parent`, creating it if needed.
    pub fn create_dir(&mut self, parent: u32, name: &str) -> FsResult<u32> {
        names::validate_name(name)?;
        let (chain, raw) = self.load_dir(parent)?;
        let (items, end) = parse_dir(&raw)?;
        if let Some(item) = find(&items, name) {
            return if item.is_dir {
                Ok(item.first_cluster)
            } else {
                Err(FsError::Other("A file with this name exists"))
            };
        }

        let stamp = FatTimestamp::now();
        let cluster = self
            .allocate(1, None)?
            .first()
            .copied()
            .ok_or(FsError::Other("Cluster allocation returned nothing"))?;
        let offset = self.meta.unit_offset(cluster);
        self.io
            .zero_fill(offset, self.meta.bytes_per_cluster as u64)?;

        let parent_ref = if parent == self.meta.root_cluster { 0 } else { parent };
        let mut buf = Vec::with_capacity(2 * FAT_DIR_ENTRY_SIZE);
        Fat32Entries::dot(cluster, stamp).to_raw_buffer(&mut buf);
        Fat32Entries::dotdot(parent_ref, stamp).to_raw_buffer(&mut buf);
        self.io.write_at(offset, &buf)?;

        let short = unique_short_name(&items, name);
        self.append_entries(chain, end, &Fat32Entries::dir(name, short, cluster, stamp))?;
        log::trace!("Created directory '{name}' at cluster {cluster}");
        Ok(cluster)
    }

    // === Files ===

    /// Creates `name` in `dir` with `data`, replacing any previous content.
    pub fn write_file(&mut self, dir: u32, name: &str, data: &[u8]) -> FsResult {
        names::validate_name(name)?;
        let size =
            u32::try_from(data.len()).map_err(|_| FsError::Other("File larger than 4 GiB"))?;

        let (chain, raw) = self.load_dir(dir)?;
        let (items, end) = parse_dir(&raw)?;
        let existing = find(&items, name).cloned();
        if let Some(item) = &existing {
            if item.is_dir {
                return Err(FsError::Other("A directory with this name exists"));
            }
            if item.first_cluster != 0 {
                self.free_chain(item.first_cluster)?;
            }
        }

        let stamp = FatTimestamp::now();
        let count = size.div_ceil(self.meta.bytes_per_cluster);
        let clusters = match self.allocate(count, None) {
            Ok(clusters) => clusters,
            Err(e) => {
                // the old content is gone; leave an empty file behind
                if let Some(item) = &existing {
                    self.update_entry(&chain, item.slot, 0, 0, stamp)?;
                }
                return Err(e);
            }
        };
        self.write_clusters(&clusters, data)?;
        let first = clusters.first().copied().unwrap_or(0);

        match existing {
            Some(item) => self.update_entry(&chain, item.slot, first, size, stamp)?,
            None => {
                let short = unique_short_name(&items, name);
                let entries = Fat32Entries::file(name, short, first, size, stamp);
                self.append_entries(chain, end, &entries)?;
            }
        }
        log::trace!("Wrote '{name}' ({size} bytes, {count} clusters)");
        Ok(())
    }

    pub fn read_file(&mut self, dir: u32, name: &str) -> FsResult<Vec<u8>> {
        let item = self
            .lookup(dir, name)?
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        if item.is_dir {
            return Err(FsError::Other("Is a directory"));
        }

        let size = item.size as usize;
        let mut out = vec![0u8; size];
        if size == 0 {
            return Ok(out);
        }

        let chain = self.chain(item.first_cluster)?;
        let cluster_size = self.meta.bytes_per_cluster as usize;
        if chain.len() * cluster_size < size {
            return Err(FsError::Corrupted("File is longer than its cluster chain"));
        }
        for (&cluster, buf) in chain.iter().zip(out.chunks_mut(cluster_size)) {
            self.io.read_at(self.meta.unit_offset(cluster), buf)?;
        }
        Ok(out)
    }

    /// Records the free cluster count and flushes the underlying IO.
    pub fn flush(&mut self) -> FsResult {
        if self.dirty {
            if let Some(sector) = self.fsinfo_sector {
                let info = Fat32FsInfo::new(self.free_count, self.next_free);
                self.io
                    .write_struct(self.meta.sector_offset(sector), &info)?;
            }
            self.dirty = false;
        }
        self.io.flush()?;
        Ok(())
    }
}
