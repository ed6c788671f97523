// SPDX-License-Identifier: MIT

//! Planning and execution of a provisioning run.

use core::fmt;
use std::fs::File;
use std::time::{Duration, Instant};

use cfgfs::ConfigDrivePayload;
use cfgio::prelude::*;
use cfgpart::mbr;
use cfgpart::{
    DiskGeometry, DiskTable, PartitionEntry, PartitionMove, PartitionTable, TransplantOptions,
    compute_boundary, copy_partition, read_table, transplant, write_table, zero_partition,
};
use uuid::Uuid;

use crate::errors::*;
use crate::out::target::{SourceImage, TargetImage};
use crate::request::ProvisionRequest;
use crate::utils;

/// Destination table computed for a request, nothing written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    pub geometry: DiskGeometry,
    pub table: PartitionTable,
    pub drive_slot: usize,
    pub drive: PartitionEntry,
    pub moves: Vec<PartitionMove>,
    pub source_geometry: Option<DiskGeometry>,
    /// The destination does not exist and will be created.
    pub creates_image: bool,
}

impl ProvisionPlan {
    #[inline]
    pub fn drive_offset(&self) -> u64 {
        self.drive.byte_offset(self.geometry.logical_sector_size)
    }

    #[inline]
    pub fn drive_len(&self) -> u64 {
        self.drive.byte_len(self.geometry.logical_sector_size)
    }
}

impl fmt::Display for ProvisionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.table)?;
        for mv in &self.moves {
            writeln!(
                f,
                "  source #{} -> slot {}: {} sectors, {} -> {}",
                mv.source_slot,
                mv.dest_slot,
                mv.source.sector_count,
                mv.source.start_sector,
                self.table
                    .slot(mv.dest_slot)
                    .map(|e| e.start_sector)
                    .unwrap_or_default()
            )?;
        }
        write!(
            f,
            "  config-drive: slot {} ({} at sector {})",
            self.drive_slot,
            utils::pretty_bytes(self.drive_len()),
            self.drive.start_sector
        )
    }
}

/// Outcome of `provision`.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub plan: ProvisionPlan,
    pub bytes_copied: u64,
    /// Written documents, path from the volume root and size.
    pub files: Vec<(String, u64)>,
    pub instance_uuid: Uuid,
    /// Transfers issued against the destination.
    pub io_stats: IoStats,
    pub elapsed: Duration,
}

/// Computes the destination table for `req` without writing anything.
pub fn plan(req: &ProvisionRequest) -> ProvisionResult<ProvisionPlan> {
    let (geometry, dest_table, creates_image) = detect_destination(req)?;
    log::debug!("Destination geometry: {geometry}");

    let source = match req.source.as_deref() {
        Some(path) => {
            let mut src = SourceImage::open(path)?;
            let mut io = src.as_io();
            let src_geometry =
                DiskGeometry::detect(&mut io, req.logical_sector_size, req.physical_sector_size)
                    .map_err(|e| ProvisionError::from_part(e, "probing source image"))?;
            let table = match read_table(&mut io, src_geometry)
                .map_err(|e| ProvisionError::from_part(e, "reading source table"))?
            {
                DiskTable::Legacy(t) => t,
                DiskTable::Blank => {
                    log::warn!("Source {} has no partition table", path.display());
                    PartitionTable::new(src_geometry)
                }
                DiskTable::Protective => {
                    return Err(ProvisionError::GeometryInvalid(format!(
                        "source '{}' is GPT partitioned",
                        path.display()
                    )));
                }
            };
            Some((src_geometry, table))
        }
        None => None,
    };

    let plan = plan_tables(req, geometry, dest_table, source, creates_image)?;
    log::debug!("Planned layout:\n{plan}");
    Ok(plan)
}

/// Pure planning step: no IO.
pub fn plan_tables(
    req: &ProvisionRequest,
    geometry: DiskGeometry,
    dest_table: DiskTable,
    source: Option<(DiskGeometry, PartitionTable)>,
    creates_image: bool,
) -> ProvisionResult<ProvisionPlan> {
    let (table, drive_slot, moves, source_geometry) = match source {
        Some((src_geometry, src_table)) => {
            let t = transplant(
                &src_table,
                &geometry,
                req.drive_size,
                TransplantOptions {
                    order: req.order,
                    placement: req.placement,
                },
            )
            .map_err(|e| ProvisionError::from_part(e, "planning transplant"))?;
            (t.table, t.drive_slot, t.moves, Some(src_geometry))
        }
        None => {
            let mut table = match dest_table {
                DiskTable::Blank => PartitionTable::new(geometry),
                DiskTable::Legacy(t) => {
                    log::info!(
                        "Adding config-drive to existing table ({} partition(s))",
                        t.non_empty_count()
                    );
                    t
                }
                DiskTable::Protective => {
                    return Err(ProvisionError::GeometryInvalid(
                        "destination carries a GPT protective MBR".into(),
                    ));
                }
            };
            let drive = compute_boundary(&geometry, &table, req.drive_size, req.placement)
                .map_err(|e| ProvisionError::from_part(e, "planning config-drive"))?;
            let slot = table
                .push(drive)
                .map_err(|e| ProvisionError::from_part(e, "planning config-drive"))?;
            (table, slot, Vec::new(), None)
        }
    };

    let checked = if req.allow_overlap {
        table.validate_bounds()
    } else {
        table.validate()
    };
    checked.map_err(|e| ProvisionError::from_part(e, "validating table"))?;

    let drive = *table
        .slot(drive_slot)
        .map_err(|e| ProvisionError::from_part(e, "planning config-drive"))?;
    let drive_len = drive.byte_len(geometry.logical_sector_size);
    let layout = cfgfs::plan_fat32(drive_len, &req.label)
        .map_err(|e| ProvisionError::from_fs(e, "planning config-drive"))?;
    log::debug!(
        "config-drive of {} holds {} clusters of {} B",
        utils::pretty_bytes(drive_len),
        layout.cluster_count,
        layout.bytes_per_cluster
    );

    Ok(ProvisionPlan {
        geometry,
        table,
        drive_slot,
        drive,
        moves,
        source_geometry,
        creates_image,
    })
}

fn detect_destination(req: &ProvisionRequest) -> ProvisionResult<(DiskGeometry, DiskTable, bool)> {
    if req.image.exists() {
        let mut file = File::open(&req.image)
            .map_err(|e| ProvisionError::io("opening destination image", e))?;
        let mut io = StdDiskIO::new(&mut file);
        let geometry =
            DiskGeometry::detect(&mut io, req.logical_sector_size, req.physical_sector_size)
                .map_err(|e| ProvisionError::from_part(e, "probing destination image"))?;
        let table = read_table(&mut io, geometry)
            .map_err(|e| ProvisionError::from_part(e, "reading destination table"))?;
        return Ok((geometry, table, false));
    }

    let size = req.image_size.ok_or_else(|| {
        ProvisionError::GeometryInvalid(format!(
            "'{}' does not exist and no image size is configured",
            req.image.display()
        ))
    })?;
    let geometry = DiskGeometry::from_len(size, req.logical_sector_size, req.physical_sector_size)
        .map_err(|e| ProvisionError::from_part(e, "sizing destination image"))?;
    Ok((geometry, DiskTable::Blank, true))
}

/// Runs the whole pipeline: plan, write the table, copy partitions, format
/// and fill the config-drive.
pub fn provision(req: &ProvisionRequest) -> ProvisionResult<ProvisionReport> {
    let t0 = Instant::now();
    let plan = plan(req)?;
    log::info!(
        "Config-drive: slot {} at sector {} ({})",
        plan.drive_slot,
        plan.drive.start_sector,
        utils::pretty_bytes(plan.drive_len())
    );

    let mut target = TargetImage::open_or_create(&req.image, req.image_size)?;
    let mut source = req.source.as_deref().map(SourceImage::open).transpose()?;

    let mut bytes_copied = 0u64;
    let (files, instance_uuid, io_stats) = {
        let mut dest_io = target.as_io();
        let mut dest = IOCounter::new(&mut dest_io);

        if let Some(src) = source.as_mut() {
            mbr::copy_boot_code(&mut src.as_io(), &mut dest)
                .map_err(|e| ProvisionError::from_part(e, "copying boot code"))?;
        }
        write_table(&mut dest, &plan.table)
            .map_err(|e| ProvisionError::from_part(e, "writing partition table"))?;
        verify_table(&mut dest, &plan)?;
        log::info!(
            "MBR written ({} partition(s))",
            plan.table.non_empty_count()
        );

        if let (Some(src), Some(src_geometry)) = (source.as_mut(), plan.source_geometry.as_ref())
        {
            let mut src_io = src.as_io();
            for mv in &plan.moves {
                let len = mv.source.byte_len(src_geometry.logical_sector_size);
                let pb = utils::copy_progress(
                    len,
                    &format!("partition {}", mv.dest_slot),
                    req.show_progress,
                );
                let n = copy_partition(
                    &mut src_io,
                    src_geometry,
                    mv,
                    &mut dest,
                    &plan.table,
                    |done, _| pb.set_position(done),
                )
                .map_err(|e| ProvisionError::from_part(e, "copying partition"))?;
                pb.finish_and_clear();
                log::info!(
                    "Copied partition {} -> slot {} ({})",
                    mv.source_slot,
                    mv.dest_slot,
                    utils::pretty_bytes(n)
                );
                bytes_copied += n;
            }
        }

        zero_partition(&mut dest, &plan.table, plan.drive_slot)
            .map_err(|e| ProvisionError::from_part(e, "zeroing config-drive"))?;

        let (offset, len) = (plan.drive_offset(), plan.drive_len());
        cfgfs::format_fat32(&mut dest, offset, len, &req.label)
            .map_err(|e| ProvisionError::from_fs(e, "formatting config-drive"))?;
        log::info!("FAT32 volume '{}' created", req.label);

        let payload = ConfigDrivePayload::new(
            req.hostname.clone(),
            req.public_keys.clone(),
            req.network.clone(),
        );
        let summary = cfgfs::with_volume(&mut dest, offset, len, |fs| {
            cfgfs::provision(fs, &payload)
        })
        .map_err(|e| ProvisionError::from_fs(e, "writing config-drive files"))?;
        let stats = dest.snapshot();
        log::debug!(
            "Destination IO: {} writes ({}), {} reads ({})",
            stats.writes,
            utils::pretty_bytes(stats.write_bytes),
            stats.reads,
            utils::pretty_bytes(stats.read_bytes)
        );
        (summary.files, payload.meta.uuid, stats)
    };
    target.sync()?;

    let elapsed = t0.elapsed();
    log::info!(
        "Image {} provisioned in {:.2}s",
        req.image.display(),
        elapsed.as_secs_f32()
    );
    Ok(ProvisionReport {
        plan,
        bytes_copied,
        files,
        instance_uuid,
        io_stats,
        elapsed,
    })
}

/// Reads the entries back and compares them with the plan.
fn verify_table<IO: DiskIO + ?Sized>(io: &mut IO, plan: &ProvisionPlan) -> ProvisionResult<()> {
    let written = mbr::read_mbr(io)
        .map_err(|e| ProvisionError::from_part(e, "verifying partition table"))?;
    let back = PartitionTable::from_mbr(plan.geometry, &written);
    if back != plan.table {
        return Err(ProvisionError::io(
            "verifying partition table",
            "read-back table differs from the planned one",
        ));
    }
    Ok(())
}
