// SPDX-License-Identifier: MIT

use std::fs::File;
use std::path::PathBuf;

use cfggen::config::Config;
use cfggen::config::size::Size;
use cfggen::utils::{self, LogLevel};
use cfgio::prelude::*;
use cfgpart::{DiskGeometry, DiskTable, read_table};
use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "cfggen", version, about = "Config-drive image generator", long_about = None)]
struct Cli {
    /// Debug output
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a config-drive partition to an image from drive.toml
    Build {
        /// Config path
        #[arg(short, long, default_value = "drive.toml")]
        config: PathBuf,
        /// Destination image or block device
        #[arg(short, long)]
        image: PathBuf,
        /// Image whose partitions are copied in first
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// Config-drive size, overrides drive.size
        #[arg(long)]
        size: Option<Size>,
        /// Size of the destination if it has to be created, overrides image.size
        #[arg(long)]
        image_size: Option<Size>,
        /// Only print the planned table, don't write anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the partition table of an image
    Inspect {
        image: PathBuf,
        #[arg(long, default_value_t = cfgpart::DEFAULT_SECTOR_SIZE)]
        sector_size: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = LogLevel::from_flags(cli.quiet, cli.verbose);
    utils::init_logger(level);

    match cli.command {
        Commands::Build {
            config,
            image,
            source,
            size,
            image_size,
            dry_run,
        } => {
            let config = Config::from_file(&config)?;
            let mut req = config.to_request(image, source);
            if let Some(size) = size {
                req.drive_size = size.bytes();
            }
            if let Some(size) = image_size {
                req.image_size = Some(size.bytes());
            }
            req.show_progress = level != LogLevel::Quiet;

            if dry_run {
                let plan = cfggen::plan(&req)?;
                println!("{}", "Dry run, nothing written.".yellow());
                println!("{plan}");
                return Ok(());
            }

            let report = cfggen::provision(&req)?;
            println!("{}", report.plan);
            for (path, len) in &report.files {
                println!("  {} {path} ({})", "+".green(), utils::pretty_bytes(*len));
            }
            println!(
                "{} {} (instance {}, {} copied, {:.2}s)",
                "Done:".green().bold(),
                req.image.display(),
                report.instance_uuid,
                utils::pretty_bytes(report.bytes_copied),
                report.elapsed.as_secs_f32()
            );
        }
        Commands::Inspect { image, sector_size } => {
            let mut file = File::open(&image)
                .map_err(|e| anyhow::anyhow!("Cannot open '{}': {e}", image.display()))?;
            let mut io = StdDiskIO::new(&mut file);
            let geometry = DiskGeometry::detect(&mut io, sector_size, sector_size)?;
            println!("{} {geometry}", image.display().to_string().bold());
            match read_table(&mut io, geometry)? {
                DiskTable::Blank => println!("{}", "No MBR signature".yellow()),
                DiskTable::Protective => println!("{}", "GPT protective MBR".yellow()),
                DiskTable::Legacy(table) => println!("{table}"),
            }
        }
    }

    Ok(())
}
