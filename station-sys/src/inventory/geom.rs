//! FreeBSD GEOM inventory backed by `sysctl`, `diskinfo` and `gpart`

use station_types::Firmware;
use tracing::{debug, warn};

use super::{DeviceInventory, DiskReport, EntryReport};
use crate::cmd::run_capture;
use crate::firmware::detect_firmware;
use crate::{Result, SysError};

const MIB: u64 = 1024 * 1024;

/// Optical drive prefixes that never take a partition table
const OPTICAL_PREFIXES: [&str; 3] = ["acd", "cd", "scd"];

/// Values read from `diskinfo -v`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskInfo {
    pub sector_size: u64,
    pub media_bytes: u64,
    pub description: String,
}

/// Inventory of the running FreeBSD system
#[derive(Debug, Default, Clone, Copy)]
pub struct FreeBsdInventory;

impl FreeBsdInventory {
    pub fn new() -> Self {
        Self
    }

    fn report(&self, name: &str) -> Result<DiskReport> {
        let info = parse_diskinfo(&run_capture("diskinfo", &["-v", name])?).ok_or_else(|| {
            SysError::InvalidInventory {
                source_name: name.to_string(),
                reason: "diskinfo reported no media size".to_string(),
            }
        })?;

        let (scheme, mut entries) = match run_capture("gpart", &["show", "-p", name]) {
            Ok(output) => parse_gpart_show(&output, info.sector_size).unwrap_or_default(),
            Err(error) => {
                debug!("{name} has no partition table: {error}");
                (String::new(), Vec::new())
            }
        };

        if scheme == "MBR" {
            for entry in entries.iter_mut().filter(|e| e.kind == "freebsd") {
                match run_capture("gpart", &["show", "-p", &entry.name]) {
                    Ok(output) => {
                        if let Some((_, labels)) = parse_gpart_show(&output, info.sector_size) {
                            entry.labels = labels;
                        }
                    }
                    Err(error) => debug!("{} carries no BSD label: {error}", entry.name),
                }
            }
        }

        Ok(DiskReport {
            name: name.to_string(),
            size_mb: info.media_bytes / MIB,
            model: info.description,
            scheme,
            entries,
        })
    }
}

impl DeviceInventory for FreeBsdInventory {
    fn scan(&self) -> Result<Vec<DiskReport>> {
        let names = parse_kern_disks(&run_capture("sysctl", &["-n", "kern.disks"])?);
        if names.is_empty() {
            warn!("kern.disks lists no usable disks");
        }
        names.iter().map(|name| self.report(name)).collect()
    }

    fn firmware(&self) -> Result<Firmware> {
        detect_firmware()
    }
}

/// Disk names from `sysctl -n kern.disks`, optical drives removed, sorted
pub fn parse_kern_disks(output: &str) -> Vec<String> {
    let mut names: Vec<String> = output
        .split_whitespace()
        .filter(|name| {
            !OPTICAL_PREFIXES.iter().any(|prefix| {
                name.strip_prefix(prefix)
                    .is_some_and(|rest| rest.bytes().all(|b| b.is_ascii_digit()))
            })
        })
        .map(str::to_string)
        .collect();
    names.sort();
    names
}

/// Parse `diskinfo -v <disk>`; `None` when the media size is missing
pub fn parse_diskinfo(output: &str) -> Option<DiskInfo> {
    let mut info = DiskInfo::default();
    let mut has_size = false;

    for line in output.lines() {
        let Some((value, key)) = line.split_once('#') else {
            continue;
        };
        let value = value.trim();
        let key = key.trim();

        if key == "sectorsize" {
            info.sector_size = value.parse().ok()?;
        } else if key.starts_with("mediasize in bytes") {
            info.media_bytes = value.parse().ok()?;
            has_size = true;
        } else if key == "Disk descr." {
            info.description = value.to_string();
        }
    }

    has_size.then_some(info)
}

/// Parse `gpart show -p <geom>` into the scheme and its entries.
///
/// Returns `None` when the output has no `=>` header line. Sizes are in
/// whole megabytes, rounded down.
pub fn parse_gpart_show(output: &str, sector_size: u64) -> Option<(String, Vec<EntryReport>)> {
    let sector_size = if sector_size == 0 { 512 } else { sector_size };
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());

    let header: Vec<&str> = lines.next()?.split_whitespace().collect();
    if header.first() != Some(&"=>") || header.len() < 5 {
        return None;
    }
    let scheme = header[4].to_string();

    let entries = lines
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let sectors: u64 = parts.get(1)?.parse().ok()?;
            let size_mb = sectors * sector_size / MIB;

            if parts.get(2..5) == Some(&["-", "free", "-"][..]) {
                return Some(EntryReport {
                    name: String::new(),
                    size_mb,
                    kind: "free".to_string(),
                    mount_point: String::new(),
                    labels: Vec::new(),
                });
            }

            Some(EntryReport {
                name: parts.get(2)?.to_string(),
                size_mb,
                kind: parts.get(3)?.to_string(),
                mount_point: String::new(),
                labels: Vec::new(),
            })
        })
        .collect();

    Some((scheme, entries))
}
