//! Build partition trees from raw inventory reports
//!
//! Reports are normalised so every sibling list fills its parent: empty
//! entries are dropped, neighbouring free lines are coalesced and space
//! the table does not account for becomes trailing free space.

use station_sys::{DiskReport, EntryReport};
use station_types::{
    Disk, DiskMap, Extent, FREESPACE_PREFIX, Freespace, FsKind, Region, RegionStatus, Scheme,
    Slice, Volume, next_free_name,
};
use tracing::{debug, warn};

use crate::error::{PlanError, Result};

pub fn build_disk_map(reports: Vec<DiskReport>) -> Result<DiskMap> {
    reports
        .into_iter()
        .map(|report| build_disk(report).map(|disk| (disk.name.clone(), disk)))
        .collect()
}

pub fn build_disk(report: DiskReport) -> Result<Disk> {
    let scheme = Scheme::parse(&report.scheme);

    let regions = match scheme {
        None => {
            if !report.entries.is_empty() {
                warn!(
                    "{}: ignoring {} entries of unsupported scheme '{}'",
                    report.name,
                    report.entries.len(),
                    report.scheme
                );
            }
            vec![whole(report.size_mb)]
        }
        Some(scheme) => {
            let regions = report
                .entries
                .into_iter()
                .map(|entry| top_level(entry, scheme))
                .collect::<Result<Vec<_>>>()?;
            normalise(&report.name, regions, report.size_mb)?
        }
    };

    debug!(
        "{}: {} regions, scheme {:?}",
        report.name,
        regions.len(),
        scheme
    );
    Ok(Disk {
        name: report.name,
        size_mb: report.size_mb,
        model: report.model,
        scheme,
        regions,
    })
}

fn whole(size_mb: u64) -> Region {
    Region::Freespace(Freespace::new(format!("{FREESPACE_PREFIX}1"), size_mb))
}

fn top_level(entry: EntryReport, scheme: Scheme) -> Result<Region> {
    if entry.is_free() {
        return Ok(Region::Freespace(Freespace::new("", entry.size_mb)));
    }

    let fs = FsKind::from_gpart_type(&entry.kind);
    match scheme {
        Scheme::Gpt => Ok(Region::Partition(scanned_volume(entry, fs))),
        Scheme::Mbr if fs == FsKind::Bsd => {
            // gpart shows nothing below a slice without a BSD table
            let bare = entry.labels.is_empty();
            let labels = entry
                .labels
                .into_iter()
                .map(|label| {
                    if label.is_free() {
                        Region::Freespace(Freespace::new("", label.size_mb))
                    } else {
                        let fs = FsKind::from_gpart_type(&label.kind);
                        Region::Label(scanned_volume(label, fs))
                    }
                })
                .collect();
            let labels = normalise(&entry.name, labels, entry.size_mb)?;
            let slice = Slice::new(entry.name, entry.size_mb, fs, RegionStatus::Unset, labels);
            Ok(Region::Slice(if bare {
                debug!("{}: no BSD label table yet", slice.name);
                slice.without_label_table()
            } else {
                slice
            }))
        }
        Scheme::Mbr => Ok(Region::Slice(Slice::new(
            entry.name,
            entry.size_mb,
            fs,
            RegionStatus::Unset,
            Vec::new(),
        ))),
    }
}

fn scanned_volume(entry: EntryReport, fs: FsKind) -> Volume {
    Volume::new(
        entry.name,
        entry.size_mb,
        fs,
        entry.mount_point,
        RegionStatus::Unset,
    )
}

/// Make `regions` fill exactly `size_mb`, naming free space as it goes
fn normalise(parent: &str, regions: Vec<Region>, size_mb: u64) -> Result<Vec<Region>> {
    let mut out: Vec<Region> = Vec::with_capacity(regions.len() + 1);

    for region in regions {
        if region.size_mb() == 0 {
            debug!("{parent}: dropping empty entry '{}'", region.name());
            continue;
        }
        if let (Some(Region::Freespace(last)), Region::Freespace(free)) =
            (out.last_mut(), &region)
        {
            last.size_mb += free.size_mb;
            continue;
        }
        out.push(region);
    }

    let used: u64 = out.iter().map(Extent::size_mb).sum();
    if used > size_mb {
        return Err(PlanError::inventory(format!(
            "{parent}: entries use {used} MB of {size_mb} MB"
        )));
    }

    let remainder = size_mb - used;
    if remainder > 0 {
        if let Some(Region::Freespace(last)) = out.last_mut() {
            last.size_mb += remainder;
        } else {
            out.push(Region::Freespace(Freespace::new("", remainder)));
        }
    }

    for i in 0..out.len() {
        if out[i].is_freespace() {
            let name = next_free_name(out.iter().map(Extent::name), FREESPACE_PREFIX);
            out[i] = Region::Freespace(Freespace::new(name, out[i].size_mb()));
        }
    }

    Ok(out)
}
