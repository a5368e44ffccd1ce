//! Splitting free space into new partitions, slices and labels

use station_types::{
    Disk, Extent, Freespace, FsKind, MAX_PRIMARY_SLICES, Region, RegionPath, RegionStatus,
    Scheme, Slice, Volume, next_free_name, next_label_name, partition_prefix, slice_prefix,
};
use tracing::info;

use super::{Context, Mutation, Slot, check_size, create_effect, free_target, locate};
use crate::error::{PlanError, Result};
use crate::policy::suggest_fs;

/// Shape of region a create operation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    /// GPT partition
    Partition,
    /// Primary MBR slice
    Slice,
    /// BSD label inside a slice
    Label,
}

/// What a free slot of `disk` can hold
pub(crate) fn kind_at(disk: &Disk, slot: Slot) -> Result<CreateKind> {
    match (disk.scheme, slot.slice) {
        (None, _) => {
            Err(PlanError::conflict(&disk.name, "disk has no partition scheme; set one first"))
        }
        (Some(Scheme::Gpt), None) => Ok(CreateKind::Partition),
        (Some(Scheme::Mbr), None) => Ok(CreateKind::Slice),
        (Some(Scheme::Mbr), Some(_)) => Ok(CreateKind::Label),
        (Some(Scheme::Gpt), Some(_)) => {
            Err(PlanError::conflict(&disk.name, "GPT partitions cannot be nested"))
        }
    }
}

/// Split the free region at `path` into a new region of `size_mb` and the
/// remaining free space.
///
/// `expected` pins the kind of region the caller asked for; a path that
/// would produce another kind is a scheme conflict. When `fs` is `None` the
/// default policy picks one.
pub(crate) fn create(
    disk: &Disk,
    path: &RegionPath,
    size_mb: u64,
    fs: Option<FsKind>,
    mount_point: &str,
    expected: Option<CreateKind>,
    ctx: Context<'_>,
) -> Result<Mutation> {
    let slot = locate(disk, path)?;
    let kind = kind_at(disk, slot)?;
    if let Some(expected) = expected
        && expected != kind
    {
        return Err(PlanError::conflict(
            &disk.name,
            format!("{path} holds a {kind:?}, not a {expected:?}"),
        ));
    }

    let target = free_target(disk, slot, path)?;
    check_size(path, size_mb, target.size_mb())?;

    let fs = fs.unwrap_or_else(|| suggest_fs(disk, slot.slice, slot.index, ctx.firmware));
    check_fs(disk, kind, fs, path)?;

    let mount_point = mount_point_for(disk, fs, mount_point, ctx, path)?;
    let region = match kind {
        CreateKind::Partition => {
            let name = next_free_name(
                disk.regions.iter().map(Extent::name),
                &partition_prefix(&disk.name),
            );
            Region::Partition(Volume::new(name, size_mb, fs, mount_point, RegionStatus::New))
        }
        CreateKind::Slice => {
            let slices = disk
                .regions
                .iter()
                .filter(|r| matches!(r, Region::Slice(_)))
                .count();
            if slices >= MAX_PRIMARY_SLICES as usize {
                return Err(PlanError::conflict(
                    &disk.name,
                    format!("MBR allows at most {MAX_PRIMARY_SLICES} primary slices"),
                ));
            }
            let name = next_free_name(
                disk.regions.iter().map(Extent::name),
                &slice_prefix(&disk.name),
            );
            new_slice(name, size_mb)
        }
        CreateKind::Label => {
            let slice = super::parent_name(disk, slot.slice);
            let labels = super::siblings(disk, slot.slice);
            let taken = labels.iter().map(Extent::name);
            let name = next_label_name(slice, taken).ok_or_else(|| {
                PlanError::invalid(path, format!("{slice} has no label letters left"))
            })?;
            Region::Label(Volume::new(name, size_mb, fs, mount_point, RegionStatus::New))
        }
    };

    let parent = super::parent_name(disk, slot.slice).to_string();
    let effect = create_effect(&region, &parent)?;
    let remainder = target.size_mb() - size_mb;
    let residual = Freespace::new(target.name(), remainder);
    info!(
        "{path}: new {kind:?} {} ({size_mb} MB, {fs})",
        region.name()
    );

    let mut updated = disk.clone();
    let siblings = super::siblings_mut(&mut updated, slot.slice, path)?;
    siblings[slot.index] = region;
    if remainder > 0 {
        siblings.insert(slot.index + 1, Region::Freespace(residual));
    }

    Ok(Mutation {
        disk: updated,
        effects: vec![effect],
    })
}

/// A new BSD slice whose labels start as one free region
pub(crate) fn new_slice(name: String, size_mb: u64) -> Region {
    Region::Slice(Slice::new(
        name,
        size_mb,
        FsKind::Bsd,
        RegionStatus::New,
        vec![Region::Freespace(Freespace::new("freespace1", size_mb))],
    ))
}

fn check_fs(disk: &Disk, kind: CreateKind, fs: FsKind, path: &RegionPath) -> Result<()> {
    match (kind, fs) {
        (_, FsKind::Freespace | FsKind::None) => {
            Err(PlanError::invalid(path, format!("cannot create a region of kind {fs}")))
        }
        (CreateKind::Slice, FsKind::Bsd) => Ok(()),
        (CreateKind::Slice, _) => Err(PlanError::conflict(
            &disk.name,
            format!("{fs} belongs in a label inside a slice"),
        )),
        (_, FsKind::Bsd) => Err(PlanError::conflict(
            &disk.name,
            "BSD slices only exist at the top of an MBR disk",
        )),
        (CreateKind::Label, FsKind::Uefi | FsKind::Boot) => {
            Err(PlanError::conflict(&disk.name, format!("{fs} regions need a GPT disk")))
        }
        _ => Ok(()),
    }
}

/// Mount point stored for a new region of `fs`
pub(crate) fn mount_point_for(
    disk: &Disk,
    fs: FsKind,
    requested: &str,
    ctx: Context<'_>,
    path: &RegionPath,
) -> Result<String> {
    let requested = requested.trim();
    match fs {
        FsKind::Zfs => Ok(ctx.config.zfs_datasets.clone()),
        FsKind::Ufs if requested.is_empty() || requested == "none" => Ok(String::new()),
        FsKind::Ufs => {
            if !requested.starts_with('/') {
                return Err(PlanError::invalid(
                    path,
                    format!("mount point '{requested}' is not absolute"),
                ));
            }
            let clashes = |r: &Region| r.is_new() && r.mount_point() == requested;
            if disk.walk().any(clashes) {
                return Err(PlanError::invalid(
                    path,
                    format!("{requested} is already mounted by a new region"),
                ));
            }
            Ok(requested.to_string())
        }
        _ => Ok(String::new()),
    }
}
