// SPDX-License-Identifier: GPL-3.0-only

//! Layout mutation engine
//!
//! Each operation takes the current disk by reference and returns a
//! [`Mutation`]: the complete replacement disk plus the ledger effects it
//! implies. Nothing is committed until the whole operation succeeded, so a
//! refused operation leaves the session untouched.

pub(crate) mod auto;
pub(crate) mod create;
pub(crate) mod delete;
pub(crate) mod scheme;

use station_types::{Disk, Extent, Firmware, PendingCreate, Region, RegionPath, index_in_parent};

use crate::config::PlannerConfig;
use crate::error::{PlanError, Result};
use crate::ledger::Effect;

pub use create::CreateKind;
pub use scheme::SchemeChange;

/// Machine facts and tunables an operation may consult
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context<'a> {
    pub firmware: Firmware,
    pub config: &'a PlannerConfig,
}

/// Outcome of a successful engine operation, not yet committed
#[derive(Debug)]
pub(crate) struct Mutation {
    pub disk: Disk,
    pub effects: Vec<Effect>,
}

/// Position of a region: top level when `slice` is `None`, otherwise inside
/// the slice at that top-level index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub slice: Option<usize>,
    pub index: usize,
}

pub(crate) fn locate(disk: &Disk, path: &RegionPath) -> Result<Slot> {
    let position = |siblings: &[Region], name: &str| {
        siblings
            .iter()
            .position(|r| r.name() == name)
            .ok_or_else(|| PlanError::invalid(path, "no such region"))
    };

    match path.segments.as_slice() {
        [] => Err(PlanError::invalid(path, "no region selected")),
        [name] => Ok(Slot {
            slice: None,
            index: position(&disk.regions, name.as_str())?,
        }),
        [slice, name] => {
            let slice_index = position(&disk.regions, slice.as_str())?;
            let Region::Slice(parent) = &disk.regions[slice_index] else {
                return Err(PlanError::invalid(path, format!("{slice} has no labels")));
            };
            Ok(Slot {
                slice: Some(slice_index),
                index: position(&parent.labels, name.as_str())?,
            })
        }
        _ => Err(PlanError::invalid(path, "regions nest at most two levels deep")),
    }
}

pub(crate) fn siblings(disk: &Disk, slice: Option<usize>) -> &[Region] {
    match slice {
        None => &disk.regions,
        Some(i) => disk.regions.get(i).map_or(&[][..], Region::children),
    }
}

/// Mutable sibling list of `slice`; `locate` guarantees the slot exists
pub(crate) fn siblings_mut<'d>(
    disk: &'d mut Disk,
    slice: Option<usize>,
    path: &RegionPath,
) -> Result<&'d mut Vec<Region>> {
    match slice {
        None => Ok(&mut disk.regions),
        Some(i) => disk
            .regions
            .get_mut(i)
            .and_then(Region::children_mut)
            .ok_or_else(|| PlanError::invalid(path, "containing slice disappeared")),
    }
}

/// Name of the disk or slice holding `slice`'s children
pub(crate) fn parent_name(disk: &Disk, slice: Option<usize>) -> &str {
    slice
        .and_then(|i| disk.regions.get(i))
        .map_or(disk.name.as_str(), Region::name)
}

/// Ledger entry creating `region` inside `parent`
pub(crate) fn create_effect(region: &Region, parent: &str) -> Result<Effect> {
    let id = region
        .id()
        .ok_or_else(|| PlanError::invalid(region.name(), "free space is never created"))?;
    let index = index_in_parent(parent, region.name()).ok_or_else(|| {
        PlanError::invalid(region.name(), format!("name does not belong to {parent}"))
    })?;

    Ok(Effect::Create(PendingCreate {
        id,
        name: region.name().to_string(),
        parent: parent.to_string(),
        index,
        size_mb: region.size_mb(),
        fs: region.fs(),
    }))
}

/// Region at `slot`, which must be free space
pub(crate) fn free_target<'d>(disk: &'d Disk, slot: Slot, path: &RegionPath) -> Result<&'d Region> {
    let region = &siblings(disk, slot.slice)[slot.index];
    if !region.is_freespace() {
        return Err(PlanError::invalid(path, "target is not free space"));
    }
    Ok(region)
}

pub(crate) fn check_size(path: &RegionPath, size_mb: u64, available_mb: u64) -> Result<()> {
    if size_mb == 0 {
        return Err(PlanError::invalid(path, "size must be at least 1 MB"));
    }
    if size_mb > available_mb {
        return Err(PlanError::invalid(
            path,
            format!("{size_mb} MB requested but only {available_mb} MB free"),
        ));
    }
    Ok(())
}
