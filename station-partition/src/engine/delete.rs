//! Removing regions and folding the space back into free space

use station_types::{Disk, Extent, PendingDelete, Region, RegionPath, merge_adjacent_freespace};
use tracing::info;

use super::{Mutation, locate, parent_name, siblings, siblings_mut};
use crate::error::{PlanError, Result};
use crate::ledger::Effect;

/// Delete the region at `path`.
///
/// Scanned regions are scheduled for deletion; regions created in this
/// session are dropped from the create list along with their labels.
pub(crate) fn delete(disk: &Disk, path: &RegionPath) -> Result<Mutation> {
    let slot = locate(disk, path)?;
    let region = &siblings(disk, slot.slice)[slot.index];
    if region.is_freespace() {
        return Err(PlanError::invalid(path, "free space cannot be deleted"));
    }

    let id = region
        .id()
        .ok_or_else(|| PlanError::invalid(path, "region has no identity"))?;
    let parent = parent_name(disk, slot.slice).to_string();
    let name = region.name().to_string();

    let mut effects = Vec::new();
    if region.is_new() {
        effects.push(Effect::Retract {
            id,
            name: name.clone(),
        });
    } else {
        let index = station_types::index_in_parent(&parent, &name).ok_or_else(|| {
            PlanError::invalid(path, format!("cannot address {name} inside {parent}"))
        })?;
        effects.push(Effect::Delete(PendingDelete {
            id,
            name: name.clone(),
            parent,
            index,
        }));
        if matches!(region, Region::Slice(_)) {
            effects.push(Effect::Retract {
            id,
            name: name.clone(),
        });
        }
    }

    let mut updated = disk.clone();
    let list = siblings_mut(&mut updated, slot.slice, path)?;
    merge_adjacent_freespace(list, slot.index)
        .ok_or_else(|| PlanError::invalid(path, "region vanished while merging"))?;
    info!("{path}: deleted {name} ({} MB)", region.size_mb());

    Ok(Mutation {
        disk: updated,
        effects,
    })
}
