// SPDX-License-Identifier: GPL-3.0-only

//! Pending-operation ledger
//!
//! The ledger holds the delta between the scanned disks and the planned
//! layout: disks whose table is recreated, existing regions to delete and
//! new regions to create in physical order. Engine operations never touch
//! it directly; they return [`Effect`]s that the session commits together
//! with the new tree.

use std::collections::BTreeMap;

use station_types::{
    Disk, DiskMap, Extent, PendingCreate, PendingDelete, PendingDestroy, PendingPlan, Region,
    RegionId, RegionStatus, Scheme, SummaryLine, index_in_parent,
};
use tracing::debug;

use crate::error::{PlanError, Result};

/// Ledger change produced by an engine operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    Destroy { disk: String, scheme: Scheme },
    Delete(PendingDelete),
    Create(PendingCreate),
    /// A region created in this session was discarded, with its children
    Retract { id: RegionId, name: String },
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    destroy: BTreeMap<String, Scheme>,
    delete: Vec<PendingDelete>,
    create: Vec<PendingCreate>,
    frozen: bool,
}

impl Ledger {
    pub fn destroy(&self) -> &BTreeMap<String, Scheme> {
        &self.destroy
    }

    pub fn delete(&self) -> &[PendingDelete] {
        &self.delete
    }

    pub fn create(&self) -> &[PendingCreate] {
        &self.create
    }

    pub fn is_empty(&self) -> bool {
        self.destroy.is_empty() && self.delete.is_empty() && self.create.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.frozen {
            return Err(PlanError::LedgerFrozen);
        }
        Ok(())
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    pub(crate) fn thaw(&mut self) {
        self.frozen = false;
    }

    pub(crate) fn reset(&mut self) {
        self.destroy.clear();
        self.delete.clear();
        self.create.clear();
    }

    pub(crate) fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Destroy { disk, scheme } => {
                    self.delete.retain(|d| !on_disk(&disk, &d.parent));
                    self.create.retain(|c| !on_disk(&disk, &c.parent));
                    self.destroy.insert(disk, scheme);
                }
                Effect::Delete(entry) => {
                    if self.delete.iter().any(|d| d.id == entry.id) {
                        debug!("{} already scheduled for deletion", entry.name);
                    } else {
                        self.delete.push(entry);
                    }
                }
                Effect::Create(entry) => self.create.push(entry),
                Effect::Retract { id, name } => {
                    self.create.retain(|c| c.id != id && c.parent != name);
                }
            }
        }
    }

    /// Snapshot of the ledger plus the new-region summary of `disks`
    pub fn plan(&self, disks: &DiskMap) -> PendingPlan {
        PendingPlan {
            destroy: self
                .destroy
                .iter()
                .map(|(disk, scheme)| PendingDestroy {
                    disk: disk.clone(),
                    scheme: *scheme,
                })
                .collect(),
            delete: self.delete.clone(),
            create: self.create.clone(),
            label_tables: self.label_tables(disks),
            summary: disks.values().flat_map(summary_lines).collect(),
        }
    }

    /// Existing slices without a label table that pending labels go into
    fn label_tables(&self, disks: &DiskMap) -> Vec<String> {
        let bare = disks
            .values()
            .flat_map(|disk| &disk.regions)
            .filter_map(|region| match region {
                Region::Slice(slice)
                    if slice.status == RegionStatus::Unset && !slice.label_table =>
                {
                    Some(slice.name.as_str())
                }
                _ => None,
            })
            .collect::<Vec<_>>();

        let mut tables: Vec<String> = Vec::new();
        for create in &self.create {
            if bare.contains(&create.parent.as_str()) && !tables.contains(&create.parent) {
                tables.push(create.parent.clone());
            }
        }
        tables
    }
}

/// Whether `parent` is `disk` itself or one of its slices
fn on_disk(disk: &str, parent: &str) -> bool {
    parent == disk || index_in_parent(disk, parent).is_some()
}

/// New-region summary of one disk in sibling order.
///
/// GPT lists every new partition. MBR lists the new labels of every slice;
/// slices themselves are containers and never appear.
pub fn summary_lines(disk: &Disk) -> Vec<SummaryLine> {
    let line = |region: &Region| SummaryLine {
        fs: region.fs(),
        size_mb: region.size_mb(),
        mount_point: region.mount_point().to_string(),
    };

    match disk.scheme {
        Some(Scheme::Gpt) => disk
            .regions
            .iter()
            .filter(|r| matches!(r, Region::Partition(_)) && r.is_new())
            .map(line)
            .collect(),
        Some(Scheme::Mbr) => disk
            .regions
            .iter()
            .flat_map(Region::children)
            .filter(|r| matches!(r, Region::Label(_)) && r.is_new())
            .map(line)
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use station_types::FsKind;

    fn delete(name: &str, parent: &str, index: u32) -> Effect {
        Effect::Delete(PendingDelete {
            id: RegionId::scanned(name),
            name: name.to_string(),
            parent: parent.to_string(),
            index,
        })
    }

    fn create(id: RegionId, name: &str, parent: &str, index: u32) -> Effect {
        Effect::Create(PendingCreate {
            id,
            name: name.to_string(),
            parent: parent.to_string(),
            index,
            size_mb: 100,
            fs: FsKind::Ufs,
        })
    }

    #[test]
    fn deletions_are_recorded_once() {
        let mut ledger = Ledger::default();
        ledger.apply(vec![delete("ada0p2", "ada0", 2)]);
        ledger.apply(vec![delete("ada0p2", "ada0", 2)]);
        assert_eq!(ledger.delete().len(), 1);
    }

    #[test]
    fn retract_drops_region_and_children() {
        let slice = RegionId::random();
        let mut ledger = Ledger::default();
        ledger.apply(vec![
            create(slice, "ada0s1", "ada0", 1),
            create(RegionId::random(), "ada0s1a", "ada0s1", 1),
            create(RegionId::random(), "ada0s2", "ada0", 2),
        ]);
        ledger.apply(vec![Effect::Retract {
            id: slice,
            name: "ada0s1".to_string(),
        }]);
        let names: Vec<&str> = ledger.create().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ada0s2"]);
    }

    #[test]
    fn destroy_supersedes_entries_of_that_disk_only() {
        let mut ledger = Ledger::default();
        ledger.apply(vec![
            delete("ada0p1", "ada0", 1),
            delete("ada1s1a", "ada1s1", 1),
            delete("ada10p1", "ada10", 1),
            create(RegionId::random(), "ada1s2", "ada1", 2),
        ]);
        ledger.apply(vec![Effect::Destroy {
            disk: "ada1".to_string(),
            scheme: Scheme::Gpt,
        }]);

        let names: Vec<&str> = ledger.delete().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["ada0p1", "ada10p1"]);
        assert!(ledger.create().is_empty());
        assert_eq!(ledger.destroy().get("ada1"), Some(&Scheme::Gpt));
    }

    #[test]
    fn frozen_ledger_refuses_writes() {
        let mut ledger = Ledger::default();
        ledger.freeze();
        assert_eq!(ledger.ensure_writable(), Err(PlanError::LedgerFrozen));
        ledger.thaw();
        assert_eq!(ledger.ensure_writable(), Ok(()));
    }
}
