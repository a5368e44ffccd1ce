// SPDX-License-Identifier: GPL-3.0-only

//! Planning session
//!
//! A [`Session`] owns the working partition tree, the snapshot it was
//! scanned from and the pending-operation ledger. Every mutation runs the
//! engine against a copy of one disk and commits the new disk and its
//! ledger effects together, or nothing at all.

use station_sys::DeviceInventory;
use station_types::{
    Disk, DiskMap, Extent, Firmware, FsKind, PendingPlan, Region, RegionId, RegionPath, Scheme,
    siblings_fit,
};
use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::engine::{self, Context, CreateKind, Mutation, SchemeChange};
use crate::error::{PlanError, Result};
use crate::inventory::build_disk_map;
use crate::ledger::Ledger;
use crate::policy;
use crate::validate::{ValidationReport, validate_disk};

pub struct Session<I: DeviceInventory> {
    inventory: I,
    config: PlannerConfig,
    firmware: Firmware,
    disks: DiskMap,
    snapshot: DiskMap,
    ledger: Ledger,
}

impl<I: DeviceInventory> Session<I> {
    /// Scan `inventory` and start an empty plan.
    ///
    /// The configured firmware wins over what the inventory detects.
    pub fn new(inventory: I, config: PlannerConfig) -> Result<Self> {
        let firmware = match config.firmware {
            Some(firmware) => firmware,
            None => inventory.firmware()?,
        };
        let disks = build_disk_map(inventory.scan()?)?;
        info!(
            "session started: {} disks, {firmware} firmware",
            disks.len()
        );

        Ok(Self {
            inventory,
            config,
            firmware,
            snapshot: disks.clone(),
            disks,
            ledger: Ledger::default(),
        })
    }

    /// Rescan the inventory without touching the tree or the ledger
    pub fn scan_devices(&self) -> Result<DiskMap> {
        build_disk_map(self.inventory.scan()?)
    }

    pub fn get_tree(&self) -> &DiskMap {
        &self.disks
    }

    pub fn disk(&self, name: &str) -> Option<&Disk> {
        self.disks.get(name)
    }

    pub fn firmware(&self) -> Firmware {
        self.firmware
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Create a region in the free space at `path`, whatever kind the
    /// disk's scheme puts there. `fs = None` uses the suggested default.
    pub fn create(
        &mut self,
        path: &RegionPath,
        size_mb: u64,
        fs: Option<FsKind>,
        mount_point: &str,
    ) -> Result<&DiskMap> {
        self.create_kind(path, size_mb, fs, mount_point, None)
    }

    pub fn create_partition(
        &mut self,
        path: &RegionPath,
        size_mb: u64,
        fs: Option<FsKind>,
        mount_point: &str,
    ) -> Result<&DiskMap> {
        self.create_kind(path, size_mb, fs, mount_point, Some(CreateKind::Partition))
    }

    pub fn create_slice(&mut self, path: &RegionPath, size_mb: u64) -> Result<&DiskMap> {
        self.create_kind(
            path,
            size_mb,
            Some(FsKind::Bsd),
            "",
            Some(CreateKind::Slice),
        )
    }

    pub fn create_label(
        &mut self,
        path: &RegionPath,
        size_mb: u64,
        fs: Option<FsKind>,
        mount_point: &str,
    ) -> Result<&DiskMap> {
        self.create_kind(path, size_mb, fs, mount_point, Some(CreateKind::Label))
    }

    fn create_kind(
        &mut self,
        path: &RegionPath,
        size_mb: u64,
        fs: Option<FsKind>,
        mount_point: &str,
        expected: Option<CreateKind>,
    ) -> Result<&DiskMap> {
        self.mutate(&path.disk, |disk, ctx| {
            engine::create::create(disk, path, size_mb, fs, mount_point, expected, ctx)
        })
    }

    pub fn delete(&mut self, path: &RegionPath) -> Result<&DiskMap> {
        self.mutate(&path.disk, |disk, _| engine::delete::delete(disk, path))
    }

    pub fn set_scheme(
        &mut self,
        disk: &str,
        scheme: Scheme,
        change: SchemeChange,
    ) -> Result<&DiskMap> {
        self.mutate(disk, |disk, _| {
            engine::scheme::set_scheme(disk, scheme, change)
        })
    }

    /// Canonical layout of `size_mb` of the free region at `path`.
    ///
    /// `efi_exists = None` looks for an EFI partition on the disk itself.
    pub fn auto_layout(
        &mut self,
        path: &RegionPath,
        size_mb: u64,
        fs: FsKind,
        efi_exists: Option<bool>,
    ) -> Result<&DiskMap> {
        self.mutate(&path.disk, |disk, ctx| {
            engine::auto::auto_layout(disk, path, size_mb, fs, efi_exists, ctx)
        })
    }

    /// Drop every pending operation and go back to a fresh scan.
    ///
    /// When the rescan fails the tree falls back to the last snapshot and
    /// the ledger is still emptied, then the inventory error is returned.
    pub fn revert(&mut self) -> Result<&DiskMap> {
        self.ledger.ensure_writable()?;
        let rescan = self.scan_devices();
        self.ledger.reset();
        match rescan {
            Ok(disks) => {
                self.snapshot = disks.clone();
                self.disks = disks;
                info!("plan reverted");
                Ok(&self.disks)
            }
            Err(error) => {
                warn!("rescan failed, restoring the last scan: {error}");
                self.disks = self.snapshot.clone();
                Err(error)
            }
        }
    }

    pub fn get_pending_plan(&self) -> PendingPlan {
        self.ledger.plan(&self.disks)
    }

    /// File system a create at `path` would default to
    pub fn suggest_fs(&self, path: &RegionPath) -> Result<FsKind> {
        let disk = self.lookup(&path.disk)?;
        let slot = engine::locate(disk, path)?;
        Ok(policy::suggest_fs(disk, slot.slice, slot.index, self.firmware))
    }

    /// Current path of the region with `id`
    pub fn path_of(&self, id: RegionId) -> Option<RegionPath> {
        self.disks.values().find_map(|disk| {
            disk.regions.iter().find_map(|region| {
                let top = RegionPath::new(&disk.name).join(region.name());
                if region.id() == Some(id) {
                    return Some(top);
                }
                region
                    .children()
                    .iter()
                    .find(|child| child.id() == Some(id))
                    .map(|child| top.clone().join(child.name()))
            })
        })
    }

    pub fn validate(&self, disk: &str) -> Result<ValidationReport> {
        Ok(validate_disk(self.lookup(disk)?, self.firmware))
    }

    /// Largest top-level free region of `disk`
    pub fn largest_free_region(&self, disk: &str) -> Result<Option<RegionPath>> {
        let disk = self.lookup(disk)?;
        Ok(disk
            .regions
            .iter()
            .filter(|r| r.is_freespace())
            .max_by_key(|r| r.size_mb())
            .map(|r| RegionPath::new(&disk.name).join(r.name())))
    }

    /// Make the plan read-only while it is applied
    pub fn freeze(&mut self) {
        debug!("ledger frozen");
        self.ledger.freeze();
    }

    pub fn thaw(&mut self) {
        debug!("ledger thawed");
        self.ledger.thaw();
    }

    fn lookup(&self, disk: &str) -> Result<&Disk> {
        self.disks
            .get(disk)
            .ok_or_else(|| PlanError::invalid(disk, "no such disk"))
    }

    fn mutate<F>(&mut self, disk: &str, op: F) -> Result<&DiskMap>
    where
        F: FnOnce(&Disk, Context<'_>) -> Result<Mutation>,
    {
        self.ledger.ensure_writable()?;
        let current = self.lookup(disk)?;
        let ctx = Context {
            firmware: self.firmware,
            config: &self.config,
        };
        let Mutation { disk: updated, effects } = op(current, ctx)?;

        debug!(
            "{}: committing {} ledger effects",
            updated.name,
            effects.len()
        );
        self.ledger.apply(effects);
        self.disks.insert(updated.name.clone(), updated);
        Ok(&self.disks)
    }
}

/// Whether every sibling list of `disk` fills its parent exactly.
///
/// Foreign slices carry no labels and are only checked at the top level.
pub fn disk_is_consistent(disk: &Disk) -> bool {
    siblings_fit(&disk.regions, disk.size_mb)
        && disk.regions.iter().all(|region| match region {
            Region::Slice(slice) if slice.is_bsd() => siblings_fit(&slice.labels, slice.size_mb),
            Region::Slice(slice) => slice.labels.is_empty(),
            _ => true,
        })
}
