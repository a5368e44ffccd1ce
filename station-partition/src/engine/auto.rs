//! Canonical automatic layout of a free region
//!
//! GPT gets `[EFI or boot stub] root swap`, MBR gets one BSD slice holding a
//! root and a swap label. A small reserve is left free at the end.

use station_types::{
    Disk, Extent, Firmware, Freespace, FsKind, MAX_PRIMARY_SLICES, Region, RegionPath,
    RegionStatus, Scheme, Slice, Volume, next_free_name, partition_prefix, slice_prefix,
};
use tracing::info;

use super::create::mount_point_for;
use super::{Context, Mutation, check_size, create_effect, free_target, locate};
use crate::error::{PlanError, Result};
use crate::policy;

/// Lay out `size_mb` of the top-level free region at `path`.
///
/// `efi_exists` overrides the scan of the disk for an EFI partition.
pub(crate) fn auto_layout(
    disk: &Disk,
    path: &RegionPath,
    size_mb: u64,
    fs: FsKind,
    efi_exists: Option<bool>,
    ctx: Context<'_>,
) -> Result<Mutation> {
    let scheme = disk.scheme.ok_or_else(|| {
        PlanError::conflict(&disk.name, "disk has no partition scheme; set one first")
    })?;
    let slot = locate(disk, path)?;
    if slot.slice.is_some() {
        return Err(PlanError::invalid(path, "automatic layout needs a top-level free region"));
    }
    let target = free_target(disk, slot, path)?;
    check_size(path, size_mb, target.size_mb())?;
    if !matches!(fs, FsKind::Zfs | FsKind::Ufs) {
        return Err(PlanError::invalid(path, format!("{fs} cannot hold the root file system")));
    }

    let root_mount = if fs == FsKind::Ufs { "/" } else { "" };
    let root_mount = mount_point_for(disk, fs, root_mount, ctx, path)?;
    let config = ctx.config;

    let created = match scheme {
        Scheme::Gpt => {
            let has_efi = efi_exists.unwrap_or_else(|| policy::efi_exists(disk));
            let boot = match ctx.firmware {
                Firmware::Uefi if has_efi => None,
                Firmware::Uefi => Some((FsKind::Uefi, config.efi_mb)),
                Firmware::Bios => Some((FsKind::Boot, config.bios_boot_mb)),
            };
            let boot_mb = boot.map_or(0, |(_, mb)| mb);
            let root_mb = remaining(
                path,
                size_mb,
                &[boot_mb, config.swap_mb, config.reserve_mb],
            )?;

            let mut names: Vec<String> =
                disk.regions.iter().map(|r| r.name().to_string()).collect();
            let prefix = partition_prefix(&disk.name);
            let mut next = |fs: FsKind, size_mb: u64, mount: String| {
                let name = next_free_name(names.iter().map(String::as_str), &prefix);
                names.push(name.clone());
                Region::Partition(Volume::new(name, size_mb, fs, mount, RegionStatus::New))
            };

            let mut created = Vec::with_capacity(3);
            if let Some((kind, mb)) = boot {
                created.push(next(kind, mb, String::new()));
            }
            created.push(next(fs, root_mb, root_mount));
            created.push(next(FsKind::Swap, config.swap_mb, String::new()));
            created
        }
        Scheme::Mbr => {
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
            let slice_mb = remaining(path, size_mb, &[config.reserve_mb])?;
            let root_mb = remaining(path, slice_mb, &[config.swap_mb])?;

            let name = next_free_name(
                disk.regions.iter().map(Extent::name),
                &slice_prefix(&disk.name),
            );
            let labels = vec![
                Region::Label(Volume::new(
                    format!("{name}a"),
                    root_mb,
                    fs,
                    root_mount,
                    RegionStatus::New,
                )),
                Region::Label(Volume::new(
                    format!("{name}b"),
                    config.swap_mb,
                    FsKind::Swap,
                    "",
                    RegionStatus::New,
                )),
            ];
            vec![Region::Slice(Slice::new(
                name,
                slice_mb,
                FsKind::Bsd,
                RegionStatus::New,
                labels,
            ))]
        }
    };

    let mut effects = Vec::new();
    for region in &created {
        effects.push(create_effect(region, &disk.name)?);
        for label in region.children() {
            effects.push(create_effect(label, region.name())?);
        }
    }

    let used: u64 = created.iter().map(Extent::size_mb).sum();
    let leftover = target.size_mb() - used;
    info!(
        "{path}: automatic {scheme} layout, {} regions, {leftover} MB left free",
        effects.len()
    );

    let mut regions = disk.regions.clone();
    let tail = regions.split_off(slot.index + 1);
    let target_name = regions
        .pop()
        .map(|r| r.name().to_string())
        .unwrap_or_default();
    regions.extend(created);
    if leftover > 0 {
        regions.push(Region::Freespace(Freespace::new(target_name, leftover)));
    }
    regions.extend(tail);

    let mut updated = disk.clone();
    updated.regions = regions;
    Ok(Mutation {
        disk: updated,
        effects,
    })
}

/// `size_mb` minus `reserved`, which must leave at least 1 MB
fn remaining(path: &RegionPath, size_mb: u64, reserved: &[u64]) -> Result<u64> {
    let reserved: u64 = reserved.iter().sum();
    match size_mb.checked_sub(reserved) {
        Some(left) if left > 0 => Ok(left),
        _ => Err(PlanError::invalid(
            path,
            format!("{size_mb} MB is too small for an automatic layout needing {reserved} MB"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::ledger::Effect;
    use station_types::{ZFS_DATASETS, siblings_fit};

    fn blank(scheme: Scheme, size_mb: u64) -> Disk {
        Disk {
            name: "ada0".to_string(),
            size_mb,
            model: String::new(),
            scheme: Some(scheme),
            regions: vec![Region::Freespace(Freespace::new("freespace1", size_mb))],
        }
    }

    fn path() -> RegionPath {
        RegionPath::new("ada0").join("freespace1")
    }

    fn ctx(firmware: Firmware, config: &PlannerConfig) -> Context<'_> {
        Context {
            firmware,
            config,
        }
    }

    fn created(effects: &[Effect]) -> Vec<(String, u64, FsKind)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Create(c) => Some((c.name.clone(), c.size_mb, c.fs)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn gpt_uefi_without_efi() {
        let config = PlannerConfig::default();
        let disk = blank(Scheme::Gpt, 10000);
        let ctx = ctx(Firmware::Uefi, &config);
        let m = auto_layout(&disk, &path(), 10000, FsKind::Zfs, Some(false), ctx).unwrap();

        assert_eq!(
            created(&m.effects),
            [
                ("ada0p1".to_string(), 256, FsKind::Uefi),
                ("ada0p2".to_string(), 7695, FsKind::Zfs),
                ("ada0p3".to_string(), 2048, FsKind::Swap),
            ]
        );
        assert_eq!(m.disk.regions[1].mount_point(), ZFS_DATASETS);
        let last = m.disk.regions.last().map(|r| (r.name(), r.size_mb()));
        assert_eq!(last, Some(("freespace1", 1)));
        assert!(siblings_fit(&m.disk.regions, 10000));
    }

    #[test]
    fn gpt_uefi_with_existing_efi_skips_boot_region() {
        let config = PlannerConfig::default();
        let disk = blank(Scheme::Gpt, 10000);
        let ctx = ctx(Firmware::Uefi, &config);
        let m = auto_layout(&disk, &path(), 10000, FsKind::Ufs, Some(true), ctx).unwrap();
        assert_eq!(
            created(&m.effects),
            [
                ("ada0p1".to_string(), 7951, FsKind::Ufs),
                ("ada0p2".to_string(), 2048, FsKind::Swap),
            ]
        );
        assert_eq!(m.disk.regions[0].mount_point(), "/");
    }

    #[test]
    fn gpt_bios_gets_boot_stub() {
        let config = PlannerConfig::default();
        let disk = blank(Scheme::Gpt, 10000);
        let ctx = ctx(Firmware::Bios, &config);
        let m = auto_layout(&disk, &path(), 10000, FsKind::Zfs, None, ctx).unwrap();
        let kinds: Vec<FsKind> = created(&m.effects).into_iter().map(|c| c.2).collect();
        assert_eq!(kinds, [FsKind::Boot, FsKind::Zfs, FsKind::Swap]);
        assert_eq!(created(&m.effects)[1].1, 10000 - 1 - 1 - 2048);
    }

    #[test]
    fn mbr_builds_slice_with_root_and_swap() {
        let config = PlannerConfig::default();
        let disk = blank(Scheme::Mbr, 10000);
        let ctx = ctx(Firmware::Bios, &config);
        let m = auto_layout(&disk, &path(), 10000, FsKind::Ufs, None, ctx).unwrap();

        assert_eq!(
            created(&m.effects),
            [
                ("ada0s1".to_string(), 9999, FsKind::Bsd),
                ("ada0s1a".to_string(), 7951, FsKind::Ufs),
                ("ada0s1b".to_string(), 2048, FsKind::Swap),
            ]
        );
        let labels = m.disk.regions[0].children();
        assert!(siblings_fit(labels, 9999));
        assert!(siblings_fit(&m.disk.regions, 10000));
    }

    #[test]
    fn partial_size_keeps_the_rest_free() {
        let config = PlannerConfig::default();
        let disk = blank(Scheme::Gpt, 10000);
        let ctx = ctx(Firmware::Uefi, &config);
        let m = auto_layout(&disk, &path(), 6000, FsKind::Zfs, Some(true), ctx).unwrap();
        assert_eq!(m.disk.regions.last().map(Extent::size_mb), Some(4001));
        assert!(siblings_fit(&m.disk.regions, 10000));
    }

    #[test]
    fn too_small_or_wrong_fs_is_rejected() {
        let config = PlannerConfig::default();
        let ctx = ctx(Firmware::Uefi, &config);
        let disk = blank(Scheme::Gpt, 2000);
        let err = auto_layout(&disk, &path(), 2000, FsKind::Zfs, Some(false), ctx);
        assert!(matches!(err, Err(PlanError::InvalidOperation { .. })));

        let err = auto_layout(&disk, &path(), 2000, FsKind::Swap, Some(true), ctx);
        assert!(matches!(err, Err(PlanError::InvalidOperation { .. })));
    }
}
