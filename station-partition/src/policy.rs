//! Default file-system policy for new regions

use station_types::{Disk, Firmware, FsKind, Region, Scheme};

/// Whether any region of `disk` is an EFI system partition
pub fn efi_exists(disk: &Disk) -> bool {
    disk.walk().any(|r| r.fs().is_efi())
}

/// File system to pre-select for the free region at `index`, either at the
/// top level of `disk` or inside the slice at top-level index `slice`.
///
/// GPT on UEFI starts with an EFI partition unless the disk has one; GPT on
/// BIOS starts with a boot stub until something new exists on the disk.
/// After that, a region following `/` or ZFS defaults to swap and anything
/// else to ZFS. Top-level MBR regions are always BSD slices.
pub fn suggest_fs(disk: &Disk, slice: Option<usize>, index: usize, firmware: Firmware) -> FsKind {
    let siblings = match slice {
        None => disk.regions.as_slice(),
        Some(i) => disk.regions.get(i).map_or(&[][..], Region::children),
    };

    match (disk.scheme, firmware) {
        (Some(Scheme::Mbr), _) if slice.is_none() => FsKind::Bsd,
        (Some(Scheme::Gpt), Firmware::Uefi) if !efi_exists(disk) => FsKind::Uefi,
        (Some(Scheme::Gpt), Firmware::Bios) if !disk.walk().any(Region::is_new) => FsKind::Boot,
        _ => after_predecessor(siblings, index),
    }
}

fn after_predecessor(siblings: &[Region], index: usize) -> FsKind {
    let previous = index.checked_sub(1).and_then(|i| siblings.get(i));
    match previous {
        Some(region) if region.mount_point() == "/" || region.fs() == FsKind::Zfs => FsKind::Swap,
        _ => FsKind::Zfs,
    }
}
