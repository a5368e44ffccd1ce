//! Installability checks on a planned disk

use std::fmt;

use serde::Serialize;
use station_types::{Disk, Firmware, FsKind, Region, Scheme};

/// Something that keeps a disk's plan from being installable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Finding {
    NoScheme,
    MissingRoot,
    MissingEfi,
    MissingBootStub,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoScheme => f.write_str("disk has no partition scheme"),
            Self::MissingRoot => f.write_str("no new ZFS or UFS / region to install onto"),
            Self::MissingEfi => f.write_str("UEFI boot needs an EFI system partition"),
            Self::MissingBootStub => f.write_str("BIOS boot from GPT needs a BOOT partition"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub disk: String,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn is_installable(&self) -> bool {
        self.findings.is_empty()
    }
}

pub fn validate_disk(disk: &Disk, firmware: Firmware) -> ValidationReport {
    let mut findings = Vec::new();

    let Some(scheme) = disk.scheme else {
        return ValidationReport {
            disk: disk.name.clone(),
            findings: vec![Finding::NoScheme],
        };
    };

    let is_root = |r: &Region| {
        r.is_new() && (r.fs() == FsKind::Zfs || (r.fs() == FsKind::Ufs && r.mount_point() == "/"))
    };
    if !disk.walk().any(is_root) {
        findings.push(Finding::MissingRoot);
    }

    if scheme == Scheme::Gpt {
        match firmware {
            Firmware::Uefi if !disk.walk().any(|r| r.fs() == FsKind::Uefi) => {
                findings.push(Finding::MissingEfi);
            }
            Firmware::Bios if !disk.walk().any(|r| r.fs() == FsKind::Boot) => {
                findings.push(Finding::MissingBootStub);
            }
            _ => {}
        }
    }

    ValidationReport {
        disk: disk.name.clone(),
        findings,
    }
}
