//! ZFS pool disk selection
//!
//! Whole-disk ZFS installs build one pool from the selected disks. Every
//! disk gets a partition sized from the first selected disk, so the first
//! pick has to be the smallest one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use station_types::Firmware;

use crate::error::{PlanError, Result};

/// Space left off the end of each pool disk
const POOL_DISK_SLACK_MB: u64 = 512;
/// Extra space kept for the EFI boot partition on UEFI machines
const POOL_UEFI_BOOT_MB: u64 = 100;
/// Extra space kept for the boot stub on BIOS machines
const POOL_BIOS_BOOT_MB: u64 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    #[default]
    Stripe,
    Mirror,
    Raidz1,
    Raidz2,
    Raidz3,
}

impl PoolType {
    /// Whether `count` disks form a valid pool of this type
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Self::Stripe => count >= 1,
            Self::Mirror => count >= 2,
            Self::Raidz1 => count == 3,
            Self::Raidz2 => count == 4,
            Self::Raidz3 => count == 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Mirror => "mirror",
            Self::Raidz1 => "raidz1",
            Self::Raidz2 => "raidz2",
            Self::Raidz3 => "raidz3",
        }
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "mirror" => Ok(Self::Mirror),
            "raidz1" => Ok(Self::Raidz1),
            "raidz2" => Ok(Self::Raidz2),
            "raidz3" => Ok(Self::Raidz3),
            _ => Err(format!("unknown pool type: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolDisk {
    pub name: String,
    pub size_mb: u64,
}

/// Disks picked for a pool, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolSelection {
    pub pool_type: PoolType,
    disks: Vec<PoolDisk>,
}

impl PoolSelection {
    pub fn new(pool_type: PoolType) -> Self {
        Self {
            pool_type,
            disks: Vec::new(),
        }
    }

    pub fn disks(&self) -> &[PoolDisk] {
        &self.disks
    }

    /// Add a disk; it may not be smaller than the first selected disk
    pub fn select(&mut self, name: &str, size_mb: u64) -> Result<()> {
        if self.disks.iter().any(|d| d.name == name) {
            return Err(PlanError::invalid(name, "disk already selected"));
        }
        if let Some(first) = self.disks.first()
            && size_mb < first.size_mb
        {
            return Err(PlanError::invalid(
                name,
                format!(
                    "{size_mb} MB is smaller than {} ({} MB); select the smallest disk first",
                    first.name, first.size_mb
                ),
            ));
        }
        self.disks.push(PoolDisk {
            name: name.to_string(),
            size_mb,
        });
        Ok(())
    }

    pub fn deselect(&mut self, name: &str) {
        self.disks.retain(|d| d.name != name);
    }

    pub fn is_complete(&self) -> bool {
        self.pool_type.accepts(self.disks.len())
    }

    /// Size of the ZFS partition created on every pool disk
    pub fn partition_size_mb(&self, firmware: Firmware) -> Option<u64> {
        let boot = match firmware {
            Firmware::Uefi => POOL_UEFI_BOOT_MB,
            Firmware::Bios => POOL_BIOS_BOOT_MB,
        };
        self.disks
            .first()?
            .size_mb
            .checked_sub(POOL_DISK_SLACK_MB + boot)
            .filter(|mb| *mb > 0)
    }

    /// Pool suffix naming the disks besides the first, e.g. `mirror: ada1`.
    ///
    /// The first disk carries the ZFS partition itself, so a one-disk pool
    /// has no suffix.
    pub fn vdev(&self) -> Option<String> {
        let companions: Vec<&str> = self.disks.iter().skip(1).map(|d| d.name.as_str()).collect();
        if companions.is_empty() {
            return None;
        }
        Some(format!("{}: {}", self.pool_type, companions.join(" ")))
    }
}
