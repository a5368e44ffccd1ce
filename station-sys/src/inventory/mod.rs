// SPDX-License-Identifier: GPL-3.0-only

//! Device inventory
//!
//! An inventory reports what the platform sees, without interpretation:
//! device names, sizes, the raw scheme string and the entries `gpart`
//! lists in physical order. Turning reports into a partition tree is the
//! planner's job.

mod fixture;
mod geom;

pub use fixture::FixtureInventory;
pub use geom::{DiskInfo, FreeBsdInventory, parse_diskinfo, parse_gpart_show, parse_kern_disks};

use serde::{Deserialize, Serialize};
use station_types::Firmware;

use crate::Result;

/// Raw report of one disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskReport {
    pub name: String,
    pub size_mb: u64,
    #[serde(default)]
    pub model: String,
    /// Scheme as reported (`GPT`, `MBR`, anything else or empty for none)
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub entries: Vec<EntryReport>,
}

/// Raw report of one table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReport {
    /// Device name; empty for free space
    #[serde(default)]
    pub name: String,
    pub size_mb: u64,
    /// `gpart` type (`freebsd-zfs`, `efi`, `free`, ...)
    pub kind: String,
    #[serde(default)]
    pub mount_point: String,
    /// BSD labels of an MBR slice
    #[serde(default)]
    pub labels: Vec<EntryReport>,
}

impl EntryReport {
    pub fn is_free(&self) -> bool {
        self.kind == "free"
    }
}

/// Source of disk reports and the firmware boot mode
pub trait DeviceInventory {
    fn scan(&self) -> Result<Vec<DiskReport>>;

    fn firmware(&self) -> Result<Firmware>;
}
