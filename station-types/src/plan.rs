//! Pending plan value types
//!
//! These are the read-only view of the ledger handed to the apply layer.
//! Entries carry enough addressing (parent name and index) to issue
//! index-based partitioning commands without walking the tree again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::disk::Scheme;
use crate::region::{FsKind, RegionId};

/// A disk whose table is wiped and recreated with `scheme`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDestroy {
    pub disk: String,
    pub scheme: Scheme,
}

/// An existing region to remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDelete {
    pub id: RegionId,
    pub name: String,
    /// Disk or slice the region lives in
    pub parent: String,
    pub index: u32,
}

/// A region to create, in physical order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCreate {
    pub id: RegionId,
    pub name: String,
    pub parent: String,
    pub index: u32,
    pub size_mb: u64,
    pub fs: FsKind,
}

/// One `fs size mountPoint` line of the new-partition summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    pub fs: FsKind,
    pub size_mb: u64,
    pub mount_point: String,
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mount = if self.mount_point.is_empty() {
            "none"
        } else {
            &self.mount_point
        };
        write!(f, "{} {} {}", self.fs, self.size_mb, mount)
    }
}

/// Snapshot of everything the apply phase has to do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPlan {
    pub destroy: Vec<PendingDestroy>,
    pub delete: Vec<PendingDelete>,
    pub create: Vec<PendingCreate>,
    /// Scanned slices that need a BSD label table before their first label
    #[serde(default)]
    pub label_tables: Vec<String>,
    pub summary: Vec<SummaryLine>,
}

impl PendingPlan {
    pub fn is_empty(&self) -> bool {
        self.destroy.is_empty() && self.delete.is_empty() && self.create.is_empty()
    }

    /// Whether applying this plan loses existing data
    pub fn is_destructive(&self) -> bool {
        !self.destroy.is_empty() || !self.delete.is_empty()
    }
}
