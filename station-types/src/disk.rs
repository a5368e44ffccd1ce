//! Disk model
//!
//! A [`Disk`] is the root of one partition tree. Its regions are ordered by
//! physical position and always sum to the disk size.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::region::{Extent, Region};

/// Partition table scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// GUID Partition Table
    #[serde(rename = "GPT")]
    Gpt,

    /// Master Boot Record with BSD slices
    #[serde(rename = "MBR")]
    Mbr,
}

impl Scheme {
    /// Name used by `gpart create -s`
    pub fn as_gpart_str(&self) -> &'static str {
        match self {
            Self::Gpt => "GPT",
            Self::Mbr => "MBR",
        }
    }

    /// Parse a detected scheme; anything but GPT or MBR is no scheme at all
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GPT" => Some(Self::Gpt),
            "MBR" | "DOS" => Some(Self::Mbr),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_gpart_str())
    }
}

/// Firmware boot mode of the machine being installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Firmware {
    #[serde(rename = "UEFI")]
    Uefi,
    #[serde(rename = "BIOS")]
    Bios,
}

impl Firmware {
    /// Parse `machdep.bootmethod` output
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UEFI" | "EFI" => Some(Self::Uefi),
            "BIOS" => Some(Self::Bios),
            _ => None,
        }
    }
}

impl fmt::Display for Firmware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uefi => f.write_str("UEFI"),
            Self::Bios => f.write_str("BIOS"),
        }
    }
}

/// Boot manager the installer will set up; decides the BIOS boot stub type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootManager {
    #[default]
    None,
    Grub,
    Refind,
}

/// Physical disk and its partition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    /// Device name (e.g., "ada0", "nvd0")
    pub name: String,

    /// Total size in megabytes
    pub size_mb: u64,

    /// Model description reported by the device
    pub model: String,

    /// Partition scheme, `None` when the disk carries no usable table
    pub scheme: Option<Scheme>,

    /// Top-level regions in physical order
    pub regions: Vec<Region>,
}

impl Disk {
    /// Find a top-level region by name
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name() == name)
    }

    /// Number of regions that are not freespace
    pub fn partition_count(&self) -> usize {
        self.regions.iter().filter(|r| !r.is_freespace()).count()
    }

    /// Whether the disk holds nothing but free space
    pub fn is_blank(&self) -> bool {
        self.partition_count() == 0
    }

    /// Walk every region, top level first then its children
    pub fn walk(&self) -> impl Iterator<Item = &Region> {
        self.regions
            .iter()
            .flat_map(|r| std::iter::once(r).chain(r.children().iter()))
    }

    /// Get a human-readable display name for the disk
    pub fn display_name(&self) -> String {
        if self.model.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.model)
        }
    }
}

impl Extent for Disk {
    fn name(&self) -> &str {
        &self.name
    }

    fn size_mb(&self) -> u64 {
        self.size_mb
    }
}

/// Every disk of the machine keyed by device name
pub type DiskMap = BTreeMap<String, Disk>;
