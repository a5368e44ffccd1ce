//! TOML-described inventory for dry runs and tests

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use station_types::Firmware;

use super::{DeviceInventory, DiskReport, EntryReport};
use crate::{Result, SysError};

/// Inventory read from a TOML document instead of the running system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureInventory {
    pub firmware: Firmware,
    #[serde(default)]
    pub disks: Vec<DiskReport>,
}

impl FixtureInventory {
    pub fn from_toml_str(source_name: &str, raw: &str) -> Result<Self> {
        let inventory: Self = toml::from_str(raw).map_err(|error| SysError::InvalidInventory {
            source_name: source_name.to_string(),
            reason: error.to_string(),
        })?;
        inventory.validate(source_name)?;
        Ok(inventory)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source_name = path.display().to_string();
        if !path.exists() {
            return Err(SysError::DeviceNotFound(source_name));
        }

        let raw = fs::read_to_string(path).map_err(|error| SysError::InvalidInventory {
            source_name: source_name.clone(),
            reason: error.to_string(),
        })?;
        Self::from_toml_str(&source_name, &raw)
    }

    fn validate(&self, source_name: &str) -> Result<()> {
        let invalid = |reason: String| SysError::InvalidInventory {
            source_name: source_name.to_string(),
            reason,
        };

        for (i, disk) in self.disks.iter().enumerate() {
            if disk.name.is_empty() {
                return Err(invalid(format!("disk #{i} has no name")));
            }
            if disk.size_mb == 0 {
                return Err(invalid(format!("disk {} has zero size", disk.name)));
            }
            if self.disks[..i].iter().any(|d| d.name == disk.name) {
                return Err(invalid(format!("disk {} listed twice", disk.name)));
            }
            let unnamed = |e: &&EntryReport| !e.is_free() && e.name.is_empty();
            if let Some(entry) = disk.entries.iter().find(unnamed) {
                return Err(invalid(format!(
                    "disk {} has an unnamed {} entry",
                    disk.name, entry.kind
                )));
            }
        }

        Ok(())
    }
}

impl DeviceInventory for FixtureInventory {
    fn scan(&self) -> Result<Vec<DiskReport>> {
        Ok(self.disks.clone())
    }

    fn firmware(&self) -> Result<Firmware> {
        Ok(self.firmware)
    }
}
