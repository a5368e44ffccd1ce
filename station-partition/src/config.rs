//! Planner configuration
//!
//! Every field has a default, so an empty or partial TOML file is valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use station_types::{BootManager, Firmware, ZFS_DATASETS};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("invalid config {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Swap region created by the automatic layout
    pub swap_mb: u64,
    /// EFI system partition created on UEFI machines without one
    pub efi_mb: u64,
    /// BIOS boot stub created on GPT disks
    pub bios_boot_mb: u64,
    /// Space left free at the end of an automatic layout
    pub reserve_mb: u64,
    /// Dataset layout recorded as the mount point of ZFS regions
    pub zfs_datasets: String,
    /// Overrides the detected firmware boot mode
    pub firmware: Option<Firmware>,
    pub boot_manager: BootManager,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            swap_mb: 2048,
            efi_mb: 256,
            bios_boot_mb: 1,
            reserve_mb: 1,
            zfs_datasets: ZFS_DATASETS.to_string(),
            firmware: None,
            boot_manager: BootManager::None,
        }
    }
}

impl PlannerConfig {
    pub fn from_toml_str(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })
    }

    /// Load `path`, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        Self::from_toml_str(path, &raw)
    }
}
