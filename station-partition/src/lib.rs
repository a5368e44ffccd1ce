// SPDX-License-Identifier: GPL-3.0-only

//! Partition planning for Install Station
//!
//! A [`Session`] scans the machine's disks through a
//! [`DeviceInventory`](station_sys::DeviceInventory), lets the installer
//! reshape them in memory and records what has to happen on disk in a
//! [`Ledger`]. Nothing here touches a device; applying a
//! [`PendingPlan`](station_types::PendingPlan) is `station-sys`'s job.

pub mod config;
mod engine;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod policy;
pub mod pool;
pub mod session;
pub mod validate;

pub use config::{ConfigError, PlannerConfig};
pub use engine::{CreateKind, SchemeChange};
pub use error::{PlanError, Result};
pub use ledger::{Ledger, summary_lines};
pub use pool::{PoolSelection, PoolType};
pub use session::{Session, disk_is_consistent};
pub use validate::{Finding, ValidationReport, validate_disk};
