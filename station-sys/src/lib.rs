// SPDX-License-Identifier: GPL-3.0-only

//! Platform layer of the Install Station planner
//!
//! This crate is the only place that talks to the operating system:
//! - Device inventory (`sysctl kern.disks`, `diskinfo`, `gpart show`)
//! - Firmware boot mode detection
//! - Rendering and running the `gpart` command sequence of a pending plan
//!
//! Running a plan for real requires root; dry runs only render.

pub mod apply;
pub mod cmd;
pub mod error;
pub mod firmware;
pub mod inventory;

pub use apply::{Applier, PlannedCommand, render_plan};
pub use cmd::{CommandOutcome, is_root};
pub use error::{Result, SysError};
pub use firmware::detect_firmware;
pub use inventory::{DeviceInventory, DiskReport, EntryReport, FixtureInventory, FreeBsdInventory};
