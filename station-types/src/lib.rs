// SPDX-License-Identifier: GPL-3.0-only

//! Partition tree model for the Install Station planner
//!
//! This crate defines the in-memory database the planner mutates:
//!
//! - **station-sys**: reports raw device data and renders these types into
//!   partitioning commands
//! - **station-partition**: owns a [`DiskMap`] and mutates it through the
//!   layout engine
//! - **station-cli**: prints snapshots and pending plans
//!
//! ## Hierarchy
//!
//! - [`Disk`] → ordered top-level [`Region`]s
//! - GPT disks hold [`Region::Partition`] and [`Region::Freespace`]
//! - MBR disks hold [`Region::Slice`] and [`Region::Freespace`]; each slice
//!   holds [`Region::Label`] and [`Region::Freespace`]
//!
//! Sizes are whole megabytes. Every ordered child list sums to its parent's
//! size; [`tree`] holds the helpers that keep it that way.

pub mod common;
pub mod disk;
pub mod naming;
pub mod path;
pub mod plan;
pub mod region;
pub mod tree;

pub use common::{ZFS_DATASETS, mb_to_pretty};
pub use disk::{BootManager, Disk, DiskMap, Firmware, Scheme};
pub use naming::{
    FREESPACE_PREFIX, MAX_PRIMARY_SLICES, index_in_parent, label_letters, next_free_name,
    next_label_name, partition_prefix, slice_prefix,
};
pub use path::RegionPath;
pub use plan::{PendingCreate, PendingDelete, PendingDestroy, PendingPlan, SummaryLine};
pub use region::{Extent, Freespace, FsKind, Region, RegionId, RegionStatus, Slice, Volume};
pub use tree::{merge_adjacent_freespace, siblings_fit};
