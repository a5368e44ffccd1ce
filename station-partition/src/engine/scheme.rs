//! Initialising or replacing a disk's partition table

use station_types::{Disk, FREESPACE_PREFIX, Freespace, Region, Scheme};
use tracing::warn;

use super::Mutation;
use crate::error::{PlanError, Result};
use crate::ledger::Effect;

/// How a scheme change treats an existing table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeChange {
    /// Only allowed on a disk without a recognised table
    Initialize,
    /// Wipe the current table; the caller has confirmed data loss
    DestroyExisting,
}

pub(crate) fn set_scheme(disk: &Disk, scheme: Scheme, change: SchemeChange) -> Result<Mutation> {
    if let Some(current) = disk.scheme {
        if change == SchemeChange::Initialize {
            return Err(PlanError::conflict(
                &disk.name,
                format!("disk already uses {current}; replacing it must be confirmed"),
            ));
        }
        warn!(
            "{}: destroying the {current} table, {} regions dropped",
            disk.name,
            disk.regions.len()
        );
    }

    let mut updated = disk.clone();
    updated.scheme = Some(scheme);
    updated.regions = vec![Region::Freespace(Freespace::new(
        format!("{FREESPACE_PREFIX}1"),
        disk.size_mb,
    ))];

    Ok(Mutation {
        disk: updated,
        effects: vec![Effect::Destroy {
            disk: disk.name.clone(),
            scheme,
        }],
    })
}
