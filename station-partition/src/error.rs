// SPDX-License-Identifier: GPL-3.0-only

use std::fmt::Display;

use station_sys::SysError;
use thiserror::Error;

/// Every way a planning operation can be refused.
///
/// None of these are fatal: the tree and ledger are untouched when an
/// operation fails, so the caller can re-prompt and try again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid operation on {target}: {reason}")]
    InvalidOperation { target: String, reason: String },

    #[error("scheme conflict on {disk}: {reason}")]
    SchemeConflict { disk: String, reason: String },

    #[error("the pending plan is frozen while it is applied")]
    LedgerFrozen,

    #[error("inventory error: {reason}")]
    InventoryError { reason: String },
}

impl PlanError {
    pub(crate) fn invalid(target: impl Display, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(disk: impl Display, reason: impl Into<String>) -> Self {
        Self::SchemeConflict {
            disk: disk.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn inventory(reason: impl Into<String>) -> Self {
        Self::InventoryError {
            reason: reason.into(),
        }
    }
}

impl From<SysError> for PlanError {
    fn from(error: SysError) -> Self {
        Self::inventory(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
