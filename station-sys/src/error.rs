// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Failures of the platform layer
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A real apply was attempted without root privileges
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no such device or inventory: {0}")]
    DeviceNotFound(String),

    /// A query tool is missing or produced something unusable
    #[error("{0}")]
    OperationFailed(String),

    /// A partitioning command exited unsuccessfully
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("invalid inventory '{source_name}': {reason}")]
    InvalidInventory { source_name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SysError>;
