//! Addresses of regions inside a [`DiskMap`](crate::DiskMap)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Disk name followed by up to two region names.
///
/// `ada0` addresses the disk, `ada0/ada0p2` a top-level region and
/// `ada0/ada0s1/ada0s1a` a label inside a slice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionPath {
    pub disk: String,
    pub segments: Vec<String>,
}

impl RegionPath {
    pub fn new(disk: impl Into<String>) -> Self {
        Self {
            disk: disk.into(),
            segments: Vec::new(),
        }
    }

    pub fn join(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Split a `/`-separated path; empty segments are ignored
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('/').filter(|p| !p.is_empty());
        let disk = parts.next()?;
        Some(Self {
            disk: disk.to_string(),
            segments: parts.map(str::to_string).collect(),
        })
    }

    /// Number of region segments below the disk
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Name of the addressed node (the disk itself at depth 0)
    pub fn leaf(&self) -> &str {
        self.segments.last().map_or(&self.disk, String::as_str)
    }

    /// Path of the containing node, `None` for a disk path
    pub fn parent(&self) -> Option<RegionPath> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            disk: self.disk.clone(),
            segments: rest.to_vec(),
        })
    }
}

impl fmt::Display for RegionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.disk)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
