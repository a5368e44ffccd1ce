//! Region model - slices, GPT partitions, BSD labels and free space
//!
//! All region shapes share name and size through [`Extent`]. Only MBR
//! slices carry children.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name and size shared by disks and every region shape
pub trait Extent {
    fn name(&self) -> &str;
    fn size_mb(&self) -> u64;
}

/// Stable identifier of a non-freespace region.
///
/// Regions found by a scan get an id derived from their device name, so the
/// same physical partition keeps its id across rescans. Regions created in a
/// session get a random id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(Uuid);

impl RegionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn scanned(device_name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, device_name.as_bytes()))
    }

    fn for_status(device_name: &str, status: RegionStatus) -> Self {
        match status {
            RegionStatus::Unset => Self::scanned(device_name),
            RegionStatus::New => Self::random(),
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a region exists on disk or was planned in this session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStatus {
    /// Reflects real on-disk state
    #[default]
    Unset,
    /// Created by this session, not yet applied
    New,
}

/// File-system kind of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FsKind {
    #[serde(rename = "ZFS")]
    Zfs,
    #[serde(rename = "UFS")]
    Ufs,
    #[serde(rename = "SWAP")]
    Swap,
    /// BIOS boot stub (freebsd-boot / bios-boot)
    #[serde(rename = "BOOT")]
    Boot,
    /// EFI system partition
    #[serde(rename = "UEFI")]
    Uefi,
    /// MBR slice holding a BSD label
    #[serde(rename = "BSD")]
    Bsd,
    /// Anything the installer does not manage
    #[serde(rename = "none")]
    None,
    #[serde(rename = "freespace")]
    Freespace,
}

impl FsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zfs => "ZFS",
            Self::Ufs => "UFS",
            Self::Swap => "SWAP",
            Self::Boot => "BOOT",
            Self::Uefi => "UEFI",
            Self::Bsd => "BSD",
            Self::None => "none",
            Self::Freespace => "freespace",
        }
    }

    /// Map a `gpart` partition type to the kind the installer understands
    pub fn from_gpart_type(ty: &str) -> Self {
        match ty {
            "efi" | "ms-basic-data-efi" => Self::Uefi,
            "freebsd-boot" | "bios-boot" => Self::Boot,
            "freebsd-zfs" => Self::Zfs,
            "freebsd-ufs" => Self::Ufs,
            "freebsd-swap" => Self::Swap,
            "freebsd" => Self::Bsd,
            "free" => Self::Freespace,
            _ => Self::None,
        }
    }

    /// Whether a region of this kind marks an EFI system partition
    pub fn is_efi(&self) -> bool {
        matches!(self, Self::Uefi)
    }
}

impl fmt::Display for FsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ZFS" => Ok(Self::Zfs),
            "UFS" => Ok(Self::Ufs),
            "SWAP" => Ok(Self::Swap),
            "BOOT" => Ok(Self::Boot),
            "UEFI" | "EFI" => Ok(Self::Uefi),
            "BSD" => Ok(Self::Bsd),
            "NONE" => Ok(Self::None),
            _ => Err(format!("unknown file system kind: {s}")),
        }
    }
}

/// Unallocated space available for new regions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freespace {
    pub name: String,
    pub size_mb: u64,
}

impl Freespace {
    pub fn new(name: impl Into<String>, size_mb: u64) -> Self {
        Self {
            name: name.into(),
            size_mb,
        }
    }
}

/// A GPT partition or a BSD label inside an MBR slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: RegionId,
    pub name: String,
    pub size_mb: u64,
    pub fs: FsKind,
    /// Mount point, or the dataset layout for ZFS; empty when unmounted
    pub mount_point: String,
    pub status: RegionStatus,
}

impl Volume {
    pub fn new(
        name: impl Into<String>,
        size_mb: u64,
        fs: FsKind,
        mount_point: impl Into<String>,
        status: RegionStatus,
    ) -> Self {
        let name = name.into();
        Self {
            id: RegionId::for_status(&name, status),
            name,
            size_mb,
            fs,
            mount_point: mount_point.into(),
            status,
        }
    }
}

/// A primary MBR slice, subdivided into BSD labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub id: RegionId,
    pub name: String,
    pub size_mb: u64,
    pub fs: FsKind,
    pub status: RegionStatus,
    /// Labels and free space in physical order, summing to `size_mb`.
    /// Empty for foreign (non-BSD) slices, which are never subdivided.
    pub labels: Vec<Region>,
    /// Whether a BSD label table already exists on the device
    pub label_table: bool,
}

impl Slice {
    pub fn new(
        name: impl Into<String>,
        size_mb: u64,
        fs: FsKind,
        status: RegionStatus,
        labels: Vec<Region>,
    ) -> Self {
        let name = name.into();
        Self {
            id: RegionId::for_status(&name, status),
            name,
            size_mb,
            fs,
            status,
            labels,
            label_table: status != RegionStatus::New,
        }
    }

    /// Mark a scanned slice that carries no BSD label table yet
    pub fn without_label_table(mut self) -> Self {
        self.label_table = false;
        self
    }

    /// Whether the slice is subdivided into BSD labels
    pub fn is_bsd(&self) -> bool {
        self.fs == FsKind::Bsd
    }
}

/// Any node below a disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Region {
    Freespace(Freespace),
    Partition(Volume),
    Slice(Slice),
    Label(Volume),
}

impl Region {
    pub fn id(&self) -> Option<RegionId> {
        match self {
            Self::Freespace(_) => None,
            Self::Partition(v) | Self::Label(v) => Some(v.id),
            Self::Slice(s) => Some(s.id),
        }
    }

    pub fn fs(&self) -> FsKind {
        match self {
            Self::Freespace(_) => FsKind::Freespace,
            Self::Partition(v) | Self::Label(v) => v.fs,
            Self::Slice(s) => s.fs,
        }
    }

    pub fn mount_point(&self) -> &str {
        match self {
            Self::Partition(v) | Self::Label(v) => &v.mount_point,
            Self::Freespace(_) | Self::Slice(_) => "",
        }
    }

    /// Freespace reports [`RegionStatus::Unset`]; it never reaches the ledger
    pub fn status(&self) -> RegionStatus {
        match self {
            Self::Freespace(_) => RegionStatus::Unset,
            Self::Partition(v) | Self::Label(v) => v.status,
            Self::Slice(s) => s.status,
        }
    }

    pub fn is_freespace(&self) -> bool {
        matches!(self, Self::Freespace(_))
    }

    pub fn is_new(&self) -> bool {
        self.status() == RegionStatus::New
    }

    pub fn children(&self) -> &[Region] {
        match self {
            Self::Slice(s) => &s.labels,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Region>> {
        match self {
            Self::Slice(s) => Some(&mut s.labels),
            _ => None,
        }
    }

    pub(crate) fn grow(&mut self, by_mb: u64) {
        match self {
            Self::Freespace(f) => f.size_mb += by_mb,
            Self::Partition(v) | Self::Label(v) => v.size_mb += by_mb,
            Self::Slice(s) => s.size_mb += by_mb,
        }
    }
}

impl Extent for Region {
    fn name(&self) -> &str {
        match self {
            Self::Freespace(f) => &f.name,
            Self::Partition(v) | Self::Label(v) => &v.name,
            Self::Slice(s) => &s.name,
        }
    }

    fn size_mb(&self) -> u64 {
        match self {
            Self::Freespace(f) => f.size_mb,
            Self::Partition(v) | Self::Label(v) => v.size_mb,
            Self::Slice(s) => s.size_mb,
        }
    }
}
