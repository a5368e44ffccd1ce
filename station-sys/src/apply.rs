// SPDX-License-Identifier: GPL-3.0-only

//! Apply adapter
//!
//! Renders a [`PendingPlan`] into the ordered `gpart` command sequence and
//! runs it. Destroyed disks come first, then deletions, then creations in
//! physical order, since `gpart` addresses entries by index.

use std::collections::BTreeSet;

use station_types::{BootManager, FsKind, PendingCreate, PendingPlan};
use tracing::{info, warn};

use crate::cmd::{CommandOutcome, render, run};
use crate::{Result, SysError};

/// `freebsd-boot` stubs are sized in 512-byte blocks and must stay this small
const FREEBSD_BOOT_BLOCKS: &str = "512";

/// One command of the apply sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Failure is expected when there is nothing to clear
    pub may_fail: bool,
}

impl PlannedCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            may_fail: false,
        }
    }

    fn tolerant(mut self) -> Self {
        self.may_fail = true;
        self
    }

    pub fn rendered(&self) -> String {
        render(&self.program, &self.args)
    }
}

/// Render the command sequence of `plan`
pub fn render_plan(plan: &PendingPlan, boot_manager: BootManager) -> Result<Vec<PlannedCommand>> {
    let mut commands = Vec::new();

    for destroy in &plan.destroy {
        let disk = destroy.disk.as_str();
        let target = format!("of=/dev/{disk}");
        commands.push(PlannedCommand::new("gpart", &["destroy", "-F", disk]).tolerant());
        commands.push(PlannedCommand::new(
            "dd",
            &["if=/dev/zero", &target, "bs=1m", "count=1"],
        ));
        commands.push(PlannedCommand::new(
            "gpart",
            &["create", "-s", destroy.scheme.as_gpart_str(), disk],
        ));
    }

    for delete in &plan.delete {
        let index = delete.index.to_string();
        commands.push(
            PlannedCommand::new("zpool", &["labelclear", "-f", &delete.name]).tolerant(),
        );
        commands.push(PlannedCommand::new(
            "gpart",
            &["delete", "-i", &index, &delete.parent],
        ));
    }

    // Slices created here, and scanned ones without a table, get one before
    // their first label
    let mut bare_slices: BTreeSet<&str> = plan.label_tables.iter().map(String::as_str).collect();
    let mut labelled = BTreeSet::new();
    for create in &plan.create {
        if bare_slices.contains(create.parent.as_str()) && labelled.insert(create.parent.as_str()) {
            commands.push(PlannedCommand::new(
                "gpart",
                &["create", "-s", "BSD", &create.parent],
            ));
        }
        commands.extend(create_commands(create, boot_manager)?);
        if create.fs == FsKind::Bsd {
            bare_slices.insert(create.name.as_str());
        }
    }

    Ok(commands)
}

fn create_commands(
    create: &PendingCreate,
    boot_manager: BootManager,
) -> Result<Vec<PlannedCommand>> {
    let size = format!("{}M", create.size_mb);
    let index = create.index.to_string();
    let add = |size: &str, ty: &str| {
        PlannedCommand::new(
            "gpart",
            &["add", "-a", "4k", "-s", size, "-t", ty, "-i", &index, &create.parent],
        )
    };
    let labelclear =
        || PlannedCommand::new("zpool", &["labelclear", "-f", &create.name]).tolerant();

    let commands = match create.fs {
        FsKind::Uefi => vec![
            add(&size, "efi"),
            labelclear(),
            PlannedCommand::new("newfs_msdos", &["-F", "16", &create.name]),
        ],
        FsKind::Boot if boot_manager == BootManager::Grub => {
            vec![add(&size, "bios-boot"), labelclear()]
        }
        FsKind::Boot => vec![add(FREEBSD_BOOT_BLOCKS, "freebsd-boot"), labelclear()],
        FsKind::Bsd => vec![add(&size, "freebsd")],
        FsKind::Zfs => vec![add(&size, "freebsd-zfs")],
        FsKind::Ufs => vec![add(&size, "freebsd-ufs")],
        FsKind::Swap => vec![add(&size, "freebsd-swap")],
        FsKind::None | FsKind::Freespace => {
            return Err(SysError::OperationFailed(format!(
                "cannot create {} with file system kind {}",
                create.name, create.fs
            )));
        }
    };
    Ok(commands)
}

/// Runs rendered plans, or only logs them when `dry_run` is set
#[derive(Debug, Clone, Copy)]
pub struct Applier {
    pub boot_manager: BootManager,
    pub dry_run: bool,
}

impl Applier {
    pub fn new(boot_manager: BootManager, dry_run: bool) -> Self {
        Self {
            boot_manager,
            dry_run,
        }
    }

    /// Execute `plan`, stopping at the first required command that fails
    pub fn execute(&self, plan: &PendingPlan) -> Result<Vec<CommandOutcome>> {
        let commands = render_plan(plan, self.boot_manager)?;
        if !self.dry_run && !commands.is_empty() && !crate::cmd::is_root() {
            return Err(SysError::PermissionDenied(
                "applying a partition plan requires root".to_string(),
            ));
        }

        let mut outcomes = Vec::with_capacity(commands.len());
        for command in &commands {
            info!(dry_run = self.dry_run, "{}", command.rendered());
            match run(&command.program, &command.args, self.dry_run) {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) if command.may_fail => {
                    warn!("ignoring failure of {}: {error}", command.rendered());
                }
                Err(error) => return Err(error),
            }
        }
        Ok(outcomes)
    }
}
