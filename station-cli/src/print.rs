use anyhow::Result;
use serde::Serialize;
use station_partition::{PoolSelection, ValidationReport};
use station_sys::{CommandOutcome, PlannedCommand};
use station_types::{DiskMap, Extent, Firmware, PendingPlan, Region, mb_to_pretty};

pub fn tree(disks: &DiskMap, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(disks)?);
        return Ok(());
    }

    for disk in disks.values() {
        let scheme = disk.scheme.map_or("none".to_string(), |s| s.to_string());
        println!(
            "{}  {}  {}",
            disk.display_name(),
            mb_to_pretty(disk.size_mb, true),
            scheme
        );
        for region in &disk.regions {
            print_region(region, 1);
            for child in region.children() {
                print_region(child, 2);
            }
        }
    }
    Ok(())
}

fn print_region(region: &Region, depth: usize) {
    let status = if region.is_new() { "new" } else { "" };
    println!(
        "{:indent$}{:<12} {:>12} {:<6} {:<4} {}",
        "",
        region.name(),
        mb_to_pretty(region.size_mb(), false),
        region.fs().as_str(),
        status,
        region.mount_point(),
        indent = depth * 2
    );
}

/// Pool selection as shown next to a plan
#[derive(Serialize)]
pub struct Pool<'a> {
    #[serde(flatten)]
    selection: &'a PoolSelection,
    partition_size_mb: Option<u64>,
    vdev: Option<String>,
}

impl<'a> Pool<'a> {
    pub fn new(selection: &'a PoolSelection, firmware: Firmware) -> Self {
        Self {
            selection,
            partition_size_mb: selection.partition_size_mb(firmware),
            vdev: selection.vdev(),
        }
    }
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    plan: &'a PendingPlan,
    validation: &'a ValidationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pool: Option<&'a Pool<'a>>,
    commands: Vec<String>,
}

pub fn plan(
    plan: &PendingPlan,
    validation: &ValidationReport,
    pool: Option<&Pool<'_>>,
    commands: &[PlannedCommand],
    json: bool,
) -> Result<()> {
    let rendered: Vec<String> = commands.iter().map(PlannedCommand::rendered).collect();
    if json {
        let output = PlanOutput {
            plan,
            validation,
            pool,
            commands: rendered,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if plan.is_destructive() {
        println!("WARNING: this plan destroys existing data");
    }
    println!("New partitions:");
    for line in &plan.summary {
        println!("  {line}");
    }
    if let Some(pool) = pool {
        let disks: Vec<&str> = pool
            .selection
            .disks()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        println!("Pool: {} of {}", pool.selection.pool_type, disks.join(", "));
        if let Some(size) = pool.partition_size_mb {
            println!("  ZFS partition per disk: {}", mb_to_pretty(size, false));
        }
        if let Some(vdev) = &pool.vdev {
            println!("  vdev: ({vdev})");
        }
    }
    println!("Commands:");
    for command in &rendered {
        println!("  {command}");
    }
    if validation.is_installable() {
        println!("{} is ready to install", validation.disk);
    } else {
        for finding in &validation.findings {
            println!("{}: {finding}", validation.disk);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct Outcome<'a> {
    command: &'a str,
    executed: bool,
    stdout: &'a str,
    stderr: &'a str,
}

pub fn outcomes(outcomes: &[CommandOutcome], json: bool) -> Result<()> {
    if json {
        let list: Vec<Outcome<'_>> = outcomes
            .iter()
            .map(|o| Outcome {
                command: &o.command,
                executed: o.executed,
                stdout: &o.stdout,
                stderr: &o.stderr,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    for outcome in outcomes {
        let mark = if outcome.executed { "ran" } else { "dry-run" };
        println!("[{mark}] {}", outcome.command);
    }
    Ok(())
}
