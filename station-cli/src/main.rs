// SPDX-License-Identifier: GPL-3.0-only

//! `station`: inspect disks, plan an automatic layout and apply it

mod print;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use station_partition::{PlannerConfig, PoolSelection, PoolType, SchemeChange, Session};
use station_sys::{
    Applier, DeviceInventory, FixtureInventory, FreeBsdInventory, is_root, render_plan,
};
use station_types::{Extent, Firmware, FsKind, Scheme};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_LOG_FILTER: &str = "station=info,station_partition=info,station_sys=info,warn";

/// Partition planner of the Install Station installer
#[derive(Parser)]
#[command(name = "station")]
#[command(about = "Plan and apply disk layouts for Install Station", long_about = None)]
struct Cli {
    /// Read disks from a TOML inventory instead of the running system
    #[arg(long, global = true)]
    inventory: Option<PathBuf>,

    /// Planner configuration (TOML); defaults apply when missing
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the detected firmware boot mode (UEFI or BIOS)
    #[arg(long, global = true, value_parser = parse_firmware)]
    firmware: Option<Firmware>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log filter directive, e.g. `station_partition=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List disks and their partition trees
    Scan,
    /// Lay out a disk automatically and print the pending plan
    Plan(PlanArgs),
    /// Lay out a disk automatically and run the resulting commands
    Apply {
        #[command(flatten)]
        plan: PlanArgs,
        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args)]
struct PlanArgs {
    /// Disk to lay out
    #[arg(long)]
    disk: String,

    /// Root file system (ZFS or UFS)
    #[arg(long, default_value = "ZFS")]
    fs: FsKind,

    /// Create this partition scheme (GPT or MBR) before the layout
    #[arg(long, value_parser = parse_scheme)]
    scheme: Option<Scheme>,

    /// Allow --scheme to replace an existing partition table
    #[arg(long, requires = "scheme")]
    destroy: bool,

    /// Megabytes to lay out; defaults to the whole largest free region
    #[arg(long)]
    size_mb: Option<u64>,

    /// Build a ZFS pool of this type (stripe, mirror, raidz1-3) with --disk first
    #[arg(long)]
    pool: Option<PoolType>,

    /// Further pool disks, no smaller than --disk
    #[arg(long = "pool-disk", requires = "pool")]
    pool_disks: Vec<String>,
}

fn parse_firmware(s: &str) -> Result<Firmware, String> {
    Firmware::parse(s).ok_or_else(|| format!("unknown firmware '{s}', expected UEFI or BIOS"))
}

fn parse_scheme(s: &str) -> Result<Scheme, String> {
    Scheme::parse(s).ok_or_else(|| format!("unknown scheme '{s}', expected GPT or MBR"))
}

fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let mut config = match &cli.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    if cli.firmware.is_some() {
        config.firmware = cli.firmware;
    }

    match &cli.inventory {
        Some(path) => {
            let inventory = FixtureInventory::load(path)
                .with_context(|| format!("cannot load inventory {}", path.display()))?;
            run(&cli, inventory, config)
        }
        None => run(&cli, FreeBsdInventory::new(), config),
    }
}

fn run<I: DeviceInventory>(cli: &Cli, inventory: I, config: PlannerConfig) -> Result<()> {
    let mut session = Session::new(inventory, config).context("cannot scan disks")?;
    tracing::debug!("firmware: {}", session.firmware());

    match &cli.command {
        Commands::Scan => print::tree(session.get_tree(), cli.json),
        Commands::Plan(args) => {
            let pool = select_pool(&session, args)?;
            lay_out(&mut session, args)?;
            let plan = session.get_pending_plan();
            let commands = render_plan(&plan, session.config().boot_manager)?;
            let validation = session.validate(&args.disk)?;
            let firmware = session.firmware();
            let pool = pool.as_ref().map(|pool| print::Pool::new(pool, firmware));
            print::plan(&plan, &validation, pool.as_ref(), &commands, cli.json)
        }
        Commands::Apply { plan: args, dry_run } => {
            if !dry_run && !is_root() {
                bail!("applying a plan requires root; use --dry-run to preview it");
            }
            select_pool(&session, args)?;
            lay_out(&mut session, args)?;

            let report = session.validate(&args.disk)?;
            if !report.is_installable() {
                let findings: Vec<String> =
                    report.findings.iter().map(ToString::to_string).collect();
                bail!("{} is not installable: {}", args.disk, findings.join("; "));
            }

            let plan = session.get_pending_plan();
            session.freeze();
            let result = Applier::new(session.config().boot_manager, *dry_run).execute(&plan);
            session.thaw();
            print::outcomes(&result?, cli.json)
        }
    }
}

/// Check the requested pool: `--disk` first, then every `--pool-disk`
fn select_pool<I: DeviceInventory>(
    session: &Session<I>,
    args: &PlanArgs,
) -> Result<Option<PoolSelection>> {
    let Some(pool_type) = args.pool else {
        return Ok(None);
    };
    if args.fs != FsKind::Zfs {
        bail!("a {pool_type} pool needs --fs ZFS");
    }

    let mut pool = PoolSelection::new(pool_type);
    for name in std::iter::once(&args.disk).chain(&args.pool_disks) {
        let disk = session
            .disk(name)
            .with_context(|| format!("no such disk {name}"))?;
        pool.select(name, disk.size_mb)?;
    }
    if !pool.is_complete() {
        bail!(
            "a {pool_type} pool cannot be built from {} disks",
            pool.disks().len()
        );
    }
    Ok(Some(pool))
}

/// Optionally set the scheme, then auto-lay out the largest free region
fn lay_out<I: DeviceInventory>(session: &mut Session<I>, args: &PlanArgs) -> Result<()> {
    if let Some(scheme) = args.scheme {
        let change = if args.destroy {
            SchemeChange::DestroyExisting
        } else {
            SchemeChange::Initialize
        };
        session.set_scheme(&args.disk, scheme, change)?;
    }

    let target = session
        .largest_free_region(&args.disk)?
        .with_context(|| format!("{} has no free space", args.disk))?;
    let free_mb = session
        .disk(&args.disk)
        .and_then(|disk| disk.region(target.leaf()))
        .map_or(0, Extent::size_mb);

    session.auto_layout(&target, args.size_mb.unwrap_or(free_mb), args.fs, None)?;
    Ok(())
}
