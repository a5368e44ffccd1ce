use std::cell::Cell;
use std::rc::Rc;

use station_partition::{
    Finding, PlanError, PlannerConfig, SchemeChange, Session, disk_is_consistent,
};
use station_sys::{DeviceInventory, DiskReport, FixtureInventory, SysError, render_plan};
use station_types::{
    BootManager, Extent, Firmware, FsKind, Region, RegionId, RegionPath, Scheme, ZFS_DATASETS,
};

const GPT_UEFI_BLANK: &str = include_str!("../../resources/inventories/gpt-uefi-blank.toml");
const MBR_BIOS: &str = include_str!("../../resources/inventories/mbr-bios.toml");
const GPT_THREE: &str = include_str!("../../resources/inventories/gpt-three-partitions.toml");
const MIXED: &str = include_str!("../../resources/inventories/mixed.toml");
const MBR_FOREIGN: &str = include_str!("../../resources/inventories/mbr-foreign.toml");

fn session(name: &str, raw: &str) -> Session<FixtureInventory> {
    let inventory = FixtureInventory::from_toml_str(name, raw).unwrap();
    Session::new(inventory, PlannerConfig::default()).unwrap()
}

fn path(s: &str) -> RegionPath {
    RegionPath::parse(s).unwrap()
}

fn names(regions: &[Region]) -> Vec<&str> {
    regions.iter().map(Extent::name).collect()
}

fn assert_consistent(session: &Session<FixtureInventory>) {
    for disk in session.get_tree().values() {
        assert!(disk_is_consistent(disk), "{} does not add up", disk.name);
    }
}

#[test]
fn fixtures_build_consistent_trees() {
    for (name, raw) in [
        ("gpt-uefi-blank", GPT_UEFI_BLANK),
        ("mbr-bios", MBR_BIOS),
        ("gpt-three-partitions", GPT_THREE),
        ("mixed", MIXED),
        ("mbr-foreign", MBR_FOREIGN),
    ] {
        assert_consistent(&session(name, raw));
    }

    let s = session("mixed", MIXED);
    let ada0 = s.disk("ada0").unwrap();
    assert_eq!(names(&ada0.regions), ["ada0s1", "freespace1"]);
    assert_eq!(names(ada0.regions[0].children()), ["ada0s1a", "ada0s1b"]);
    assert_eq!(s.firmware(), Firmware::Bios);

    let blank = session("gpt-uefi-blank", GPT_UEFI_BLANK);
    let ada1 = blank.disk("ada1").unwrap();
    assert_eq!(ada1.scheme, None);
    assert!(ada1.is_blank());
}

#[test]
fn uefi_auto_layout_of_a_blank_disk() {
    let mut s = session("gpt-uefi-blank", GPT_UEFI_BLANK);
    s.auto_layout(&path("ada0/freespace1"), 10000, FsKind::Zfs, None)
        .unwrap();

    let plan = s.get_pending_plan();
    let created: Vec<(&str, u64, FsKind)> = plan
        .create
        .iter()
        .map(|c| (c.name.as_str(), c.size_mb, c.fs))
        .collect();
    assert_eq!(
        created,
        [
            ("ada0p1", 256, FsKind::Uefi),
            ("ada0p2", 7695, FsKind::Zfs),
            ("ada0p3", 2048, FsKind::Swap),
        ]
    );

    let summary: Vec<(FsKind, u64)> = plan.summary.iter().map(|l| (l.fs, l.size_mb)).collect();
    assert_eq!(
        summary,
        [
            (FsKind::Uefi, 256),
            (FsKind::Zfs, 7695),
            (FsKind::Swap, 2048),
        ]
    );
    assert_eq!(plan.summary[1].mount_point, ZFS_DATASETS);
    assert!(plan.destroy.is_empty() && plan.delete.is_empty());

    assert_consistent(&s);
    assert!(s.validate("ada0").unwrap().is_installable());

    let commands = render_plan(&plan, BootManager::None).unwrap();
    assert_eq!(
        commands[0].rendered(),
        "gpart add -a 4k -s 256M -t efi -i 1 ada0"
    );
    assert!(commands.iter().any(|c| c.rendered() == "newfs_msdos -F 16 ada0p1"));
}

#[test]
fn mbr_slice_then_labels() {
    let mut s = session("mbr-bios", MBR_BIOS);
    s.create_slice(&path("ada0/freespace1"), 4000).unwrap();

    let ada0 = s.disk("ada0").unwrap();
    assert_eq!(names(&ada0.regions), ["ada0s1", "freespace1"]);
    assert_eq!(ada0.regions[0].size_mb(), 4000);
    assert!(ada0.regions[0].is_new());
    assert_eq!(ada0.regions[1].size_mb(), 5000);
    assert_eq!(s.ledger().create().len(), 1);
    assert_eq!(s.ledger().create()[0].name, "ada0s1");

    let free = path("ada0/ada0s1/freespace1");
    s.create_label(&free, 3000, Some(FsKind::Ufs), "/").unwrap();
    assert_eq!(s.suggest_fs(&free).unwrap(), FsKind::Swap);
    s.create_label(&free, 1000, None, "").unwrap();
    assert_consistent(&s);

    let labels = s.disk("ada0").unwrap().regions[0].children();
    assert_eq!(names(labels), ["ada0s1a", "ada0s1b"]);
    assert_eq!(labels[1].fs(), FsKind::Swap);

    let plan = s.get_pending_plan();
    let summary: Vec<(FsKind, u64, &str)> = plan
        .summary
        .iter()
        .map(|l| (l.fs, l.size_mb, l.mount_point.as_str()))
        .collect();
    assert_eq!(
        summary,
        [(FsKind::Ufs, 3000, "/"), (FsKind::Swap, 1000, "")]
    );

    let rendered: Vec<String> = render_plan(&plan, BootManager::None)
        .unwrap()
        .iter()
        .map(|c| c.rendered())
        .collect();
    assert_eq!(
        rendered,
        [
            "gpart add -a 4k -s 4000M -t freebsd -i 1 ada0",
            "gpart create -s BSD ada0s1",
            "gpart add -a 4k -s 3000M -t freebsd-ufs -i 1 ada0s1",
            "gpart add -a 4k -s 1000M -t freebsd-swap -i 2 ada0s1",
        ]
    );
    assert!(plan.label_tables.is_empty());
}

#[test]
fn foreign_slices_have_no_labels() {
    let s = session("mbr-foreign", MBR_FOREIGN);
    let ada0 = s.disk("ada0").unwrap();
    assert_eq!(names(&ada0.regions), ["ada0s1", "ada0s2", "freespace1"]);
    assert_eq!(ada0.regions[0].fs(), FsKind::None);
    assert!(ada0.regions[0].children().is_empty());
    assert!(disk_is_consistent(ada0));

    let err = s.suggest_fs(&path("ada0/ada0s1/freespace1")).unwrap_err();
    assert!(matches!(err, PlanError::InvalidOperation { .. }));
}

#[test]
fn labels_in_a_bare_scanned_slice_create_its_table_first() {
    let mut s = session("mbr-foreign", MBR_FOREIGN);
    let Region::Slice(bare) = &s.disk("ada0").unwrap().regions[1] else {
        panic!("ada0s2 is not a slice");
    };
    assert!(!bare.label_table);
    assert_eq!(names(&bare.labels), ["freespace1"]);

    let free = path("ada0/ada0s2/freespace1");
    s.create_label(&free, 1000, Some(FsKind::Ufs), "/").unwrap();
    s.create_label(&free, 500, Some(FsKind::Swap), "").unwrap();
    assert_consistent(&s);

    let plan = s.get_pending_plan();
    assert_eq!(plan.label_tables, ["ada0s2"]);
    let rendered: Vec<String> = render_plan(&plan, BootManager::None)
        .unwrap()
        .iter()
        .map(|c| c.rendered())
        .collect();
    assert_eq!(
        rendered,
        [
            "gpart create -s BSD ada0s2",
            "gpart add -a 4k -s 1000M -t freebsd-ufs -i 1 ada0s2",
            "gpart add -a 4k -s 500M -t freebsd-swap -i 2 ada0s2",
        ]
    );
}

#[test]
fn fifth_primary_slice_is_refused() {
    let mut s = session("mbr-bios", MBR_BIOS);
    for _ in 0..4 {
        s.create_slice(&path("ada0/freespace1"), 1000).unwrap();
    }
    let before = s.get_tree().clone();

    let err = s.create_slice(&path("ada0/freespace1"), 1000).unwrap_err();
    assert!(matches!(err, PlanError::SchemeConflict { .. }));
    assert_eq!(s.get_tree(), &before);
    assert_eq!(s.ledger().create().len(), 4);
}

#[test]
fn deleting_the_middle_partition() {
    let mut s = session("gpt-three-partitions", GPT_THREE);
    let id = s.disk("nvd0").unwrap().regions[1].id().unwrap();
    assert_eq!(id, RegionId::scanned("nvd0p2"));

    s.delete(&path("nvd0/nvd0p2")).unwrap();
    let nvd0 = s.disk("nvd0").unwrap();
    assert_eq!(names(&nvd0.regions), ["nvd0p1", "freespace1", "nvd0p3"]);
    assert_eq!(nvd0.regions[1].size_mb(), 2000);
    assert_consistent(&s);

    let deleted = s.ledger().delete();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].id, id);
    assert_eq!((deleted[0].parent.as_str(), deleted[0].index), ("nvd0", 2));

    // the path is free space now
    let err = s.delete(&path("nvd0/nvd0p2")).unwrap_err();
    assert!(matches!(err, PlanError::InvalidOperation { .. }));
    assert_eq!(s.ledger().delete().len(), 1);

    let err = s.delete(&path("nvd0/freespace1")).unwrap_err();
    assert!(matches!(err, PlanError::InvalidOperation { .. }));
}

#[test]
fn deleting_new_regions_leaves_no_delete_entry() {
    let mut s = session("gpt-uefi-blank", GPT_UEFI_BLANK);
    s.auto_layout(&path("ada0/freespace1"), 10000, FsKind::Ufs, Some(true))
        .unwrap();
    s.delete(&path("ada0/ada0p2")).unwrap();

    assert!(s.ledger().delete().is_empty());
    let ledger = s.ledger();
    let created: Vec<&str> = ledger.create().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(created, ["ada0p1"]);
    let ada0 = s.disk("ada0").unwrap();
    assert_eq!(names(&ada0.regions), ["ada0p1", "freespace1"]);
    assert_consistent(&s);
}

#[test]
fn sizes_add_up_through_a_session() {
    let mut s = session("mixed", MIXED);

    s.delete(&path("ada0/ada0s1/ada0s1b")).unwrap();
    assert_consistent(&s);
    s.create_label(&path("ada0/ada0s1/freespace1"), 1500, None, "")
        .unwrap();
    assert_consistent(&s);
    s.create_slice(&path("ada0/freespace1"), 6000).unwrap();
    assert_consistent(&s);
    let free = path("ada0/ada0s2/freespace1");
    s.create_label(&free, 6000, Some(FsKind::Ufs), "/var")
        .unwrap();
    assert_consistent(&s);
    s.delete(&path("ada0/ada0s2")).unwrap();
    assert_consistent(&s);

    assert_eq!(
        s.suggest_fs(&path("ada1/freespace1")).unwrap(),
        FsKind::Boot
    );
    s.create_partition(&path("ada1/freespace1"), 1, None, "")
        .unwrap();
    s.create_partition(&path("ada1/freespace1"), 3000, Some(FsKind::Zfs), "")
        .unwrap();
    s.delete(&path("ada1/ada1p1")).unwrap();
    assert_consistent(&s);

    let ada0 = s.disk("ada0").unwrap();
    assert_eq!(names(&ada0.regions), ["ada0s1", "freespace1"]);
    assert_eq!(ada0.regions[1].size_mb(), 10000);

    let ledger = s.ledger();
    let created: Vec<&str> = ledger.create().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(created, ["ada0s1b", "ada1p2", "ada1p3"]);
    let deleted: Vec<&str> = ledger.delete().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(deleted, ["ada0s1b", "ada1p1"]);
}

#[test]
fn bad_requests_change_nothing() {
    let mut s = session("mixed", MIXED);
    let before = s.get_tree().clone();
    let free = path("ada1/freespace1");
    let ufs = Some(FsKind::Ufs);
    let init = SchemeChange::Initialize;
    let mbr_free = path("ada0/freespace1");

    let cases = [
        s.create(&path("ada9/freespace1"), 10, None, "").map(|_| ()),
        s.create(&free, 0, None, "").map(|_| ()),
        s.create(&free, 5001, None, "").map(|_| ()),
        s.create(&path("ada1/ada1p1"), 10, None, "").map(|_| ()),
        s.create(&free, 10, ufs, "var").map(|_| ()),
        s.delete(&path("ada1")).map(|_| ()),
    ];
    for result in cases {
        assert!(matches!(result, Err(PlanError::InvalidOperation { .. })));
    }

    let conflicts = [
        s.create_slice(&free, 10).map(|_| ()),
        s.create(&mbr_free, 10, ufs, "/").map(|_| ()),
        s.create_partition(&mbr_free, 10, None, "").map(|_| ()),
        s.set_scheme("ada0", Scheme::Gpt, init).map(|_| ()),
    ];
    for result in conflicts {
        assert!(matches!(result, Err(PlanError::SchemeConflict { .. })));
    }

    assert_eq!(s.get_tree(), &before);
    assert!(s.ledger().is_empty());
}

#[test]
fn replacing_a_table_supersedes_its_pending_work() {
    let mut s = session("mixed", MIXED);
    s.delete(&path("ada0/ada0s1/ada0s1a")).unwrap();
    s.create_slice(&path("ada0/freespace1"), 2000).unwrap();
    s.delete(&path("ada1/ada1p1")).unwrap();

    s.set_scheme("ada0", Scheme::Gpt, SchemeChange::DestroyExisting)
        .unwrap();
    let ada0 = s.disk("ada0").unwrap();
    assert_eq!(ada0.scheme, Some(Scheme::Gpt));
    assert_eq!(names(&ada0.regions), ["freespace1"]);
    assert_eq!(ada0.regions[0].size_mb(), 20000);

    let plan = s.get_pending_plan();
    assert!(plan.is_destructive());
    assert_eq!(plan.destroy.len(), 1);
    let destroy = &plan.destroy[0];
    assert_eq!(
        (destroy.disk.as_str(), destroy.scheme),
        ("ada0", Scheme::Gpt)
    );
    let deleted: Vec<&str> = plan.delete.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(deleted, ["ada1p1"]);
    assert!(plan.create.is_empty());

    let rendered: Vec<String> = render_plan(&plan, BootManager::None)
        .unwrap()
        .iter()
        .map(|c| c.rendered())
        .collect();
    assert_eq!(
        rendered[..3],
        [
            "gpart destroy -F ada0",
            "dd if=/dev/zero of=/dev/ada0 bs=1m count=1",
            "gpart create -s GPT ada0",
        ]
    );
}

#[test]
fn blank_disk_needs_a_scheme_first() {
    let mut s = session("gpt-uefi-blank", GPT_UEFI_BLANK);
    let err = s
        .create(&path("ada1/freespace1"), 100, None, "")
        .unwrap_err();
    assert!(matches!(err, PlanError::SchemeConflict { .. }));
    assert_eq!(s.validate("ada1").unwrap().findings, [Finding::NoScheme]);

    s.set_scheme("ada1", Scheme::Mbr, SchemeChange::Initialize)
        .unwrap();
    s.auto_layout(&path("ada1/freespace1"), 20000, FsKind::Zfs, None)
        .unwrap();
    let slice = &s.disk("ada1").unwrap().regions[0];
    assert_eq!(slice.size_mb(), 19999);
    assert_eq!(names(slice.children()), ["ada1s1a", "ada1s1b"]);
    assert_eq!(slice.children()[0].size_mb(), 19999 - 2048);
    assert!(s.validate("ada1").unwrap().is_installable());
    assert_consistent(&s);
}

#[test]
fn revert_restores_the_scan() {
    let mut s = session("gpt-three-partitions", GPT_THREE);
    let scanned = s.get_tree().clone();
    let id = RegionId::scanned("nvd0p2");

    s.delete(&path("nvd0/nvd0p2")).unwrap();
    s.create_partition(&path("nvd0/freespace1"), 500, Some(FsKind::Zfs), "")
        .unwrap();
    assert_eq!(s.path_of(id), None);

    s.revert().unwrap();
    assert_eq!(s.get_tree(), &scanned);
    assert!(s.ledger().is_empty());
    assert!(s.get_pending_plan().is_empty());
    assert_eq!(s.path_of(id), Some(path("nvd0/nvd0p2")));
}

/// Fixture inventory whose rescans can be made to fail
struct Unplugged {
    fixture: FixtureInventory,
    failing: Rc<Cell<bool>>,
}

impl DeviceInventory for Unplugged {
    fn scan(&self) -> station_sys::Result<Vec<DiskReport>> {
        if self.failing.get() {
            return Err(SysError::DeviceNotFound("nvd0".to_string()));
        }
        self.fixture.scan()
    }

    fn firmware(&self) -> station_sys::Result<Firmware> {
        self.fixture.firmware()
    }
}

#[test]
fn failed_rescan_on_revert_restores_the_snapshot_and_reports() {
    let failing = Rc::new(Cell::new(false));
    let inventory = Unplugged {
        fixture: FixtureInventory::from_toml_str("gpt-three-partitions", GPT_THREE).unwrap(),
        failing: Rc::clone(&failing),
    };
    let mut s = Session::new(inventory, PlannerConfig::default()).unwrap();
    let scanned = s.get_tree().clone();

    s.delete(&path("nvd0/nvd0p3")).unwrap();
    failing.set(true);

    let err = s.revert().unwrap_err();
    assert!(matches!(err, PlanError::InventoryError { .. }));
    assert_eq!(s.get_tree(), &scanned);
    assert!(s.ledger().is_empty());
}

#[test]
fn frozen_plan_refuses_changes() {
    let mut s = session("gpt-uefi-blank", GPT_UEFI_BLANK);
    s.auto_layout(&path("ada0/freespace1"), 10000, FsKind::Zfs, None)
        .unwrap();
    let plan = s.get_pending_plan();

    s.freeze();
    assert!(s.ledger().is_frozen());
    assert_eq!(
        s.delete(&path("ada0/ada0p2")).unwrap_err(),
        PlanError::LedgerFrozen
    );
    assert_eq!(
        s.create(&path("ada0/freespace1"), 1, None, "").unwrap_err(),
        PlanError::LedgerFrozen
    );
    assert_eq!(s.revert().unwrap_err(), PlanError::LedgerFrozen);
    assert_eq!(s.get_pending_plan(), plan);

    s.thaw();
    s.delete(&path("ada0/ada0p3")).unwrap();
    assert_eq!(s.ledger().create().len(), 2);
}

#[test]
fn validation_reports_missing_pieces() {
    let mut s = session("gpt-uefi-blank", GPT_UEFI_BLANK);
    assert_eq!(
        s.validate("ada0").unwrap().findings,
        [Finding::MissingRoot, Finding::MissingEfi]
    );
    s.create_partition(&path("ada0/freespace1"), 4000, Some(FsKind::Zfs), "")
        .unwrap();
    assert_eq!(s.validate("ada0").unwrap().findings, [Finding::MissingEfi]);
    assert!(s.validate("nope").is_err());
}

#[test]
fn largest_free_region_and_config_override() {
    let inventory = FixtureInventory::from_toml_str("mixed", MIXED).unwrap();
    let config = PlannerConfig {
        firmware: Some(Firmware::Uefi),
        swap_mb: 1024,
        ..PlannerConfig::default()
    };
    let mut s = Session::new(inventory, config).unwrap();
    assert_eq!(s.firmware(), Firmware::Uefi);

    let target = s.largest_free_region("ada1").unwrap().unwrap();
    assert_eq!(target, path("ada1/freespace1"));
    s.auto_layout(&target, 5000, FsKind::Ufs, None).unwrap();

    let ledger = s.ledger();
    let created: Vec<(u64, FsKind)> = ledger.create().iter().map(|c| (c.size_mb, c.fs)).collect();
    assert_eq!(
        created,
        [
            (256, FsKind::Uefi),
            (5000 - 256 - 1024 - 1, FsKind::Ufs),
            (1024, FsKind::Swap),
        ]
    );
}

#[test]
fn pending_plan_serialises_for_the_frontend() {
    let mut s = session("mbr-bios", MBR_BIOS);
    s.auto_layout(&path("ada0/freespace1"), 9000, FsKind::Ufs, None)
        .unwrap();

    let value = serde_json::to_value(s.get_pending_plan()).unwrap();
    assert_eq!(value["create"][0]["name"], "ada0s1");
    assert_eq!(value["create"][0]["fs"], "BSD");
    assert_eq!(value["create"][1]["parent"], "ada0s1");
    assert_eq!(value["summary"][0]["mount_point"], "/");
    assert_eq!(value["summary"][1]["fs"], "SWAP");
}
