use std::fs;

use arbor_core::CancellationToken;
use arbor_hierarchy::{BuildOptions, HierarchyError, Region, SnapshotError, TypeHierarchy};

use super::fixtures::Fixture;

fn chain_fixture() -> Fixture {
    Fixture::single_project(&[
        ("src/X.java", "public class X {}\n"),
        ("src/Y.java", "public class Y extends X {}\n"),
        ("src/Z.java", "class Z extends Absent {}\n"),
    ])
}

#[test]
fn focus_snapshot_round_trips_through_a_file() {
    let fixture = chain_fixture();
    let x = fixture.handle("src/X.java", "X");
    let h = fixture
        .ctx()
        .hierarchy_for(&x, BuildOptions::default())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hierarchy.bin");
    let mut bytes = Vec::new();
    h.store(&mut bytes).unwrap();
    fs::write(&path, &bytes).unwrap();

    let data = fs::read(&path).unwrap();
    let loaded = TypeHierarchy::load(&data, Some(&x)).unwrap();

    assert!(loaded.exists());
    assert_eq!(loaded.focus(), Some(&x));
    assert_eq!(loaded.root_classes(), h.root_classes());
    assert_eq!(loaded.all_classes(), h.all_classes());
    assert_eq!(loaded.missing_types(), h.missing_types());
    assert_eq!(loaded.project_label(), h.project_label());
    for t in h.all_classes() {
        assert_eq!(loaded.superclass(&t), h.superclass(&t), "edge for {t}");
        assert_eq!(loaded.flags(&t), h.flags(&t), "flags for {t}");
    }
}

#[test]
fn loading_for_a_different_focus_is_rejected() {
    let fixture = chain_fixture();
    let x = fixture.handle("src/X.java", "X");
    let h = fixture
        .ctx()
        .hierarchy_for(&x, BuildOptions::default())
        .unwrap();

    let mut bytes = Vec::new();
    h.store(&mut bytes).unwrap();

    let other = fixture.handle("src/Y.java", "Y");
    let err = TypeHierarchy::load(&bytes, Some(&other)).unwrap_err();
    assert!(matches!(err, SnapshotError::FocusMismatch { .. }));
}

#[test]
fn loaded_focus_snapshots_can_refresh() {
    let mut fixture = chain_fixture();
    let x = fixture.handle("src/X.java", "X");
    let h = fixture
        .ctx()
        .hierarchy_for(&x, BuildOptions::default())
        .unwrap();
    let mut bytes = Vec::new();
    h.store(&mut bytes).unwrap();

    let mut loaded = TypeHierarchy::load(&bytes, Some(&x)).unwrap();
    fixture.add_file(
        fixture.project,
        "src/W.java",
        "public class W extends X {}\n",
    );
    loaded
        .refresh(&fixture.ctx(), &CancellationToken::new())
        .unwrap();
    let w = fixture.handle("src/W.java", "W");
    assert_eq!(loaded.superclass(&w), Some(&x));
}

#[test]
fn region_snapshots_load_but_cannot_refresh() {
    let fixture = chain_fixture();
    let h = fixture
        .ctx()
        .hierarchy_in_region(Region::new().directory("src"), BuildOptions::default())
        .unwrap();

    let mut bytes = Vec::new();
    h.store(&mut bytes).unwrap();
    let mut loaded = TypeHierarchy::load(&bytes, None).unwrap();

    assert_eq!(loaded.focus(), None);
    assert_eq!(loaded.all_classes(), h.all_classes());
    assert!(loaded.missing_types().contains("Absent"));
    let err = loaded
        .refresh(&fixture.ctx(), &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, HierarchyError::Environment(_)));
}
