use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arbor_core::CancellationToken;
use arbor_hierarchy::{BuildOptions, BuildProgress, HierarchyError, ProgressSink};

use super::fixtures::Fixture;

fn chain_fixture() -> Fixture {
    Fixture::single_project(&[
        ("src/X.java", "public class X {}\n"),
        ("src/Y.java", "public class Y extends X {}\n"),
        ("src/Z.java", "public class Z extends Y {}\n"),
    ])
}

#[test]
fn discovery_collects_transitive_subtypes() {
    let fixture = chain_fixture();
    let x = fixture.handle("src/X.java", "X");
    let h = fixture
        .ctx()
        .hierarchy_for(&x, BuildOptions::default())
        .unwrap();

    let y = fixture.handle("src/Y.java", "Y");
    let z = fixture.handle("src/Z.java", "Z");
    assert!(h.exists());
    assert_eq!(h.focus(), Some(&x));
    assert_eq!(h.root_classes(), &[x.clone()]);
    assert_eq!(h.all_subtypes(&x), vec![y.clone(), z.clone()]);
    assert_eq!(h.superclass(&z), Some(&y));
    assert_eq!(h.project_label(), "demo");
}

#[test]
fn unrelated_types_in_a_collected_unit_stay_out() {
    let fixture = Fixture::single_project(&[
        ("src/Focus.java", "public class Focus {}\n"),
        ("src/Mix.java", "class Sub extends Focus {}\nclass Free {}\n"),
    ]);
    let focus = fixture.handle("src/Focus.java", "Focus");
    let h = fixture
        .ctx()
        .hierarchy_for(&focus, BuildOptions::default())
        .unwrap();

    assert!(h.contains(&fixture.handle("src/Mix.java", "Sub")));
    let free = fixture.handle("src/Mix.java", "Free");
    assert!(!h.contains(&free));
    assert_eq!(h.flags(&free), None);
}

#[test]
fn differently_cased_references_still_link() {
    let fixture = Fixture::single_project(&[
        ("src/Shape.java", "public class Shape {}\n"),
        ("src/Circle.java", "class Circle extends SHAPE {}\n"),
    ]);
    let shape = fixture.handle("src/Shape.java", "Shape");
    let h = fixture
        .ctx()
        .hierarchy_for(&shape, BuildOptions::default())
        .unwrap();

    let circle = fixture.handle("src/Circle.java", "Circle");
    assert_eq!(h.superclass(&circle), Some(&shape));
    assert_eq!(h.all_subtypes(&shape), vec![circle]);
}

#[test]
fn supertypes_only_skips_the_index_walk() {
    let fixture = Fixture::single_project(&[
        ("src/Base.java", "public class Base {}\n"),
        ("src/Mid.java", "public class Mid extends Base {}\n"),
        ("src/Leaf.java", "public class Leaf extends Mid {}\n"),
    ]);
    let mid = fixture.handle("src/Mid.java", "Mid");
    let options = BuildOptions {
        compute_subtypes: false,
        ..BuildOptions::default()
    };
    let h = fixture.ctx().hierarchy_for(&mid, options).unwrap();

    let base = fixture.handle("src/Base.java", "Base");
    assert_eq!(h.all_superclasses(&mid), vec![base]);
    assert!(!h.contains(&fixture.handle("src/Leaf.java", "Leaf")));
    assert!(h.subclasses(&mid).is_empty());
}

#[test]
fn binary_focus_without_source_subtypes_reduces_to_its_stub_chain() {
    let fixture = Fixture::single_project(&[("src/A.java", "public class A {}\n")]);
    let focus = fixture.ctx().binary_handle("java.util.ArrayList").unwrap();
    let h = fixture
        .ctx()
        .hierarchy_for(&focus, BuildOptions::default())
        .unwrap();

    let ups: Vec<String> = h
        .all_superclasses(&focus)
        .iter()
        .map(|t| t.qualified().to_string())
        .collect();
    assert_eq!(
        ups,
        [
            "java.util.AbstractList",
            "java.util.AbstractCollection",
            "java.lang.Object"
        ]
    );
    assert_eq!(h.root_classes().len(), 1);
    assert_eq!(h.project_label(), "");
}

#[test]
fn binary_focus_picks_up_source_subtypes() {
    let fixture = Fixture::single_project(&[(
        "src/Special.java",
        "package app; public class Special extends ArrayList {}\n",
    )]);
    let focus = fixture.ctx().binary_handle("java.util.ArrayList").unwrap();
    let h = fixture
        .ctx()
        .hierarchy_for(&focus, BuildOptions::default())
        .unwrap();

    let special = fixture.handle("src/Special.java", "app.Special");
    assert_eq!(h.subclasses(&focus), vec![special.clone()]);
    assert_eq!(
        h.superclass(&special).map(|t| t.qualified().as_str()),
        Some("java.util.ArrayList")
    );
}

#[test]
fn subtype_discovery_stays_inside_dependent_projects() {
    let mut fixture = Fixture::empty();
    let core = fixture.project;
    let plugin = fixture.add_project("plugin", &[core]);
    let stray = fixture.add_project("stray", &[]);
    fixture.add_file(core, "core/Base.java", "package core; public class Base {}\n");
    fixture.add_file(
        plugin,
        "plugin/Ext.java",
        "package plugin; public class Ext extends Base {}\n",
    );
    fixture.add_file(
        stray,
        "stray/Fake.java",
        "package stray; public class Fake extends Base {}\n",
    );

    let base = fixture.handle("core/Base.java", "core.Base");
    let h = fixture
        .ctx()
        .hierarchy_for(&base, BuildOptions::default())
        .unwrap();

    let ext = fixture.handle("plugin/Ext.java", "plugin.Ext");
    assert_eq!(h.all_subtypes(&base), vec![ext]);
    assert!(!h.contains(&fixture.handle("stray/Fake.java", "stray.Fake")));
    assert_eq!(h.project_label(), "demo");
}

#[test]
fn a_focus_missing_from_the_file_store_fails_in_every_mode() {
    let fixture = Fixture::single_project(&[("src/A.java", "public class A {}\n")]);
    let ghost = fixture.handle("src/Ghost.java", "Ghost");

    let err = fixture
        .ctx()
        .hierarchy_for(&ghost, BuildOptions::default())
        .unwrap_err();
    assert!(matches!(err, HierarchyError::Environment(_)));

    let options = BuildOptions {
        compute_subtypes: false,
        ..BuildOptions::default()
    };
    let err = fixture.ctx().hierarchy_for(&ghost, options).unwrap_err();
    assert!(matches!(err, HierarchyError::Environment(_)));
}

#[test]
fn focus_unit_joins_the_build_even_when_unindexed() {
    let mut fixture = Fixture::empty();
    let project = fixture.project;
    fixture.add_file_unindexed(project, "src/New.java", "public class New {}\n");

    let new = fixture.handle("src/New.java", "New");
    let h = fixture
        .ctx()
        .hierarchy_for(&new, BuildOptions::default())
        .unwrap();
    assert_eq!(h.root_classes(), &[new]);
}

#[test]
fn progress_sink_can_cancel_the_walk() {
    let fixture = chain_fixture();
    let x = fixture.handle("src/X.java", "X");

    let token = CancellationToken::new();
    let trip = token.clone();
    let sink: Arc<dyn ProgressSink> = Arc::new(move |progress: BuildProgress| {
        if progress.current >= 2 {
            trip.cancel();
        }
    });
    let options = BuildOptions {
        token,
        progress: Some(sink),
        ..BuildOptions::default()
    };

    let err = fixture.ctx().hierarchy_for(&x, options).unwrap_err();
    assert!(err.is_cancelled());
    // The query hold released with the failed build.
    assert!(!fixture.index.in_query(fixture.project));
}

#[test]
fn progress_reports_clamp_to_the_tick_budget() {
    let fixture = chain_fixture();
    let x = fixture.handle("src/X.java", "X");

    let reports: Arc<Mutex<Vec<BuildProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let out = Arc::clone(&reports);
    let sink: Arc<dyn ProgressSink> = Arc::new(move |progress: BuildProgress| {
        out.lock().unwrap().push(progress);
    });
    let options = BuildOptions {
        tick_budget: 1,
        progress: Some(sink),
        ..BuildOptions::default()
    };

    fixture.ctx().hierarchy_for(&x, options).unwrap();
    let reports = reports.lock().unwrap();
    assert!(reports.len() >= 2, "one report per dequeued name");
    assert!(reports.iter().all(|p| p.current <= p.total && p.total == 1));
}

#[test]
fn refresh_does_not_fire_change_listeners() {
    // Progress sinks see the walk; hierarchy listeners only fire on
    // collected changes.
    let fixture = chain_fixture();
    let x = fixture.handle("src/X.java", "X");
    let fired = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&fired);

    let mut h = fixture
        .ctx()
        .hierarchy_for(&x, BuildOptions::default())
        .unwrap();
    h.add_listener(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    h.refresh(&fixture.ctx(), &CancellationToken::new()).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
