use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbor_core::CancellationToken;
use arbor_hierarchy::{BuildOptions, EditNotice, PendingDelta, Region, TypeHierarchy};

use super::fixtures::Fixture;

fn tracked_fixture() -> Fixture {
    Fixture::single_project(&[
        ("src/A.java", "public class A {}\n"),
        ("src/B.java", "public class B extends A {}\n"),
        ("src/C.java", "public class C {}\n"),
    ])
}

fn build_all(fixture: &Fixture) -> TypeHierarchy {
    fixture
        .ctx()
        .hierarchy_in_region(Region::new().directory("src"), BuildOptions::default())
        .unwrap()
}

#[test]
fn supertype_edit_flags_the_type_and_refresh_applies_it() {
    let mut fixture = tracked_fixture();
    let mut h = build_all(&fixture);
    let fired = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&fired);
    h.add_listener(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    fixture.edit_file("src/B.java", "public class B extends C {}\n");
    let b = fixture.handle("src/B.java", "B");
    h.apply_notice(&fixture.ctx(), &EditNotice::changed(b.clone()));

    assert_eq!(
        h.pending_delta(&b),
        Some(PendingDelta::Changed {
            supertype: true,
            modifiers: false,
        })
    );
    assert!(h.needs_refresh());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    h.refresh(&fixture.ctx(), &CancellationToken::new()).unwrap();
    assert!(h.exists());
    assert!(!h.needs_refresh());
    assert_eq!(h.superclass(&b), Some(&fixture.handle("src/C.java", "C")));
}

#[test]
fn unchanged_declarations_drop_their_change_notice() {
    let fixture = tracked_fixture();
    let mut h = build_all(&fixture);
    let b = fixture.handle("src/B.java", "B");

    h.apply_notice(&fixture.ctx(), &EditNotice::changed(b.clone()));
    assert_eq!(h.pending_delta(&b), None);
    assert!(!h.needs_refresh());
}

#[test]
fn modifier_only_edits_flag_modifiers() {
    let mut fixture = tracked_fixture();
    let mut h = build_all(&fixture);

    fixture.edit_file("src/B.java", "public final class B extends A {}\n");
    let b = fixture.handle("src/B.java", "B");
    h.apply_notice(&fixture.ctx(), &EditNotice::changed(b.clone()));

    assert_eq!(
        h.pending_delta(&b),
        Some(PendingDelta::Changed {
            supertype: false,
            modifiers: true,
        })
    );
}

#[test]
fn successive_changes_merge_their_difference_kinds() {
    let mut fixture = tracked_fixture();
    let mut h = build_all(&fixture);
    let b = fixture.handle("src/B.java", "B");

    fixture.edit_file("src/B.java", "public class B extends C {}\n");
    h.apply_notice(&fixture.ctx(), &EditNotice::changed(b.clone()));
    fixture.edit_file("src/B.java", "public final class B extends C {}\n");
    h.apply_notice(&fixture.ctx(), &EditNotice::changed(b.clone()));

    assert_eq!(
        h.pending_delta(&b),
        Some(PendingDelta::Changed {
            supertype: true,
            modifiers: true,
        })
    );
}

#[test]
fn remove_then_identical_readd_nets_to_nothing() {
    let mut fixture = tracked_fixture();
    let mut h = build_all(&fixture);
    let b = fixture.handle("src/B.java", "B");
    let text = "public class B extends A {}\n";

    fixture.remove_file("src/B.java");
    h.apply_notice(&fixture.ctx(), &EditNotice::removed(b.clone()));
    assert_eq!(h.pending_delta(&b), Some(PendingDelta::Removed));

    fixture.edit_file("src/B.java", text);
    h.apply_notice(&fixture.ctx(), &EditNotice::added(b.clone()));
    assert_eq!(h.pending_delta(&b), None);
    assert!(!h.needs_refresh());
}

#[test]
fn working_copies_batch_until_commit() {
    let mut fixture = tracked_fixture();
    let mut h = build_all(&fixture);
    let fired = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&fired);
    h.add_listener(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    fixture.edit_file("src/B.java", "public class B extends C {}\n");
    let b = fixture.handle("src/B.java", "B");
    h.buffer_working_copy("src/B.java", EditNotice::changed(b.clone()));
    h.buffer_working_copy("src/B.java", EditNotice::changed(b.clone()));
    assert!(!h.needs_refresh());
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    h.commit_working_copy(&fixture.ctx(), "src/B.java".as_ref());
    assert!(h.needs_refresh());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn discarded_working_copies_never_apply() {
    let mut fixture = tracked_fixture();
    let mut h = build_all(&fixture);

    fixture.edit_file("src/B.java", "public class B extends C {}\n");
    let b = fixture.handle("src/B.java", "B");
    h.buffer_working_copy("src/B.java", EditNotice::changed(b));
    h.discard_working_copy("src/B.java".as_ref());
    h.commit_working_copy(&fixture.ctx(), "src/B.java".as_ref());

    assert!(!h.needs_refresh());
    assert_eq!(h.pending_count(), 0);
}

#[test]
fn a_declaration_matching_a_missing_name_is_relevant() {
    let mut fixture = Fixture::single_project(&[("src/C.java", "class C extends D {}\n")]);
    let mut h = fixture
        .ctx()
        .hierarchy_in_region(Region::new().file("src/C.java"), BuildOptions::default())
        .unwrap();
    assert!(h.missing_types().contains("D"));

    fixture.add_file(fixture.project, "src/D.java", "class D {}\n");
    let d = fixture.handle("src/D.java", "D");
    h.apply_notice(&fixture.ctx(), &EditNotice::added(d.clone()));
    assert_eq!(h.pending_delta(&d), Some(PendingDelta::Added));

    h.refresh(&fixture.ctx(), &CancellationToken::new()).unwrap();
    let c = fixture.handle("src/C.java", "C");
    assert_eq!(h.superclass(&c), Some(&d));
    assert!(h.missing_types().is_empty());
    assert!(!h.needs_refresh());
}

#[test]
fn failed_refresh_keeps_pending_changes_and_clears_exists() {
    let mut fixture = tracked_fixture();
    let mut h = build_all(&fixture);

    fixture.edit_file("src/B.java", "public class B extends C {}\n");
    let b = fixture.handle("src/B.java", "B");
    h.apply_notice(&fixture.ctx(), &EditNotice::changed(b.clone()));
    assert!(h.needs_refresh());

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = h.refresh(&fixture.ctx(), &cancelled).unwrap_err();
    assert!(err.is_cancelled());
    assert!(!h.exists());
    assert!(h.needs_refresh(), "failed refreshes keep the pending set");

    h.refresh(&fixture.ctx(), &CancellationToken::new()).unwrap();
    assert!(h.exists());
    assert!(!h.needs_refresh());
    assert_eq!(h.superclass(&b), Some(&fixture.handle("src/C.java", "C")));
}

#[test]
fn shadowing_declarations_are_relevant() {
    let fixture = tracked_fixture();
    let mut h = build_all(&fixture);

    // A new declaration elsewhere with a cached superclass's simple name
    // could capture the reference on the next build.
    let shadow = fixture.handle("other/A.java", "other.A");
    h.apply_notice(&fixture.ctx(), &EditNotice::added(shadow.clone()));
    assert_eq!(h.pending_delta(&shadow), Some(PendingDelta::Added));
}
