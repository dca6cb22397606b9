use arbor_core::{CancellationToken, Modifiers};
use arbor_hierarchy::{BuildOptions, EditNotice, HierarchyError, Region};
use arbor_project::ClasspathStubs;

use super::fixtures::Fixture;

#[test]
fn two_member_region_links_subclass_to_root() {
    let fixture = Fixture::single_project(&[
        ("src/A.java", "public class A {}\n"),
        ("src/B.java", "public class B extends A {}\n"),
        ("src/C.java", "public class C extends A {}\n"),
    ]);
    let region = Region::new().file("src/A.java").file("src/B.java");
    let h = fixture
        .ctx()
        .hierarchy_in_region(region, BuildOptions::default())
        .unwrap();

    let a = fixture.handle("src/A.java", "A");
    let b = fixture.handle("src/B.java", "B");
    assert!(h.exists());
    assert_eq!(h.root_classes(), &[a.clone()]);
    assert_eq!(h.superclass(&b), Some(&a));
    assert!(!h.contains(&fixture.handle("src/C.java", "C")));
    assert!(h.missing_types().is_empty());
}

#[test]
fn extends_object_resolves_to_a_root_through_the_stubs() {
    let fixture = Fixture::single_project(&[
        ("src/A.java", "public class A extends Object {}\n"),
        ("src/B.java", "public class B extends A {}\n"),
    ]);
    let h = fixture
        .ctx()
        .hierarchy_in_region(Region::new().directory("src"), BuildOptions::default())
        .unwrap();

    let a = fixture.handle("src/A.java", "A");
    let b = fixture.handle("src/B.java", "B");
    assert_eq!(h.root_classes(), &[a.clone()]);
    assert_eq!(h.superclass(&a), None);
    assert_eq!(h.subclasses(&a), vec![b]);
    assert!(h.missing_types().is_empty());
}

#[test]
fn a_source_universal_root_binds_only_its_exact_spelling() {
    let fixture = Fixture::single_project(&[
        (
            "jdk/Object.java",
            "package java.lang; public class Object {}\n",
        ),
        ("src/A.java", "class A extends Object {}\n"),
        ("src/F.java", "class F extends OBJECT {}\n"),
    ]);
    let region = Region::new()
        .file("jdk/Object.java")
        .file("src/A.java")
        .file("src/F.java");
    let h = fixture
        .ctx()
        .hierarchy_in_region(region, BuildOptions::default())
        .unwrap();

    let object = fixture.handle("jdk/Object.java", "java.lang.Object");
    let a = fixture.handle("src/A.java", "A");
    let f = fixture.handle("src/F.java", "F");
    assert_eq!(h.superclass(&a), Some(&object));
    assert_eq!(h.superclass(&f), None);
    assert!(h.missing_types().contains("OBJECT"));
    assert_eq!(h.root_classes(), &[f, object]);
}

#[test]
fn unicode_supertype_references_resolve_or_degrade_to_missing() {
    let fixture = Fixture::single_project(&[
        ("src/P.java", "package ä; class Ö {}\n"),
        ("src/B.java", "class B extends ä.Ö {}\n"),
        ("src/C.java", "class C extends x.Ö {}\n"),
    ]);
    let h = fixture
        .ctx()
        .hierarchy_in_region(Region::new().directory("src"), BuildOptions::default())
        .unwrap();

    let o = fixture.handle("src/P.java", "ä.Ö");
    let b = fixture.handle("src/B.java", "B");
    let c = fixture.handle("src/C.java", "C");
    assert_eq!(h.superclass(&b), Some(&o));
    assert!(h.missing_types().contains("Ö"));
    assert_eq!(h.root_classes(), &[o, c]);
}

#[test]
fn unresolvable_supertype_is_recorded_and_the_subclass_roots() {
    let fixture = Fixture::single_project(&[("src/C.java", "class C extends D {}\n")]);
    let h = fixture
        .ctx()
        .hierarchy_in_region(Region::new().file("src/C.java"), BuildOptions::default())
        .unwrap();

    let c = fixture.handle("src/C.java", "C");
    assert!(h.contains(&c));
    assert_eq!(h.root_classes(), &[c]);
    assert!(h.missing_types().contains("D"));
}

#[test]
fn branches_without_region_members_are_pruned() {
    let fixture = Fixture::single_project(&[
        (
            "lib/Base.java",
            "public class Base {}\nclass Stray extends Base {}\n",
        ),
        ("src/Kept.java", "public class Kept extends Base {}\n"),
    ]);
    let h = fixture
        .ctx()
        .hierarchy_in_region(Region::new().directory("src"), BuildOptions::default())
        .unwrap();

    let base = fixture.handle("lib/Base.java", "Base");
    let kept = fixture.handle("src/Kept.java", "Kept");
    // Base is outside the region but anchors a region member.
    assert_eq!(h.root_classes(), &[base.clone()]);
    assert_eq!(h.subclasses(&base), vec![kept]);
    assert!(!h.contains(&fixture.handle("lib/Base.java", "Stray")));
}

#[test]
fn cross_project_supertypes_resolve_through_earlier_passes() {
    let mut fixture = Fixture::empty();
    let util = fixture.project;
    let app = fixture.add_project("app", &[util]);
    fixture.add_file(util, "util/Base.java", "package util; public class Base {}\n");
    fixture.add_file(
        app,
        "app/Child.java",
        "package app;\nimport util.Base;\npublic class Child extends Base {}\n",
    );

    // Entry order does not matter; passes run providers first.
    let region = Region::new().project(app).project(util);
    let h = fixture
        .ctx()
        .hierarchy_in_region(region, BuildOptions::default())
        .unwrap();

    let base = fixture.handle("util/Base.java", "util.Base");
    let child = fixture.handle("app/Child.java", "app.Child");
    assert_eq!(h.superclass(&child), Some(&base));
    assert_eq!(h.subclasses(&base), vec![child]);
}

#[test]
fn unknown_region_entries_are_skipped() {
    let fixture = Fixture::single_project(&[("src/A.java", "public class A {}\n")]);
    let region = Region::new()
        .file("no/Such.java")
        .directory("nowhere")
        .file("src/A.java");
    let h = fixture
        .ctx()
        .hierarchy_in_region(region, BuildOptions::default())
        .unwrap();
    assert!(h.contains(&fixture.handle("src/A.java", "A")));
}

#[test]
fn unusable_binding_environment_fails_the_build() {
    let mut fixture = Fixture::single_project(&[("src/A.java", "class A {}\n")]);
    fixture.stubs = ClasspathStubs::new();

    let err = fixture
        .ctx()
        .hierarchy_in_region(Region::new().file("src/A.java"), BuildOptions::default())
        .unwrap_err();
    assert!(matches!(err, HierarchyError::Environment(_)));
}

#[test]
fn a_source_universal_root_satisfies_the_environment_check() {
    let mut fixture = Fixture::single_project(&[
        ("src/A.java", "class A {}\n"),
        (
            "jdk/Object.java",
            "package java.lang; public class Object {}\n",
        ),
    ]);
    fixture.stubs = ClasspathStubs::new();

    let h = fixture
        .ctx()
        .hierarchy_in_region(Region::new().file("src/A.java"), BuildOptions::default())
        .unwrap();
    assert!(h.exists());
    assert!(h.contains(&fixture.handle("src/A.java", "A")));
}

#[test]
fn repeated_refreshes_without_edits_agree() {
    let mut fixture = Fixture::single_project(&[
        ("src/A.java", "public class A {}\n"),
        ("src/B.java", "public class B extends A {}\n"),
    ]);
    let mut h = fixture
        .ctx()
        .hierarchy_in_region(Region::new().directory("src"), BuildOptions::default())
        .unwrap();

    fixture.edit_file("src/B.java", "public final class B extends A {}\n");
    let b = fixture.handle("src/B.java", "B");
    h.apply_notice(&fixture.ctx(), &EditNotice::changed(b.clone()));
    assert!(h.needs_refresh());

    h.refresh(&fixture.ctx(), &CancellationToken::new()).unwrap();
    assert!(!h.needs_refresh());
    assert_eq!(h.flags(&b), Some(Modifiers::PUBLIC | Modifiers::FINAL));
    let classes = h.all_classes();
    let supers: Vec<_> = classes.iter().map(|t| h.superclass(t).cloned()).collect();
    let roots = h.root_classes().to_vec();

    h.refresh(&fixture.ctx(), &CancellationToken::new()).unwrap();
    assert!(!h.needs_refresh());
    assert_eq!(h.all_classes(), classes);
    let supers_again: Vec<_> = classes.iter().map(|t| h.superclass(t).cloned()).collect();
    assert_eq!(supers_again, supers);
    assert_eq!(h.root_classes(), roots);
}

#[test]
fn cancelled_region_build_returns_no_hierarchy() {
    let fixture = Fixture::single_project(&[("src/A.java", "public class A {}\n")]);
    let token = CancellationToken::new();
    token.cancel();
    let options = BuildOptions {
        token,
        ..BuildOptions::default()
    };
    let err = fixture
        .ctx()
        .hierarchy_in_region(Region::new().file("src/A.java"), options)
        .unwrap_err();
    assert!(err.is_cancelled());
}
