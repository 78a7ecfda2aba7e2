//! Fragment-targeted patch protocol against a live component.

mod common;

use common::{RecordingHooks, by_id, runtime_with_clock};
use dom::Document;

fn dashboard() -> Document {
    Document::parse(
        r#"<div data-tw-root data-tw-component="dash" data-tw-id="d-1">
             <button id="go" data-tw-action="refresh">Refresh</button>
             <div id="stats">old-stats</div>
             <ul id="log"><li>first</li></ul>
           </div>"#,
    )
}

#[test]
fn two_targeted_markers_mutate_twice_without_touching_the_root() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = dashboard();
    let root = doc.first_element_child(doc.root()).unwrap();
    let button = by_id(&doc, "go");

    probe.respond_html(
        r##"<template data-tw-fragment="#stats"><div id="stats">new-stats</div></template>
           <template data-tw-fragment="#log" data-tw-swap="beforeend"><li>second</li></template>"##,
    );
    rt.invoke(&mut doc, button, "refresh", None);

    assert!(doc.contains(root), "root must not be replaced");
    assert_eq!(doc.text_content(by_id(&doc, "stats")), "new-stats");
    let log = by_id(&doc, "log");
    assert_eq!(doc.children(log).len(), 2);
    assert_eq!(doc.text_content(log), "firstsecond");
}

#[test]
fn inner_swap_replaces_only_children() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = dashboard();
    let button = by_id(&doc, "go");
    let log = by_id(&doc, "log");

    probe.respond_html(
        r##"<template data-tw-fragment="#log" data-tw-swap="inner"><ul><li>a</li><li>b</li></ul></template>"##,
    );
    rt.invoke(&mut doc, button, "refresh", None);

    assert!(doc.contains(log), "inner swap keeps the target node");
    assert_eq!(doc.children(log).len(), 2);
    assert_eq!(doc.text_content(log), "ab");
}

#[test]
fn full_component_marker_applies_first_then_selectors_use_the_new_root() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = dashboard();
    let old_root = doc.first_element_child(doc.root()).unwrap();
    let button = by_id(&doc, "go");

    probe.respond_html(
        r##"<template data-tw-component="dash">
             <div data-tw-root data-tw-component="dash" data-tw-id="d-1">
               <div id="stats">rebuilt</div>
             </div>
           </template>
           <template data-tw-fragment="#stats" data-tw-scope="dash" data-tw-scope-id="d-1">
             <div id="stats">patched-after-rebuild</div>
           </template>"##,
    );
    rt.invoke(&mut doc, button, "refresh", None);

    assert!(!doc.contains(old_root));
    assert_eq!(
        doc.text_content(by_id(&doc, "stats")),
        "patched-after-rebuild"
    );
}

#[test]
fn scope_mismatch_skips_that_marker_only() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = dashboard();
    let button = by_id(&doc, "go");

    probe.respond_html(
        r##"<template data-tw-fragment="#stats" data-tw-scope="other-kind"><div id="stats">wrong</div></template>
           <template data-tw-fragment="#log" data-tw-swap="inner"><ul><li>kept</li></ul></template>"##,
    );
    rt.invoke(&mut doc, button, "refresh", None);

    // mismatched marker skipped, valid one applied, no fallback replacement
    assert_eq!(doc.text_content(by_id(&doc, "stats")), "old-stats");
    assert_eq!(doc.text_content(by_id(&doc, "log")), "kept");
}

#[test]
fn zero_applied_markers_falls_back_to_full_replacement() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let hooks = RecordingHooks::default();
    rt.set_hooks(Box::new(hooks.clone()));
    let mut doc = dashboard();
    let old_root = doc.first_element_child(doc.root()).unwrap();
    let button = by_id(&doc, "go");

    probe.respond_html(
        r##"<template data-tw-fragment="#does-not-exist">
             <div data-tw-root data-tw-component="dash" data-tw-id="d-1">fallback</div>
           </template>"##,
    );
    rt.invoke(&mut doc, button, "refresh", None);

    assert!(!doc.contains(old_root));
    let new_root = doc.first_element_child(doc.root()).unwrap();
    assert_eq!(doc.text_content(new_root), "fallback");
    assert!(*hooks.wire_refreshes.borrow() >= 1);
}

#[test]
fn unknown_swap_mode_is_skipped_with_the_rest_applied() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = dashboard();
    let button = by_id(&doc, "go");

    probe.respond_html(
        r##"<template data-tw-fragment="#stats" data-tw-swap="sideways"><div>never</div></template>
           <template data-tw-fragment="#stats"><div id="stats">applied</div></template>"##,
    );
    rt.invoke(&mut doc, button, "refresh", None);
    assert_eq!(doc.text_content(by_id(&doc, "stats")), "applied");
}

#[test]
fn adjacent_swaps_insert_without_removing_the_target() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = dashboard();
    let button = by_id(&doc, "go");

    probe.respond_html(
        r##"<template data-tw-fragment="#stats" data-tw-swap="beforebegin"><div id="before">b</div></template>
           <template data-tw-fragment="#stats" data-tw-swap="afterend"><div id="after">a</div></template>"##,
    );
    rt.invoke(&mut doc, button, "refresh", None);

    let root = doc.first_element_child(doc.root()).unwrap();
    let stats = by_id(&doc, "stats");
    let children = doc.children(root).to_vec();
    let stats_index = children.iter().position(|&c| c == stats).unwrap();
    assert_eq!(children[stats_index - 1], by_id(&doc, "before"));
    assert_eq!(children[stats_index + 1], by_id(&doc, "after"));
    assert_eq!(doc.text_content(stats), "old-stats");
}

#[test]
fn patched_fragments_report_to_the_script_hook() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let hooks = RecordingHooks::default();
    rt.set_hooks(Box::new(hooks.clone()));
    let mut doc = dashboard();
    let button = by_id(&doc, "go");

    probe.respond_html(
        r##"<template data-tw-fragment="#stats"><div id="stats">x</div></template>
           <template data-tw-fragment="#log" data-tw-swap="inner"><ul><li>y</li></ul></template>"##,
    );
    rt.invoke(&mut doc, button, "refresh", None);
    assert_eq!(*hooks.scripted_inserts.borrow(), 2);
}
