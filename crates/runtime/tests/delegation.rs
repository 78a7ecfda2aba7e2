//! Generic click/submit delegation for elements without trigger bindings.

mod common;

use common::{by_id, runtime_with_clock};
use dom::Document;

#[test]
fn action_clicks_invoke_through_delegation() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = Document::parse(
        r#"<div data-tw-root data-tw-component="counter" data-tw-id="c-1">
             <button data-tw-action="step"><span id="inner">+1</span></button>
           </div>"#,
    );
    // the click lands on a child of the action element and bubbles
    let inner = by_id(&doc, "inner");

    let outcome = rt.fire_event(&mut doc, inner, "click");
    assert!(outcome.default_prevented);
    assert!(!outcome.handled_by_trigger);
    assert_eq!(probe.call_count(), 1);
    assert_eq!(probe.calls()[0].action, "step");
    assert_eq!(probe.calls()[0].trigger_event, None);
}

#[test]
fn clicks_outside_any_action_element_are_ignored() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = Document::parse(
        r#"<div data-tw-root data-tw-component="counter" data-tw-id="c-1">
             <span id="plain">text</span>
           </div>"#,
    );
    let plain = by_id(&doc, "plain");
    let outcome = rt.fire_event(&mut doc, plain, "click");
    assert!(!outcome.default_prevented);
    assert_eq!(probe.call_count(), 0);
}

#[test]
fn form_submits_collect_the_form_and_use_the_submitter_action() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = Document::parse(
        r#"<div data-tw-root data-tw-component="login" data-tw-id="l-1">
             <form id="f">
               <input name="user" value="ada">
               <button type="submit" name="intent" value="signin" data-tw-action="login">Sign in</button>
             </form>
           </div>"#,
    );
    let form = by_id(&doc, "f");

    let outcome = rt.fire_event(&mut doc, form, "submit");
    assert!(outcome.default_prevented);
    assert_eq!(probe.call_count(), 1);

    let payload = &probe.calls()[0];
    assert_eq!(payload.action, "login");
    assert!(payload.fields.contains(&("user".into(), "ada".into())));
    assert!(payload.fields.contains(&("intent".into(), "signin".into())));
}

#[test]
fn submit_buttons_defer_their_click_to_the_submit_event() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = Document::parse(
        r#"<div data-tw-root data-tw-component="login" data-tw-id="l-1">
             <form>
               <button id="go" type="submit" data-tw-action="login">Sign in</button>
             </form>
           </div>"#,
    );
    let button = by_id(&doc, "go");

    let outcome = rt.fire_event(&mut doc, button, "click");
    assert!(!outcome.default_prevented, "the click must fall through to submit");
    assert_eq!(probe.call_count(), 0);
}

#[test]
fn submits_without_component_identity_fall_through() {
    let (mut rt, probe, _clock) = runtime_with_clock();
    let mut doc = Document::parse(
        r#"<form id="f"><input name="x" value="1"></form>"#,
    );
    let form = by_id(&doc, "f");
    let outcome = rt.fire_event(&mut doc, form, "submit");
    assert!(!outcome.default_prevented);
    assert_eq!(probe.call_count(), 0);
}
