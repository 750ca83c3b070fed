//! Synthesize against one page, resolve against a re-rendered copy.

use action_locator::{
    DefaultElementResolver, ElementResolver, Locator, ResolveRequest, ResolveStrategy,
    SelectorSynthesizer,
};
use dom_snapshot::Document;
use serde_json::json;

fn page(ids: [&str; 3], extra_banner: bool) -> Document {
    let mut body = vec![];
    if extra_banner {
        body.push(json!({"tag": "div", "attributes": {"class": "banner"}, "text": "Sale!"}));
    }
    body.push(json!({"tag": "form", "children": [
        {"tag": "input", "attributes": {"type": "radio", "name": "plan", "value": "basic", "id": ids[0]}},
        {"tag": "input", "attributes": {"type": "radio", "name": "plan", "value": "pro", "id": ids[1]}},
        {"tag": "input", "attributes": {"type": "radio", "name": "plan", "value": "enterprise", "id": ids[2]}},
        {"tag": "div", "attributes": {"id": "summary-panel"}},
        {"tag": "div", "attributes": {"id": "{{vm.total}}"}, "text": "Total: 12"},
        {"tag": "button", "attributes": {"class": "ng-pristine"}, "text": "Continue"}
    ]}));
    let snapshot = json!({
        "url": "https://billing.example.com/plans",
        "root": {"tag": "html", "children": [{"tag": "body", "children": body}]}
    });
    Document::from_json(&snapshot.to_string()).unwrap()
}

fn by_value(doc: &Document, value: &str) -> dom_snapshot::NodeId {
    doc.query_selector(&format!("input[value=\"{}\"]", value))
        .unwrap()
        .unwrap()
}

#[test]
fn test_radio_resolves_after_ids_regenerate() {
    let recorded = page(["r-101", "r-102", "r-103"], false);
    let replayed = page(["r-555", "r-556", "r-557"], true);
    let synthesizer = SelectorSynthesizer::default();

    let locator = synthesizer
        .synthesize(&recorded, by_value(&recorded, "pro"))
        .unwrap();
    assert_eq!(
        locator.to_string(),
        r#"input[type="radio"][name="plan"][value="pro"]"#
    );

    let resolver = DefaultElementResolver::default();
    let result = resolver
        .resolve(&replayed, &ResolveRequest::new(&locator.to_string()))
        .unwrap();
    assert_eq!(result.node, by_value(&replayed, "pro"));
    assert_eq!(replayed.query_selector_all(&locator.to_string()).unwrap().len(), 1);
}

#[test]
fn test_stable_id_round_trips() {
    let doc = page(["a", "b", "c"], false);
    let panel = doc.element_by_id("summary-panel").unwrap();
    let locator = SelectorSynthesizer::default().synthesize(&doc, panel).unwrap();
    assert_eq!(locator, Locator::css("#summary-panel"));
    let result = DefaultElementResolver::default()
        .resolve(&doc, &ResolveRequest::new(&locator.to_string()))
        .unwrap();
    assert_eq!(result.node, panel);
}

#[test]
fn test_generated_id_never_used() {
    let doc = page(["a", "b", "c"], false);
    let total = doc.element_by_id("{{vm.total}}").unwrap();
    let locator = SelectorSynthesizer::default().synthesize(&doc, total).unwrap();
    assert!(!locator.to_string().starts_with('#'));
    assert!(!locator.to_string().contains("vm.total"));
}

#[test]
fn test_long_id_never_used() {
    let long_id = "x".repeat(60);
    let doc = page([long_id.as_str(), "b", "c"], false);
    let node = doc.element_by_id(&long_id).unwrap();
    let locator = SelectorSynthesizer::default().synthesize(&doc, node).unwrap();
    assert!(!locator.to_string().contains(&long_id));
}

#[test]
fn test_text_anchor_survives_reorder() {
    let recorded = page(["a", "b", "c"], false);
    let replayed = page(["a", "b", "c"], true);
    let button = recorded.elements_by_tag("button")[0];
    let locator = SelectorSynthesizer::default().synthesize(&recorded, button).unwrap();
    assert!(matches!(locator, Locator::TextMatch { exact: true, .. }));

    let result = DefaultElementResolver::default()
        .resolve(&replayed, &ResolveRequest::new(&locator.to_string()))
        .unwrap();
    assert_eq!(result.node, replayed.elements_by_tag("button")[0]);
    assert_eq!(result.strategy, ResolveStrategy::XPath);
}

#[test]
fn test_structural_path_survives_sibling_insert() {
    let recorded = page(["a", "b", "c"], false);
    let form = recorded.elements_by_tag("form")[0];
    let locator = SelectorSynthesizer::default().synthesize(&recorded, form).unwrap();
    assert_eq!(locator.to_string(), "body > form");

    let replayed = page(["a", "b", "c"], true);
    let result = DefaultElementResolver::default()
        .resolve(&replayed, &ResolveRequest::new(&locator.to_string()))
        .unwrap();
    assert_eq!(result.node, replayed.elements_by_tag("form")[0]);
}
