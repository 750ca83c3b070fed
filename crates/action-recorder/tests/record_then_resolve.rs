use std::sync::Arc;

use action_locator::{DefaultElementResolver, ElementResolver, ResolveRequest, SelectorSynthesizer};
use action_recorder::{InteractionEvent, InteractionKind, ManualClock, Recorder};
use dom_snapshot::{Document, NodeId};

fn plans(doc: &mut Document, ids: [&str; 3]) -> Vec<NodeId> {
    let html = doc.create_element(doc.root(), "html").unwrap();
    let body = doc.create_element(html, "body").unwrap();
    ["basic", "pro", "enterprise"]
        .iter()
        .zip(ids)
        .map(|(value, id)| {
            doc.create_element_with(
                body,
                "input",
                &[("type", "radio"), ("name", "plan"), ("value", *value), ("id", id)],
            )
            .unwrap()
        })
        .collect()
}

#[test]
fn test_recorded_radio_resolves_on_rerendered_page() {
    let mut recorded_page = Document::new();
    let radios = plans(&mut recorded_page, ["r-17", "r-18", "r-19"]);
    recorded_page.click(radios[1]).unwrap();

    let recorder = Recorder::new(SelectorSynthesizer::default(), Arc::new(ManualClock::new(0)));
    recorder.start();
    recorder
        .record(&recorded_page, &InteractionEvent::new(InteractionKind::Change, radios[1]))
        .unwrap();
    let actions = recorder.stop();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].locator, r#"input[type="radio"][name="plan"][value="pro"]"#);

    let mut replay_page = Document::new();
    let fresh = plans(&mut replay_page, ["a1", "b2", "c3"]);
    let request = ResolveRequest::new(&actions[0].locator)
        .with_tag(actions[0].element_tag.as_deref());
    let result = DefaultElementResolver::default()
        .resolve(&replay_page, &request)
        .unwrap();
    assert_eq!(result.node, fresh[1]);
}
