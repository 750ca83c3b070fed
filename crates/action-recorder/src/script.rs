//! Scripted interactions
//!
//! Drives a [`Recorder`] from a list of timed user steps against a page,
//! applying each step's user-side change before notifying the recorder the
//! way a browser would.

use std::sync::Arc;

use action_locator::SelectorSynthesizer;
use dom_snapshot::{DomEvent, Document, NodeId};
use domreplay_scenario_store::Action;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::ManualClock;
use crate::errors::RecorderError;
use crate::recorder::{InteractionEvent, InteractionKind, Recorder};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScriptOp {
    Click,
    Input {
        value: String,
    },
    Select {
        #[serde(default)]
        index: Option<usize>,
        #[serde(default)]
        value: Option<String>,
    },
    Check {
        checked: bool,
    },
    Key {
        key: String,
    },
}

/// One user step; `target` is a CSS selector on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub at_ms: u64,
    pub target: String,
    #[serde(flatten)]
    pub op: ScriptOp,
}

pub fn parse_script(raw: &str) -> Result<Vec<ScriptStep>, RecorderError> {
    serde_json::from_str(raw).map_err(|e| RecorderError::InvalidScript(e.to_string()))
}

/// Recorder on a virtual clock positioned by each step's `at_ms`
pub struct ScriptRecorder {
    recorder: Recorder,
    clock: Arc<ManualClock>,
}

impl ScriptRecorder {
    pub fn new(synthesizer: SelectorSynthesizer, epoch_base: i64) -> Self {
        let clock = Arc::new(ManualClock::new(epoch_base));
        Self {
            recorder: Recorder::new(synthesizer, clock.clone()),
            clock,
        }
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Runs every step in order and returns the recorded actions.
    pub fn run(
        &self,
        doc: &mut Document,
        steps: &[ScriptStep],
    ) -> Result<Vec<Action>, RecorderError> {
        self.recorder.start();
        let outcome = self.feed(doc, steps);
        let actions = self.recorder.stop();
        outcome.map(|_| actions)
    }

    fn feed(&self, doc: &mut Document, steps: &[ScriptStep]) -> Result<(), RecorderError> {
        for (index, step) in steps.iter().enumerate() {
            self.clock.set(step.at_ms);
            let target = doc
                .query_selector(&step.target)?
                .ok_or_else(|| RecorderError::TargetNotFound(step.target.clone()))?;
            let events = apply_user_step(doc, target, &step.op)?;
            debug!(step = index, target = %step.target, events = events.len(), "Script step applied");
            for kind in events {
                self.recorder
                    .record(doc, &InteractionEvent::new(kind, target))?;
            }
        }
        Ok(())
    }
}

/// Applies the user-side change and returns the notifications the page
/// would deliver to the recorder, in order.
fn apply_user_step(
    doc: &mut Document,
    target: NodeId,
    op: &ScriptOp,
) -> Result<Vec<InteractionKind>, RecorderError> {
    let toggled = |doc: &mut Document| -> Result<Vec<InteractionKind>, RecorderError> {
        let before = doc.is_checked(target);
        doc.click(target)?;
        let mut events = vec![InteractionKind::Click];
        if doc.element(target)?.is_toggle() && doc.is_checked(target) != before {
            events.push(InteractionKind::Change);
        }
        Ok(events)
    };

    match op {
        ScriptOp::Click => toggled(doc),
        ScriptOp::Input { value } => {
            doc.focus(target)?;
            doc.set_value(target, value)?;
            doc.dispatch(target, DomEvent::Input)?;
            Ok(vec![InteractionKind::Input])
        }
        ScriptOp::Select { index, value } => {
            match (index, value) {
                (Some(i), _) => doc.set_selected_index(target, *i)?,
                (None, Some(v)) => doc.set_value(target, v)?,
                (None, None) => {
                    return Err(RecorderError::InvalidScript(
                        "select step needs an index or a value".to_string(),
                    ))
                }
            }
            doc.dispatch(target, DomEvent::Change)?;
            Ok(vec![InteractionKind::Change])
        }
        ScriptOp::Check { checked } => {
            if doc.is_checked(target) == *checked {
                Ok(Vec::new())
            } else {
                toggled(doc)
            }
        }
        ScriptOp::Key { key } => {
            doc.dispatch(target, DomEvent::KeyDown { key: key.clone() })?;
            Ok(vec![InteractionKind::KeyDown { key: key.clone() }])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domreplay_scenario_store::{ActionKind, ActionPayload};

    fn form() -> Document {
        let mut doc = Document::new();
        let html = doc.create_element(doc.root(), "html").unwrap();
        let body = doc.create_element(html, "body").unwrap();
        doc.create_element_with(body, "input", &[("name", "email")]).unwrap();
        doc.create_element_with(body, "input", &[("type", "checkbox"), ("name", "terms")])
            .unwrap();
        let submit = doc.create_element_with(body, "button", &[("class", "primary")]).unwrap();
        doc.append_text(submit, "Sign up").unwrap();
        doc
    }

    #[test]
    fn test_parse_script_steps() {
        let steps = parse_script(
            r##"[
                {"at_ms": 0, "kind": "input", "target": "input[name=email]", "value": "a@b.c"},
                {"at_ms": 400, "kind": "key", "target": "input[name=email]", "key": "Tab"},
                {"at_ms": 900, "kind": "select", "target": "#c", "index": 2}
            ]"##,
        )
        .unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[2].op,
            ScriptOp::Select {
                index: Some(2),
                value: None
            }
        );
        assert!(matches!(
            parse_script(r#"[{"at_ms": 0, "kind": "hover", "target": "a"}]"#),
            Err(RecorderError::InvalidScript(_))
        ));
    }

    #[test]
    fn test_script_records_form_fill() {
        let mut doc = form();
        let steps = parse_script(
            r#"[
                {"at_ms": 100, "kind": "input", "target": "input[name=email]", "value": "a@b.c"},
                {"at_ms": 700, "kind": "click", "target": "input[name=terms]"},
                {"at_ms": 1500, "kind": "click", "target": "button.primary"}
            ]"#,
        )
        .unwrap();
        let actions = ScriptRecorder::new(SelectorSynthesizer::default(), 0)
            .run(&mut doc, &steps)
            .unwrap();

        let kinds: Vec<ActionKind> = actions.iter().map(|a| a.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::TextInput,
                ActionKind::Click,
                ActionKind::Checkbox,
                ActionKind::Click
            ]
        );
        let delays: Vec<u64> = actions.iter().map(|a| a.delay_millis).collect();
        assert_eq!(delays, vec![0, 600, 0, 800]);
        assert_eq!(actions[2].payload, ActionPayload::Checkbox { checked: true });
        assert_eq!(actions[3].auxiliary_hint.as_deref(), Some("Sign up"));
    }

    #[test]
    fn test_missing_target_stops_and_disarms() {
        let mut doc = form();
        let steps = parse_script(r##"[{"at_ms": 0, "kind": "click", "target": "#nope"}]"##).unwrap();
        let script = ScriptRecorder::new(SelectorSynthesizer::default(), 0);
        let err = script.run(&mut doc, &steps).unwrap_err();
        assert_eq!(err, RecorderError::TargetNotFound("#nope".to_string()));
        assert!(err.is_script_error());
        assert!(!script.recorder().is_armed());
    }
}
