//! Recorder state machine
//!
//! `Idle --start--> Armed --stop--> Idle`. While armed, each qualifying
//! interaction is turned into an [`Action`] carrying the synthesized locator
//! and the delay since the previous recorded action.

use std::sync::Arc;

use action_locator::SelectorSynthesizer;
use dom_snapshot::{Document, NodeId};
use domreplay_core_types::SessionId;
use domreplay_scenario_store::{Action, ActionPayload};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::errors::RecorderError;

/// Keys recorded from keydown; ordinary typing is captured by `input`.
pub const RECORDED_KEYS: [&str; 5] = ["Enter", "Tab", "Escape", "Backspace", "Delete"];

/// Length of the captured text hint, in characters
pub const HINT_LEN: usize = 50;

/// Page notifications the recorder listens to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InteractionKind {
    Click,
    Input,
    Change,
    KeyDown { key: String },
}

/// A notification observed on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub target: NodeId,
}

impl InteractionEvent {
    /// Notification of `kind` targeting `target`
    pub fn new(kind: InteractionKind, target: NodeId) -> Self {
        Self { kind, target }
    }
}

/// Whether interactions are currently captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Armed { session_id: SessionId },
}

/// Snapshot answered to a status query: armed flag and buffered action count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecorderStatus {
    pub armed: bool,
    pub count: usize,
}

#[derive(Debug)]
struct Session {
    state: RecorderState,
    buffer: Vec<Action>,
    last_event_ms: Option<u64>,
}

impl Session {
    fn idle() -> Self {
        Self {
            state: RecorderState::Idle,
            buffer: Vec::new(),
            last_event_ms: None,
        }
    }
}

/// Turns page interactions into timed actions while armed.
///
/// One session at a time; the buffer is owned by the recorder until
/// [`stop`](Recorder::stop) hands it over.
pub struct Recorder {
    synthesizer: SelectorSynthesizer,
    clock: Arc<dyn Clock>,
    session: Mutex<Session>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(SelectorSynthesizer::default(), Arc::new(SystemClock::default()))
    }
}

impl Recorder {
    /// Idle recorder using `synthesizer` for locators and `clock` for delays
    pub fn new(synthesizer: SelectorSynthesizer, clock: Arc<dyn Clock>) -> Self {
        Self {
            synthesizer,
            clock,
            session: Mutex::new(Session::idle()),
        }
    }

    /// Arms the recorder with an empty buffer. Starting while armed discards
    /// the running session.
    pub fn start(&self) -> SessionId {
        let mut session = self.session.lock();
        if let RecorderState::Armed { session_id } = &session.state {
            warn!(
                session = %session_id,
                discarded = session.buffer.len(),
                "Recorder restarted while armed"
            );
        }
        let session_id = SessionId::new();
        *session = Session {
            state: RecorderState::Armed {
                session_id: session_id.clone(),
            },
            ..Session::idle()
        };
        info!(session = %session_id, "Recording started");
        session_id
    }

    /// Disarms and hands the buffer to the caller. Idle recorders return an
    /// empty list.
    pub fn stop(&self) -> Vec<Action> {
        let mut session = self.session.lock();
        let taken = std::mem::replace(&mut *session, Session::idle());
        if let RecorderState::Armed { session_id } = taken.state {
            info!(session = %session_id, actions = taken.buffer.len(), "Recording stopped");
        }
        taken.buffer
    }

    /// Current state, including the session id while armed
    pub fn state(&self) -> RecorderState {
        self.session.lock().state.clone()
    }

    /// Whether interactions are being captured
    pub fn is_armed(&self) -> bool {
        matches!(self.session.lock().state, RecorderState::Armed { .. })
    }

    /// Actions buffered in the running session
    pub fn count(&self) -> usize {
        self.session.lock().buffer.len()
    }

    /// Armed flag and buffered count, read under one lock
    pub fn status(&self) -> RecorderStatus {
        let session = self.session.lock();
        RecorderStatus {
            armed: matches!(session.state, RecorderState::Armed { .. }),
            count: session.buffer.len(),
        }
    }

    /// Feeds one observed interaction.
    ///
    /// Returns the recorded action, or `None` when the event does not
    /// qualify or no locator could be synthesized for its target.
    pub fn record(
        &self,
        doc: &Document,
        event: &InteractionEvent,
    ) -> Result<Option<Action>, RecorderError> {
        let mut session = self.session.lock();
        if session.state == RecorderState::Idle {
            return Err(RecorderError::NotArmed);
        }
        let element = doc
            .element(event.target)
            .map_err(|_| RecorderError::UnknownTarget(event.target))?;

        let Some(payload) = payload_for(doc, event) else {
            debug!(kind = ?event.kind, tag = %element.tag_name, "Interaction does not qualify");
            return Ok(None);
        };
        let Some(locator) = self.synthesizer.synthesize(doc, event.target) else {
            debug!(node = event.target.0, "No locator for target; event dropped");
            return Ok(None);
        };

        let now = self.clock.monotonic_ms();
        let delay = session
            .last_event_ms
            .map(|last| now.saturating_sub(last))
            .unwrap_or(0);
        let action = Action::new(payload, locator.to_string())
            .with_timing(self.clock.epoch_ms(), delay)
            .with_element(&element.tag_name, text_hint(doc, event.target));

        debug!(
            kind = %action.kind(),
            locator = %action.locator,
            delay_ms = delay,
            "Action recorded"
        );
        session.buffer.push(action.clone());
        session.last_event_ms = Some(now);
        Ok(Some(action))
    }
}

fn payload_for(doc: &Document, event: &InteractionEvent) -> Option<ActionPayload> {
    let element = doc.element(event.target).ok()?;
    match &event.kind {
        InteractionKind::Click => Some(ActionPayload::Click),
        InteractionKind::Input => element.is_text_control().then(|| ActionPayload::Input {
            value: doc.value(event.target).unwrap_or_default(),
            input_type: element
                .input_type()
                .unwrap_or_else(|| element.tag_name.clone()),
        }),
        InteractionKind::Change if element.tag_name == "select" => Some(ActionPayload::Select {
            value: doc.value(event.target),
            selected_index: doc.selected_index(event.target),
            selected_text: doc.selected_text(event.target),
        }),
        InteractionKind::Change => match element.input_type().as_deref() {
            Some("checkbox") => Some(ActionPayload::Checkbox {
                checked: element.checked,
            }),
            Some("radio") => Some(ActionPayload::Radio {
                checked: element.checked,
                value: Some(element.attr("value").unwrap_or("on").to_string()),
            }),
            _ => None,
        },
        InteractionKind::KeyDown { key } => RECORDED_KEYS
            .contains(&key.as_str())
            .then(|| ActionPayload::KeyPress { key: key.clone() }),
    }
}

fn text_hint(doc: &Document, node: NodeId) -> Option<String> {
    let text = doc.text_content(node);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.chars().take(HINT_LEN).collect())
}
