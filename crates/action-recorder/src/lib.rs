//! Action recorder
//!
//! A two-state machine (`Idle`, `Armed`) that converts observed page
//! interactions into [`Action`](domreplay_scenario_store::Action) records.
//! Time comes from an injected [`Clock`] so delays are reproducible, and
//! [`ScriptRecorder`] drives the recorder from a timed interaction script.

pub mod clock;
pub mod errors;
pub mod recorder;
pub mod script;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::RecorderError;
pub use recorder::{
    InteractionEvent, InteractionKind, Recorder, RecorderState, RecorderStatus, HINT_LEN,
    RECORDED_KEYS,
};
pub use script::{parse_script, ScriptOp, ScriptRecorder, ScriptStep};
