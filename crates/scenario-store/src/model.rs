//! Recorded actions and named scenarios, in their persisted wire form

use chrono::{DateTime, Utc};
use domreplay_core_types::ScenarioId;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use url::Url;

/// Kind of a recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Click,
    TextInput,
    Select,
    Checkbox,
    Radio,
    KeyPress,
}

impl ActionKind {
    /// Wire name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::TextInput => "input",
            ActionKind::Select => "select",
            ActionKind::Checkbox => "checkbox",
            ActionKind::Radio => "radio",
            ActionKind::KeyPress => "keypress",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-specific part of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionPayload {
    Click,
    Input {
        value: String,
        #[serde(rename = "inputType", default = "default_input_type")]
        input_type: String,
    },
    Select {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(
            rename = "selectedIndex",
            default,
            deserialize_with = "de_index",
            skip_serializing_if = "Option::is_none"
        )]
        selected_index: Option<usize>,
        #[serde(rename = "selectedText", default, skip_serializing_if = "Option::is_none")]
        selected_text: Option<String>,
    },
    Checkbox {
        checked: bool,
    },
    Radio {
        #[serde(default = "default_true")]
        checked: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    #[serde(rename = "keypress")]
    KeyPress {
        key: String,
    },
}

fn default_input_type() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

fn de_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|i| usize::try_from(i).ok()))
}

/// Delays arrive as arbitrary JSON numbers; negative or missing becomes 0.
fn de_delay<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(match raw {
        Some(ms) if ms.is_finite() && ms > 0.0 => ms.round() as u64,
        _ => 0,
    })
}

/// One recorded user action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub payload: ActionPayload,

    /// Serialized locator of the target element
    #[serde(rename = "selector")]
    pub locator: String,

    /// Capture time, milliseconds since the epoch
    #[serde(default)]
    pub timestamp: i64,

    /// Wait before this action during playback
    #[serde(rename = "delay", default, deserialize_with = "de_delay")]
    pub delay_millis: u64,

    /// Uppercase tag name at capture time
    #[serde(rename = "element", default, skip_serializing_if = "Option::is_none")]
    pub element_tag: Option<String>,

    /// Trimmed text of the target, used as a resolution hint
    #[serde(rename = "text", default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_hint: Option<String>,
}

impl Action {
    pub fn new(payload: ActionPayload, locator: impl Into<String>) -> Self {
        Self {
            payload,
            locator: locator.into(),
            timestamp: 0,
            delay_millis: 0,
            element_tag: None,
            auxiliary_hint: None,
        }
    }

    pub fn with_timing(mut self, timestamp: i64, delay_millis: u64) -> Self {
        self.timestamp = timestamp;
        self.delay_millis = delay_millis;
        self
    }

    pub fn with_element(mut self, tag: &str, hint: Option<String>) -> Self {
        self.element_tag = Some(tag.to_ascii_uppercase());
        self.auxiliary_hint = hint.filter(|h| !h.is_empty());
        self
    }

    pub fn kind(&self) -> ActionKind {
        match self.payload {
            ActionPayload::Click => ActionKind::Click,
            ActionPayload::Input { .. } => ActionKind::TextInput,
            ActionPayload::Select { .. } => ActionKind::Select,
            ActionPayload::Checkbox { .. } => ActionKind::Checkbox,
            ActionPayload::Radio { .. } => ActionKind::Radio,
            ActionPayload::KeyPress { .. } => ActionKind::KeyPress,
        }
    }

    /// Short human summary used by listings
    pub fn describe(&self) -> String {
        match &self.payload {
            ActionPayload::Click => format!("click {}", self.locator),
            ActionPayload::Input { value, .. } => format!("type {:?} into {}", value, self.locator),
            ActionPayload::Select {
                value,
                selected_index,
                ..
            } => match (value, selected_index) {
                (Some(v), _) => format!("select {:?} in {}", v, self.locator),
                (None, Some(i)) => format!("select #{} in {}", i, self.locator),
                (None, None) => format!("select in {}", self.locator),
            },
            ActionPayload::Checkbox { checked } => {
                format!("{} {}", if *checked { "check" } else { "uncheck" }, self.locator)
            }
            ActionPayload::Radio { .. } => format!("choose {}", self.locator),
            ActionPayload::KeyPress { key } => format!("press {} on {}", key, self.locator),
        }
    }
}

/// A named, ordered list of actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, actions: Vec<Action>, url: Option<String>) -> Self {
        Self {
            id: ScenarioId::new(),
            name: name.into(),
            actions,
            url,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Sum of all action delays
    pub fn total_delay_millis(&self) -> u64 {
        self.actions.iter().map(|a| a.delay_millis).sum()
    }

    /// Host of the page the scenario was recorded on
    pub fn host(&self) -> Option<String> {
        self.url.as_deref().and_then(host_of)
    }

    /// Whether the scenario was recorded on the same host as `page_url`.
    ///
    /// Unknown hosts on either side are treated as a match.
    pub fn matches_host(&self, page_url: &str) -> bool {
        match (self.host(), host_of(page_url)) {
            (Some(recorded), Some(current)) => recorded.eq_ignore_ascii_case(&current),
            _ => true,
        }
    }
}

fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw).ok()?.host_str().map(str::to_string)
}
