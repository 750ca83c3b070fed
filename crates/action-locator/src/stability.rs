//! Stability classification for ids, class tokens and attribute values
//!
//! Identifiers generated by reactive frameworks (template expressions,
//! state classes, prefixed runtime classes) change between renders and make
//! poor anchors. The classifier is driven by an explicit rule table so the
//! heuristics can be tuned from configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Kind of token being classified; ids and classes have different ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element `id` or an id-like attribute value (`for`, `data-*`)
    Id,
    /// One token of the `class` attribute
    Class,
}

impl TokenKind {
    fn name(&self) -> &'static str {
        match self {
            TokenKind::Id => "id",
            TokenKind::Class => "class",
        }
    }
}

/// Reason a token was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instability {
    Empty,
    Whitespace,
    TooLong { len: usize, max: usize },
    ForbiddenChar(char),
    Keyword(String),
    FrameworkPrefix(String),
    TransientState(String),
}

impl fmt::Display for Instability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instability::Empty => write!(f, "empty"),
            Instability::Whitespace => write!(f, "contains whitespace"),
            Instability::TooLong { len, max } => write!(f, "length {} exceeds {}", len, max),
            Instability::ForbiddenChar(c) => write!(f, "contains '{}'", c),
            Instability::Keyword(k) => write!(f, "contains keyword '{}'", k),
            Instability::FrameworkPrefix(p) => write!(f, "framework prefix '{}'", p),
            Instability::TransientState(w) => write!(f, "transient state '{}'", w),
        }
    }
}

/// Tunable rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityRules {
    /// Maximum length of a stable id
    pub max_id_len: usize,

    /// Maximum length of a stable class token
    pub max_class_len: usize,

    /// Characters that mark a token as code rather than a name
    pub forbidden_chars: String,

    /// Keywords that mark a token as templated code, matched as whole words.
    /// Words break at non-alphanumerics and at camelCase humps.
    pub forbidden_keywords: Vec<String>,

    /// Class prefixes emitted by frameworks at runtime
    pub class_prefixes: Vec<String>,

    /// Class tokens that reflect transient UI state
    pub transient_classes: Vec<String>,
}

impl Default for StabilityRules {
    fn default() -> Self {
        let words = |list: &[&str]| -> Vec<String> { list.iter().map(|s| s.to_string()).collect() };
        Self {
            max_id_len: 50,
            max_class_len: 30,
            forbidden_chars: "{}()[];<>".to_string(),
            forbidden_keywords: words(&[
                "function", "return", "throw", "let", "const", "var", "if", "else",
            ]),
            class_prefixes: words(&["ng-"]),
            transient_classes: words(&[
                "touched", "untouched", "pristine", "dirty", "valid", "invalid", "pending",
                "focused", "opened", "closed", "selected", "disabled", "top", "bottom",
            ]),
        }
    }
}

/// Words of a code-like token: `returnUrl_fn` yields `return`, `Url`, `fn`.
fn code_words(token: &str) -> impl Iterator<Item = &str> {
    token
        .split(|c: char| !c.is_ascii_alphanumeric())
        .flat_map(camel_humps)
}

/// Split an ASCII alphanumeric run where a lowercase letter or digit is
/// followed by an uppercase one.
fn camel_humps(run: &str) -> Vec<&str> {
    let bytes = run.as_bytes();
    let mut words = Vec::new();
    let mut start = 0;
    for i in 1..bytes.len() {
        if bytes[i].is_ascii_uppercase() && !bytes[i - 1].is_ascii_uppercase() {
            words.push(&run[start..i]);
            start = i;
        }
    }
    if start < run.len() {
        words.push(&run[start..]);
    }
    words
}

/// Pure predicate set over a [`StabilityRules`] table
#[derive(Debug, Clone, Default)]
pub struct StabilityClassifier {
    rules: StabilityRules,
}

impl StabilityClassifier {
    /// Create a classifier over the given rules
    pub fn new(rules: StabilityRules) -> Self {
        Self { rules }
    }

    /// Rule table in use
    pub fn rules(&self) -> &StabilityRules {
        &self.rules
    }

    /// Classify a token, returning the first rule it violates.
    ///
    /// Decisions are traced; rejection is never an error.
    pub fn classify(&self, token: &str, kind: TokenKind) -> Result<(), Instability> {
        let verdict = self.evaluate(token, kind);
        match &verdict {
            Ok(()) => trace!(kind = kind.name(), token, "stable"),
            Err(reason) => trace!(kind = kind.name(), token, %reason, "unstable"),
        }
        verdict
    }

    fn evaluate(&self, token: &str, kind: TokenKind) -> Result<(), Instability> {
        if token.is_empty() {
            return Err(Instability::Empty);
        }
        if token.chars().any(char::is_whitespace) {
            return Err(Instability::Whitespace);
        }
        let max = match kind {
            TokenKind::Id => self.rules.max_id_len,
            TokenKind::Class => self.rules.max_class_len,
        };
        let len = token.chars().count();
        if len > max {
            return Err(Instability::TooLong { len, max });
        }
        self.code_signature(token)?;
        if kind == TokenKind::Class {
            if let Some(prefix) = self
                .rules
                .class_prefixes
                .iter()
                .find(|p| token.starts_with(p.as_str()))
            {
                return Err(Instability::FrameworkPrefix(prefix.clone()));
            }
            if let Some(word) = self
                .rules
                .transient_classes
                .iter()
                .find(|w| w.as_str() == token)
            {
                return Err(Instability::TransientState(word.clone()));
            }
        }
        Ok(())
    }

    /// Checks only the code-shaped signature: forbidden punctuation or a
    /// keyword appearing as a whole word.
    pub fn code_signature(&self, token: &str) -> Result<(), Instability> {
        if let Some(c) = token.chars().find(|c| self.rules.forbidden_chars.contains(*c)) {
            return Err(Instability::ForbiddenChar(c));
        }
        let keyword = code_words(token)
            .find_map(|word| self.rules.forbidden_keywords.iter().find(|k| k.as_str() == word));
        match keyword {
            Some(k) => Err(Instability::Keyword(k.clone())),
            None => Ok(()),
        }
    }

    /// Whether `token` may be used as an id anchor
    pub fn is_stable_identifier(&self, token: &str) -> bool {
        self.classify(token, TokenKind::Id).is_ok()
    }

    /// Whether `token` may be used as a class anchor
    pub fn is_stable_class(&self, token: &str) -> bool {
        self.classify(token, TokenKind::Class).is_ok()
    }

    /// Whether an attribute value is free of generated-code signatures.
    ///
    /// Whitespace is allowed; length follows the id ceiling.
    pub fn is_stable_value(&self, value: &str) -> bool {
        !value.is_empty()
            && value.chars().count() <= self.rules.max_id_len
            && self.code_signature(value).is_ok()
    }

    /// Whether a stored locator payload carries the signature the
    /// synthesizer would have rejected.
    pub fn is_poisoned(&self, payload: &str) -> bool {
        let poisoned = self.code_signature(payload).is_err();
        if poisoned {
            trace!(payload, "poisoned locator payload");
        }
        poisoned
    }
}
