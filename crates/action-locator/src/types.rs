//! Core types for the locator system

use dom_snapshot::xpath::{self, XPathOperand, XPathPredicate, XPathTest};
use dom_snapshot::{escape_ident, escape_literal, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix marking an XPath locator in its serialized form
pub const XPATH_PREFIX: &str = "xpath=";

/// Text at or above this many characters is matched by prefix containment
pub const TEXT_CONTAINS_THRESHOLD: usize = 50;

/// Number of leading characters kept for a containment match
pub const TEXT_CONTAINS_PREFIX: usize = 30;

/// One step of a structural path: a tag plus an optional 1-based
/// same-tag sibling ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub tag: String,
    pub nth: Option<usize>,
}

impl PathSegment {
    /// Create a segment
    pub fn new(tag: impl Into<String>, nth: Option<usize>) -> Self {
        Self {
            tag: tag.into(),
            nth,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        let (tag, nth) = match raw.split_once(":nth-of-type(") {
            Some((tag, rest)) => {
                let digits = rest.strip_suffix(')')?;
                (tag, Some(digits.parse::<usize>().ok().filter(|n| *n >= 1)?))
            }
            None => (raw, None),
        };
        let tag = unescape_tag(tag)?;
        let valid_tag = tag.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        valid_tag.then(|| Self::new(tag.to_ascii_lowercase(), nth))
    }
}

/// Tag name with the backslash escapes [`escape_ident`] emits removed.
///
/// A bare `:` or `.` belongs to CSS syntax, so only its escaped form is
/// accepted as part of the name.
fn unescape_tag(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        let c = if c == '\\' {
            chars.next().filter(|c| matches!(c, ':' | '.'))?
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            return None;
        };
        out.push(c);
    }
    Some(out)
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = escape_ident(&self.tag);
        match self.nth {
            Some(n) => write!(f, "{}:nth-of-type({})", tag, n),
            None => f.write_str(&tag),
        }
    }
}

/// A locator as a tagged variant.
///
/// Only [`Display`](fmt::Display) and [`Locator::parse`] touch the string
/// form; everything else dispatches on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector (id, attribute or class based)
    Css { selector: String },

    /// Structural path from the root container down to the element
    Path { segments: Vec<PathSegment> },

    /// Element of `tag` whose normalized text equals (or contains) `text`
    TextMatch {
        tag: String,
        text: String,
        exact: bool,
    },

    /// Any other XPath expression
    XPath { expr: String },
}

impl Locator {
    /// CSS locator
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    /// Text locator using the default ceilings
    pub fn text_anchor(tag: &str, text: &str) -> Self {
        Self::text_anchor_with(tag, text, TEXT_CONTAINS_THRESHOLD, TEXT_CONTAINS_PREFIX)
    }

    /// Text locator: exact below `threshold` characters, otherwise a
    /// containment match on the first `prefix_len` characters.
    pub fn text_anchor_with(tag: &str, text: &str, threshold: usize, prefix_len: usize) -> Self {
        let normalized = dom_snapshot::normalize_space(text);
        if normalized.chars().count() >= threshold {
            let prefix: String = normalized.chars().take(prefix_len).collect();
            Locator::TextMatch {
                tag: tag.to_ascii_lowercase(),
                text: prefix.trim_end().to_string(),
                exact: false,
            }
        } else {
            Locator::TextMatch {
                tag: tag.to_ascii_lowercase(),
                text: normalized,
                exact: true,
            }
        }
    }

    /// Parse a stored locator string. Never fails: anything that is not an
    /// XPath or a structural path is kept as CSS.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(expr) = raw.strip_prefix(XPATH_PREFIX) {
            return Self::from_xpath(expr);
        }
        if let Some(segments) = Self::parse_path(raw) {
            return Locator::Path { segments };
        }
        Locator::css(raw)
    }

    fn from_xpath(expr: &str) -> Self {
        if let Ok(parsed) = xpath::parse(expr) {
            if let [step] = parsed.steps.as_slice() {
                if let (true, Some(tag), [XPathPredicate::Compare { operand: XPathOperand::NormalizedText, test, value }]) =
                    (step.descendant, &step.name, step.predicates.as_slice())
                {
                    let exact = match test {
                        XPathTest::Equals => Some(true),
                        XPathTest::Contains => Some(false),
                        XPathTest::StartsWith => None,
                    };
                    if let Some(exact) = exact {
                        return Locator::TextMatch {
                            tag: tag.clone(),
                            text: value.clone(),
                            exact,
                        };
                    }
                }
            }
        }
        Locator::XPath {
            expr: expr.to_string(),
        }
    }

    fn parse_path(raw: &str) -> Option<Vec<PathSegment>> {
        let segments = raw
            .split(" > ")
            .map(PathSegment::parse)
            .collect::<Option<Vec<_>>>()?;
        match segments.first() {
            Some(first) if first.tag == "body" || first.tag == "html" => Some(segments),
            _ => None,
        }
    }

    /// XPath expression for XPath-evaluated variants
    pub fn xpath_expr(&self) -> Option<String> {
        match self {
            Locator::TextMatch { tag, text, exact } => Some(if *exact {
                format!("//{}[normalize-space(.)=\"{}\"]", tag, escape_literal(text))
            } else {
                format!(
                    "//{}[contains(normalize-space(.),\"{}\")]",
                    tag,
                    escape_literal(text)
                )
            }),
            Locator::XPath { expr } => Some(expr.clone()),
            _ => None,
        }
    }

    /// CSS selector for CSS-evaluated variants
    pub fn css_selector(&self) -> Option<String> {
        match self {
            Locator::Css { selector } => Some(selector.clone()),
            Locator::Path { .. } => Some(self.to_string()),
            _ => None,
        }
    }

    /// Identifier payloads embedded in a CSS locator as `(attribute, value)`
    /// pairs: the `#id` part is reported as `id`, bracketed attribute
    /// conditions under their own name. Used to detect poisoned stored data.
    pub fn identifier_payloads(&self) -> Vec<(String, String)> {
        let Locator::Css { selector } = self else {
            return Vec::new();
        };
        let chars: Vec<char> = selector.chars().collect();
        let mut payloads = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '#' => {
                    let (id, next) = scan_until(&chars, i + 1, |c| {
                        c.is_whitespace() || matches!(c, '>' | '.' | ':' | ',' | '[')
                    });
                    payloads.push(("id".to_string(), id));
                    i = next;
                }
                '[' => {
                    let (name, next) = scan_until(&chars, i + 1, |c| {
                        matches!(c, '=' | '^' | '$' | '*' | '~' | '|' | ']')
                    });
                    i = next;
                    while i < chars.len() && chars[i] != ']' && chars[i] != '"' && chars[i] != '\'' {
                        i += 1;
                    }
                    if let Some(&quote) = chars.get(i).filter(|c| **c != ']') {
                        let (value, next) = scan_until(&chars, i + 1, |c| c == quote);
                        payloads.push((name.trim().to_ascii_lowercase(), value));
                        i = next + 1;
                    }
                }
                _ => i += 1,
            }
        }
        payloads
    }
}

// Collects characters from `start` until `stop` matches, honoring
// backslash escapes. Returns the text and the index of the stop character.
fn scan_until(chars: &[char], start: usize, stop: impl Fn(char) -> bool) -> (String, usize) {
    let mut out = String::new();
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if stop(c) {
            break;
        }
        out.push(c);
        i += 1;
    }
    (out, i)
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css { selector } => f.write_str(selector),
            Locator::Path { segments } => {
                let joined: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
                f.write_str(&joined.join(" > "))
            }
            Locator::TextMatch { .. } | Locator::XPath { .. } => {
                write!(f, "{}{}", XPATH_PREFIX, self.xpath_expr().unwrap_or_default())
            }
        }
    }
}

/// Resolution strategy enumeration, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveStrategy {
    /// Evaluate an XPath-style locator directly
    #[serde(rename = "xpath")]
    XPath,

    /// Query the locator as a CSS selector
    DirectQuery,

    /// Drop the value constraint of a toggle-input locator
    ToggleRelaxation,

    /// Search elements of the hinted tag by captured text
    TextHint,

    /// Strip sibling ordinals from a structural path
    PathRelaxation,
}

impl ResolveStrategy {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            ResolveStrategy::XPath => "xpath",
            ResolveStrategy::DirectQuery => "direct-query",
            ResolveStrategy::ToggleRelaxation => "toggle-relaxation",
            ResolveStrategy::TextHint => "text-hint",
            ResolveStrategy::PathRelaxation => "path-relaxation",
        }
    }

    /// Get all strategies in fallback order
    pub fn fallback_chain() -> Vec<ResolveStrategy> {
        vec![
            ResolveStrategy::XPath,
            ResolveStrategy::DirectQuery,
            ResolveStrategy::ToggleRelaxation,
            ResolveStrategy::TextHint,
            ResolveStrategy::PathRelaxation,
        ]
    }
}

impl fmt::Display for ResolveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input to one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Stored locator
    pub locator: Locator,

    /// Captured text snippet, if any
    pub hint_text: Option<String>,

    /// Tag name at record time, if any
    pub tag: Option<String>,
}

impl ResolveRequest {
    /// Request from a stored locator string
    pub fn new(locator: &str) -> Self {
        Self {
            locator: Locator::parse(locator),
            hint_text: None,
            tag: None,
        }
    }

    /// Attach the captured text hint
    pub fn with_hint(mut self, text: Option<&str>) -> Self {
        self.hint_text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        self
    }

    /// Attach the record-time tag name
    pub fn with_tag(mut self, tag: Option<&str>) -> Self {
        self.tag = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| t.to_ascii_lowercase());
        self
    }
}

/// Resolved element and the strategy that found it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub node: NodeId,
    pub strategy: ResolveStrategy,
}
