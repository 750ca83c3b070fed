//! CSS selector subset: parsing, matching and escaping

use crate::document::{Document, NodeId};
use crate::errors::SelectorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorAttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
    Contains { key: String, value: String },
    Includes { key: String, value: String },
    DashMatch { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorPseudoClass {
    FirstChild,
    LastChild,
    FirstOfType,
    LastOfType,
    Checked,
    Disabled,
    NthOfType(usize),
    NthChild(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorStep {
    pub tag: Option<String>,
    pub universal: bool,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<SelectorAttrCondition>,
    pub pseudo_classes: Vec<SelectorPseudoClass>,
}

impl SelectorStep {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && !self.universal
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.pseudo_classes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorCombinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPart {
    pub step: SelectorStep,
    // Relation to the previous (left) part.
    pub combinator: Option<SelectorCombinator>,
}

/// Parses a comma-separated selector list.
pub fn parse_selector_groups(selector: &str) -> Result<Vec<Vec<SelectorPart>>, SelectorError> {
    if selector.trim().is_empty() {
        return Err(SelectorError::Empty);
    }
    let mut parser = Parser::new(selector);
    let mut groups = Vec::new();
    loop {
        groups.push(parser.parse_chain()?);
        match parser.peek() {
            None => break,
            Some(',') => {
                parser.bump();
            }
            Some(c) => {
                return Err(SelectorError::unsupported(
                    selector,
                    format!("unexpected '{}'", c),
                ))
            }
        }
    }
    Ok(groups)
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn error(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError::unsupported(self.src, reason)
    }

    fn parse_chain(&mut self) -> Result<Vec<SelectorPart>, SelectorError> {
        let mut parts: Vec<SelectorPart> = Vec::new();
        let mut pending: Option<SelectorCombinator> = None;
        loop {
            if self.skip_ws() && !parts.is_empty() && pending.is_none() {
                pending = Some(SelectorCombinator::Descendant);
            }
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    if parts.is_empty() {
                        return Err(self.error("leading combinator"));
                    }
                    self.bump();
                    pending = Some(SelectorCombinator::Child);
                }
                Some('+') | Some('~') => return Err(self.error("sibling combinators")),
                Some(_) => {
                    let step = self.parse_step()?;
                    let combinator = if parts.is_empty() {
                        None
                    } else {
                        Some(pending.take().unwrap_or(SelectorCombinator::Descendant))
                    };
                    parts.push(SelectorPart { step, combinator });
                }
            }
        }
        if parts.is_empty() {
            return Err(self.error("empty selector group"));
        }
        if pending == Some(SelectorCombinator::Child) {
            return Err(self.error("dangling combinator"));
        }
        Ok(parts)
    }

    fn parse_step(&mut self) -> Result<SelectorStep, SelectorError> {
        let mut step = SelectorStep::default();
        loop {
            match self.peek() {
                Some('*') if step.is_empty() => {
                    self.bump();
                    step.universal = true;
                }
                Some('#') => {
                    self.bump();
                    let id = self.parse_ident()?;
                    if step.id.is_some() {
                        return Err(self.error("multiple ids in one compound"));
                    }
                    step.id = Some(id);
                }
                Some('.') => {
                    self.bump();
                    step.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.bump();
                    step.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.bump();
                    step.pseudo_classes.push(self.parse_pseudo()?);
                }
                Some(c) if step.is_empty() && is_ident_start(c) => {
                    step.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                }
                Some(c) if c.is_whitespace() || c == '>' || c == ',' => break,
                None => break,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        if step.is_empty() {
            return Err(self.error("empty compound selector"));
        }
        Ok(step)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        let mut leading_digit = false;
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                out.push(self.parse_escape()?);
            } else if is_ident_char(c) {
                if out.is_empty() && c.is_ascii_digit() {
                    leading_digit = true;
                }
                self.bump();
                out.push(c);
            } else {
                break;
            }
        }
        if out.is_empty() || leading_digit {
            return Err(self.error("invalid identifier"));
        }
        Ok(out)
    }

    // Called after the backslash.
    fn parse_escape(&mut self) -> Result<char, SelectorError> {
        let mut hex = String::new();
        while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            hex.push(self.bump().unwrap_or_default());
        }
        if hex.is_empty() {
            return self.bump().ok_or_else(|| self.error("dangling escape"));
        }
        if self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let code = u32::from_str_radix(&hex, 16).map_err(|_| self.error("bad escape"))?;
        Ok(char::from_u32(code)
            .filter(|c| *c != '\0')
            .unwrap_or('\u{FFFD}'))
    }

    fn parse_string(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.peek() {
                    Some('\n') => {
                        self.bump();
                    }
                    Some(_) => out.push(self.parse_escape()?),
                    None => return Err(self.error("dangling escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_attr(&mut self) -> Result<SelectorAttrCondition, SelectorError> {
        self.skip_ws();
        let key = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();
        let op = match self.bump() {
            Some(']') => return Ok(SelectorAttrCondition::Exists { key }),
            Some('=') => "=",
            Some(c @ ('^' | '$' | '*' | '~' | '|')) => {
                if self.bump() != Some('=') {
                    return Err(self.error("expected '=' in attribute selector"));
                }
                match c {
                    '^' => "^=",
                    '$' => "$=",
                    '*' => "*=",
                    '~' => "~=",
                    _ => "|=",
                }
            }
            _ => return Err(self.error("malformed attribute selector")),
        };
        self.skip_ws();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                self.parse_string(q)?
            }
            _ => self.parse_ident()?,
        };
        self.skip_ws();
        if self.bump() != Some(']') {
            return Err(self.error("unterminated attribute selector"));
        }
        Ok(match op {
            "=" => SelectorAttrCondition::Eq { key, value },
            "^=" => SelectorAttrCondition::StartsWith { key, value },
            "$=" => SelectorAttrCondition::EndsWith { key, value },
            "*=" => SelectorAttrCondition::Contains { key, value },
            "~=" => SelectorAttrCondition::Includes { key, value },
            _ => SelectorAttrCondition::DashMatch { key, value },
        })
    }

    fn parse_pseudo(&mut self) -> Result<SelectorPseudoClass, SelectorError> {
        let name = self.parse_ident()?.to_ascii_lowercase();
        let pseudo = match name.as_str() {
            "first-child" => SelectorPseudoClass::FirstChild,
            "last-child" => SelectorPseudoClass::LastChild,
            "first-of-type" => SelectorPseudoClass::FirstOfType,
            "last-of-type" => SelectorPseudoClass::LastOfType,
            "checked" => SelectorPseudoClass::Checked,
            "disabled" => SelectorPseudoClass::Disabled,
            "nth-of-type" => SelectorPseudoClass::NthOfType(self.parse_nth_arg()?),
            "nth-child" => SelectorPseudoClass::NthChild(self.parse_nth_arg()?),
            other => return Err(self.error(format!("unsupported pseudo-class ':{}'", other))),
        };
        Ok(pseudo)
    }

    fn parse_nth_arg(&mut self) -> Result<usize, SelectorError> {
        if self.bump() != Some('(') {
            return Err(self.error("expected '('"));
        }
        let mut raw = String::new();
        loop {
            match self.bump() {
                Some(')') => break,
                Some(c) => raw.push(c),
                None => return Err(self.error("unterminated pseudo-class argument")),
            }
        }
        match raw.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(self.error(format!("unsupported nth argument '{}'", raw.trim()))),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

pub(crate) fn matches_step(doc: &Document, node: NodeId, step: &SelectorStep) -> bool {
    let Ok(element) = doc.element(node) else {
        return false;
    };
    if let Some(tag) = &step.tag {
        if &element.tag_name != tag {
            return false;
        }
    }
    if let Some(id) = &step.id {
        if element.attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !step.classes.is_empty() {
        let classes = element.classes();
        if !step.classes.iter().all(|c| classes.contains(&c.as_str())) {
            return false;
        }
    }
    let attrs_ok = step.attrs.iter().all(|cond| match cond {
        SelectorAttrCondition::Exists { key } => element.has_attr(key),
        SelectorAttrCondition::Eq { key, value } => element.attr(key) == Some(value.as_str()),
        SelectorAttrCondition::StartsWith { key, value } => element
            .attr(key)
            .is_some_and(|v| !value.is_empty() && v.starts_with(value.as_str())),
        SelectorAttrCondition::EndsWith { key, value } => element
            .attr(key)
            .is_some_and(|v| !value.is_empty() && v.ends_with(value.as_str())),
        SelectorAttrCondition::Contains { key, value } => element
            .attr(key)
            .is_some_and(|v| !value.is_empty() && v.contains(value.as_str())),
        SelectorAttrCondition::Includes { key, value } => element
            .attr(key)
            .is_some_and(|v| v.split_ascii_whitespace().any(|t| t == value)),
        SelectorAttrCondition::DashMatch { key, value } => element.attr(key).is_some_and(|v| {
            v == value || v.strip_prefix(value.as_str()).is_some_and(|r| r.starts_with('-'))
        }),
    });
    if !attrs_ok {
        return false;
    }
    step.pseudo_classes.iter().all(|pseudo| {
        let siblings = doc
            .parent(node)
            .map(|p| doc.element_children(p))
            .unwrap_or_else(|| vec![node]);
        match pseudo {
            SelectorPseudoClass::FirstChild => siblings.first() == Some(&node),
            SelectorPseudoClass::LastChild => siblings.last() == Some(&node),
            SelectorPseudoClass::FirstOfType => doc.nth_of_type(node) == 1,
            SelectorPseudoClass::LastOfType => {
                doc.nth_of_type(node) == doc.same_tag_siblings(node).len()
            }
            SelectorPseudoClass::Checked => element.checked,
            SelectorPseudoClass::Disabled => element.is_disabled(),
            SelectorPseudoClass::NthOfType(n) => doc.nth_of_type(node) == *n,
            SelectorPseudoClass::NthChild(n) => {
                siblings.iter().position(|s| *s == node).map(|p| p + 1) == Some(*n)
            }
        }
    })
}

/// Escapes a string for use as a CSS identifier (`CSS.escape`).
pub fn escape_ident(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    for (i, &c) in chars.iter().enumerate() {
        let code = c as u32;
        if c == '\0' {
            out.push('\u{FFFD}');
        } else if (1..=0x1f).contains(&code)
            || code == 0x7f
            || (i == 0 && c.is_ascii_digit())
            || (i == 1 && c.is_ascii_digit() && chars[0] == '-')
        {
            out.push_str(&format!("\\{:x} ", code));
        } else if i == 0 && c == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if is_ident_char(c) {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

/// Escapes a string for use inside a double-quoted CSS string.
pub fn escape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out
}
