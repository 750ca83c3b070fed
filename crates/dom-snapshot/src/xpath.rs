//! XPath subset used by text-anchored locators.
//!
//! Supported: absolute `/` and `//` steps over element names or `*`, with
//! predicates `[n]`, `[@a]`, `[@a="v"]`, `[normalize-space(.)="t"]`,
//! `[text()="t"]`, `[.="t"]` and `contains(...)` / `starts-with(...)` over
//! the same operands. String literals accept backslash escapes.

use std::collections::HashMap;

use crate::document::{Document, NodeId};
use crate::errors::SelectorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathExpr {
    pub steps: Vec<XPathStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathStep {
    pub descendant: bool,
    /// `None` for `*`.
    pub name: Option<String>,
    pub predicates: Vec<XPathPredicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathOperand {
    NormalizedText,
    StringValue,
    OwnText,
    Attr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathTest {
    Equals,
    Contains,
    StartsWith,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathPredicate {
    Position(usize),
    Exists(String),
    Compare {
        operand: XPathOperand,
        test: XPathTest,
        value: String,
    },
}

pub fn parse(expr: &str) -> Result<XPathExpr, SelectorError> {
    let mut parser = Parser {
        src: expr,
        chars: expr.trim().chars().collect(),
        pos: 0,
    };
    let mut steps = Vec::new();
    while parser.peek().is_some() {
        if !parser.eat('/') {
            return Err(parser.error("expected '/'"));
        }
        let descendant = parser.eat('/');
        steps.push(parser.parse_step(descendant)?);
    }
    if steps.is_empty() {
        return Err(parser.error("empty expression"));
    }
    Ok(XPathExpr { steps })
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let end = self.pos + s.chars().count();
        if end <= self.chars.len() && self.chars[self.pos..end].iter().copied().eq(s.chars()) {
            self.pos = end;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), SelectorError> {
        self.skip_ws();
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    fn error(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError::xpath(self.src, reason)
    }

    fn parse_name(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':') {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.error("expected a name"));
        }
        Ok(out)
    }

    fn parse_step(&mut self, descendant: bool) -> Result<XPathStep, SelectorError> {
        let name = if self.eat('*') {
            None
        } else {
            Some(self.parse_name()?.to_ascii_lowercase())
        };
        let mut predicates = Vec::new();
        while self.eat('[') {
            self.skip_ws();
            predicates.push(self.parse_predicate()?);
            self.expect(']')?;
        }
        Ok(XPathStep {
            descendant,
            name,
            predicates,
        })
    }

    fn parse_predicate(&mut self) -> Result<XPathPredicate, SelectorError> {
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let mut digits = String::new();
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                digits.push(c);
                self.pos += 1;
            }
            return match digits.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(XPathPredicate::Position(n)),
                _ => Err(self.error("position must be >= 1")),
            };
        }
        for (func, test) in [("contains", XPathTest::Contains), ("starts-with", XPathTest::StartsWith)] {
            if self.eat_str(func) {
                self.expect('(')?;
                self.skip_ws();
                let operand = self.parse_operand()?;
                self.expect(',')?;
                self.skip_ws();
                let value = self.parse_literal()?;
                self.expect(')')?;
                return Ok(XPathPredicate::Compare {
                    operand,
                    test,
                    value,
                });
            }
        }
        let operand = self.parse_operand()?;
        self.skip_ws();
        if !self.eat('=') {
            return match operand {
                XPathOperand::Attr(name) => Ok(XPathPredicate::Exists(name)),
                _ => Err(self.error("expected '='")),
            };
        }
        self.skip_ws();
        let value = self.parse_literal()?;
        Ok(XPathPredicate::Compare {
            operand,
            test: XPathTest::Equals,
            value,
        })
    }

    fn parse_operand(&mut self) -> Result<XPathOperand, SelectorError> {
        if self.eat('@') {
            return Ok(XPathOperand::Attr(self.parse_name()?.to_ascii_lowercase()));
        }
        if self.eat_str("normalize-space") {
            self.expect('(')?;
            self.skip_ws();
            self.eat('.');
            self.expect(')')?;
            return Ok(XPathOperand::NormalizedText);
        }
        if self.eat_str("text()") {
            return Ok(XPathOperand::OwnText);
        }
        if self.eat_str("string(.)") || self.eat('.') {
            return Ok(XPathOperand::StringValue);
        }
        Err(self.error("unsupported predicate"))
    }

    fn parse_literal(&mut self) -> Result<String, SelectorError> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a string literal")),
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string literal")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            out.push(c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("dangling escape")),
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}

/// Escapes `raw` for a double-quoted literal accepted by [`parse`].
pub fn escape_literal(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

pub(crate) fn evaluate(doc: &Document, expr: &XPathExpr) -> Vec<NodeId> {
    let order: HashMap<NodeId, usize> = doc
        .all_elements()
        .into_iter()
        .enumerate()
        .map(|(i, n)| (n, i))
        .collect();

    let mut context = vec![doc.root()];
    for step in &expr.steps {
        let mut next = Vec::new();
        for ctx in &context {
            let mut bases = vec![*ctx];
            if step.descendant {
                bases.extend(doc.descendants(*ctx));
            }
            for base in bases {
                let children: Vec<NodeId> = doc
                    .element_children(base)
                    .into_iter()
                    .filter(|c| match &step.name {
                        Some(name) => doc.tag_name(*c) == Some(name.as_str()),
                        None => true,
                    })
                    .collect();
                next.extend(apply_predicates(doc, children, &step.predicates));
            }
        }
        next.sort_by_key(|n| order.get(n).copied().unwrap_or(usize::MAX));
        next.dedup();
        context = next;
    }
    context
}

fn apply_predicates(doc: &Document, mut nodes: Vec<NodeId>, predicates: &[XPathPredicate]) -> Vec<NodeId> {
    for predicate in predicates {
        nodes = match predicate {
            XPathPredicate::Position(n) => nodes.get(n - 1).copied().into_iter().collect(),
            XPathPredicate::Exists(name) => nodes
                .into_iter()
                .filter(|node| doc.get_attribute(*node, name).is_some())
                .collect(),
            XPathPredicate::Compare {
                operand,
                test,
                value,
            } => nodes
                .into_iter()
                .filter(|node| operand_values(doc, *node, operand).iter().any(|v| run_test(*test, v, value)))
                .collect(),
        };
    }
    nodes
}

fn operand_values(doc: &Document, node: NodeId, operand: &XPathOperand) -> Vec<String> {
    match operand {
        XPathOperand::NormalizedText => vec![doc.normalized_text(node)],
        XPathOperand::StringValue => vec![doc.text_content(node)],
        XPathOperand::OwnText => doc.own_text(node).into_iter().map(str::to_string).collect(),
        XPathOperand::Attr(name) => doc.get_attribute(node, name).map(str::to_string).into_iter().collect(),
    }
}

fn run_test(test: XPathTest, actual: &str, expected: &str) -> bool {
    match test {
        XPathTest::Equals => actual == expected,
        XPathTest::Contains => actual.contains(expected),
        XPathTest::StartsWith => actual.starts_with(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.create_element(doc.root(), "body").unwrap();
        let first = doc.create_element(body, "button").unwrap();
        doc.append_text(first, "  Save   draft ").unwrap();
        let second = doc.create_element_with(body, "button", &[("name", "go")]).unwrap();
        doc.append_text(second, "Say \"hi\"").unwrap();
        (doc, first, second)
    }

    #[test]
    fn test_normalize_space_equality() {
        let (doc, first, _) = page();
        let found = doc
            .evaluate_xpath(r#"//button[normalize-space(.)="Save draft"]"#)
            .unwrap();
        assert_eq!(found, vec![first]);
    }

    #[test]
    fn test_contains_and_escape() {
        let (doc, _, second) = page();
        let expr = format!(
            r#"//button[contains(normalize-space(.),"{}")]"#,
            escape_literal("\"hi\"")
        );
        assert_eq!(doc.evaluate_xpath(&expr).unwrap(), vec![second]);
    }

    #[test]
    fn test_attribute_and_position() {
        let (doc, first, second) = page();
        assert_eq!(doc.evaluate_xpath("//button[@name]").unwrap(), vec![second]);
        assert_eq!(doc.evaluate_xpath(r#"//*[@name="go"]"#).unwrap(), vec![second]);
        assert_eq!(doc.evaluate_xpath("/body/button[1]").unwrap(), vec![first]);
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(parse("button").is_err());
        assert!(parse("//button[").is_err());
        assert!(parse(r#"//a[text()="x]"#).is_err());
        assert!(parse("//a[last()]").is_err());
    }
}
