//! Element resolution strategies
//!
//! Five strategies in fallback order:
//! 1. XPath - Evaluate text-match and XPath locators directly
//! 2. DirectQuery - Query CSS and structural-path locators as written
//! 3. ToggleRelaxation - Drop the value constraint of a radio/checkbox locator
//! 4. TextHint - Search elements of the hinted tag by captured text
//! 5. PathRelaxation - Strip sibling ordinals from a structural path

use crate::{errors::LocatorError, types::*};
use dom_snapshot::selector::{parse_selector_groups, SelectorAttrCondition};
use dom_snapshot::{escape_string, normalize_space, Document, NodeId};
use tracing::debug;

/// Strategy trait for element resolution
///
/// Implementations return every match in document order, or an empty list
/// when the locator does not apply to them.
pub trait Strategy: Send + Sync {
    /// Attempt to resolve element using this strategy
    fn resolve(&self, doc: &Document, request: &ResolveRequest)
        -> Result<Vec<NodeId>, LocatorError>;

    /// Get strategy type
    fn strategy_type(&self) -> ResolveStrategy;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }
}

/// XPath evaluation strategy
#[derive(Debug, Default)]
pub struct XPathStrategy;

impl Strategy for XPathStrategy {
    fn resolve(
        &self,
        doc: &Document,
        request: &ResolveRequest,
    ) -> Result<Vec<NodeId>, LocatorError> {
        match request.locator.xpath_expr() {
            Some(expr) => {
                debug!("Evaluating xpath: {}", expr);
                Ok(doc.evaluate_xpath(&expr)?)
            }
            None => Ok(Vec::new()),
        }
    }

    fn strategy_type(&self) -> ResolveStrategy {
        ResolveStrategy::XPath
    }
}

/// Direct CSS query strategy
#[derive(Debug, Default)]
pub struct DirectQueryStrategy;

impl Strategy for DirectQueryStrategy {
    fn resolve(
        &self,
        doc: &Document,
        request: &ResolveRequest,
    ) -> Result<Vec<NodeId>, LocatorError> {
        match request.locator.css_selector() {
            Some(selector) if !selector.is_empty() => Ok(doc.query_selector_all(&selector)?),
            Some(_) => Err(LocatorError::InvalidLocator("empty selector".to_string())),
            None => Ok(Vec::new()),
        }
    }

    fn strategy_type(&self) -> ResolveStrategy {
        ResolveStrategy::DirectQuery
    }
}

/// Toggle-input relaxation strategy
#[derive(Debug, Default)]
pub struct ToggleRelaxStrategy;

impl ToggleRelaxStrategy {
    /// `tag[type=T][name=N]` for a locator carrying a toggle type and a name
    pub fn relaxed_selector(locator: &Locator) -> Option<String> {
        let Locator::Css { selector } = locator else {
            return None;
        };
        let groups = parse_selector_groups(selector).ok()?;
        let [parts] = groups.as_slice() else {
            return None;
        };
        let [part] = parts.as_slice() else {
            return None;
        };
        let mut kind = None;
        let mut name = None;
        for attr in &part.step.attrs {
            if let SelectorAttrCondition::Eq { key, value } = attr {
                match key.as_str() {
                    "type" if value == "radio" || value == "checkbox" => kind = Some(value),
                    "name" => name = Some(value),
                    _ => {}
                }
            }
        }
        let tag = part.step.tag.as_deref().unwrap_or("input");
        Some(format!(
            "{}[type=\"{}\"][name=\"{}\"]",
            tag,
            escape_string(kind?),
            escape_string(name?)
        ))
    }
}

impl Strategy for ToggleRelaxStrategy {
    fn resolve(
        &self,
        doc: &Document,
        request: &ResolveRequest,
    ) -> Result<Vec<NodeId>, LocatorError> {
        match Self::relaxed_selector(&request.locator) {
            Some(selector) => {
                debug!("Relaxed toggle selector: {}", selector);
                Ok(doc.query_selector_all(&selector)?)
            }
            None => Ok(Vec::new()),
        }
    }

    fn strategy_type(&self) -> ResolveStrategy {
        ResolveStrategy::ToggleRelaxation
    }
}

/// Text hint strategy
#[derive(Debug, Default)]
pub struct TextHintStrategy;

impl TextHintStrategy {
    fn hints(request: &ResolveRequest) -> Option<(String, String)> {
        let (locator_tag, locator_text) = match &request.locator {
            Locator::TextMatch { tag, text, .. } => (Some(tag.clone()), Some(text.clone())),
            _ => (None, None),
        };
        let text = request.hint_text.clone().or(locator_text)?;
        let tag = request.tag.clone().or(locator_tag)?;
        Some((tag, text))
    }
}

impl Strategy for TextHintStrategy {
    fn resolve(
        &self,
        doc: &Document,
        request: &ResolveRequest,
    ) -> Result<Vec<NodeId>, LocatorError> {
        let Some((tag, text)) = Self::hints(request) else {
            return Ok(Vec::new());
        };
        let wanted = normalize_space(&text);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Searching <{}> elements for text: {}", tag, wanted);
        let candidates = doc.elements_by_tag(&tag);
        let exact: Vec<NodeId> = candidates
            .iter()
            .copied()
            .filter(|node| doc.normalized_text(*node) == wanted)
            .collect();
        if !exact.is_empty() {
            return Ok(exact);
        }
        Ok(candidates
            .into_iter()
            .filter(|node| doc.normalized_text(*node).contains(&wanted))
            .collect())
    }

    fn strategy_type(&self) -> ResolveStrategy {
        ResolveStrategy::TextHint
    }
}

/// Structural path relaxation strategy
#[derive(Debug, Default)]
pub struct PathRelaxStrategy;

impl PathRelaxStrategy {
    /// Relaxed variants: first without the final ordinal, then without any
    pub fn relaxed_paths(locator: &Locator) -> Vec<Locator> {
        let Locator::Path { segments } = locator else {
            return Vec::new();
        };
        let mut variants = Vec::new();
        if let Some(last) = segments.last().filter(|s| s.nth.is_some()) {
            let mut trimmed = segments.clone();
            let len = trimmed.len();
            trimmed[len - 1] = PathSegment::new(last.tag.clone(), None);
            variants.push(Locator::Path { segments: trimmed });
        }
        if segments.iter().any(|s| s.nth.is_some()) {
            let bare = segments
                .iter()
                .map(|s| PathSegment::new(s.tag.clone(), None))
                .collect();
            let bare = Locator::Path { segments: bare };
            if !variants.contains(&bare) {
                variants.push(bare);
            }
        }
        variants
    }
}

impl Strategy for PathRelaxStrategy {
    fn resolve(
        &self,
        doc: &Document,
        request: &ResolveRequest,
    ) -> Result<Vec<NodeId>, LocatorError> {
        for variant in Self::relaxed_paths(&request.locator) {
            let selector = variant.to_string();
            debug!("Relaxed path: {}", selector);
            let found = doc.query_selector_all(&selector)?;
            if !found.is_empty() {
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }

    fn strategy_type(&self) -> ResolveStrategy {
        ResolveStrategy::PathRelaxation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxed_toggle_selector() {
        let locator = Locator::css(r#"input[type="radio"][name="plan"][value="pro"]"#);
        assert_eq!(
            ToggleRelaxStrategy::relaxed_selector(&locator).as_deref(),
            Some(r#"input[type="radio"][name="plan"]"#)
        );
        assert!(ToggleRelaxStrategy::relaxed_selector(&Locator::css("#plan")).is_none());
        assert!(ToggleRelaxStrategy::relaxed_selector(&Locator::css(r#"input[name="q"]"#)).is_none());
    }

    #[test]
    fn test_relaxed_paths_order() {
        let locator = Locator::parse("body > div:nth-of-type(2) > p:nth-of-type(3)");
        let variants: Vec<String> = PathRelaxStrategy::relaxed_paths(&locator)
            .iter()
            .map(|l| l.to_string())
            .collect();
        assert_eq!(variants, vec!["body > div:nth-of-type(2) > p", "body > div > p"]);

        let no_ordinals = Locator::parse("body > main > p");
        assert!(PathRelaxStrategy::relaxed_paths(&no_ordinals).is_empty());
    }

    #[test]
    fn test_text_hint_prefers_exact() {
        let mut doc = Document::new();
        let body = doc.create_element(doc.root(), "body").unwrap();
        let long = doc.create_element(body, "span").unwrap();
        doc.append_text(long, "Total price").unwrap();
        let exact = doc.create_element(body, "span").unwrap();
        doc.append_text(exact, "Total").unwrap();

        let request = ResolveRequest::new("#missing")
            .with_hint(Some("Total"))
            .with_tag(Some("SPAN"));
        assert_eq!(TextHintStrategy.resolve(&doc, &request).unwrap(), vec![exact]);

        let request = ResolveRequest::new("#missing")
            .with_hint(Some("price"))
            .with_tag(Some("span"));
        assert_eq!(TextHintStrategy.resolve(&doc, &request).unwrap(), vec![long]);
    }

    #[test]
    fn test_text_hint_needs_tag_and_text() {
        let doc = Document::new();
        let request = ResolveRequest::new("#missing").with_hint(Some("Save"));
        assert!(TextHintStrategy.resolve(&doc, &request).unwrap().is_empty());
    }

    #[test]
    fn test_direct_query_reports_syntax_error() {
        let doc = Document::new();
        let request = ResolveRequest::new("button:contains('Go')");
        assert!(matches!(
            DirectQueryStrategy.resolve(&doc, &request),
            Err(LocatorError::SelectorSyntax(_))
        ));
    }
}
