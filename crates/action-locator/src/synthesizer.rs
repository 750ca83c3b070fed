//! Selector synthesis
//!
//! Produces one locator per observed element by walking an ordered rule
//! table; the first rule whose locator matches exactly that element (count
//! == 1 by live query) wins. The structural path is always the last resort.

use crate::{
    errors::LocatorError,
    stability::StabilityClassifier,
    types::{Locator, PathSegment},
};
use dom_snapshot::{escape_ident, escape_string, Document, NodeId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Synthesis rules in their default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynthesisRule {
    /// `input[type=T][name=N]` (+ `[value=V]`) for radios and checkboxes
    ToggleInput,
    /// `tag[name=N]` for form controls
    NamedInput,
    /// `#id` for a classifier-approved, document-unique id
    StableId,
    /// Text match for text-bearing tags
    TextAnchor,
    /// `.a.b` built from classifier-approved class tokens
    StableClasses,
    /// `tag[data-x=V]`
    DataAttribute,
    /// `label[for=F]`
    LabelFor,
    /// Tag path with sibling ordinals up to the root container
    StructuralPath,
}

impl SynthesisRule {
    /// Get rule name as string
    pub fn name(&self) -> &'static str {
        match self {
            SynthesisRule::ToggleInput => "toggle-input",
            SynthesisRule::NamedInput => "named-input",
            SynthesisRule::StableId => "stable-id",
            SynthesisRule::TextAnchor => "text-anchor",
            SynthesisRule::StableClasses => "stable-classes",
            SynthesisRule::DataAttribute => "data-attribute",
            SynthesisRule::LabelFor => "label-for",
            SynthesisRule::StructuralPath => "structural-path",
        }
    }
}

/// Priority policy for the synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisPolicy {
    /// Attribute rules in priority order. The structural path always runs
    /// last, whether or not it is listed.
    pub order: Vec<SynthesisRule>,

    /// Tags eligible for a text anchor
    pub text_tags: Vec<String>,

    /// Text must be shorter than this to anchor on
    pub max_text_len: usize,

    /// Text at or above this length uses a containment match
    pub contains_threshold: usize,

    /// Characters kept for a containment match
    pub contains_prefix_len: usize,

    /// Form controls eligible for the named-input rule
    pub named_tags: Vec<String>,
}

impl Default for SynthesisPolicy {
    fn default() -> Self {
        let words = |list: &[&str]| -> Vec<String> { list.iter().map(|s| s.to_string()).collect() };
        Self {
            order: vec![
                SynthesisRule::ToggleInput,
                SynthesisRule::NamedInput,
                SynthesisRule::StableId,
                SynthesisRule::TextAnchor,
                SynthesisRule::StableClasses,
                SynthesisRule::DataAttribute,
                SynthesisRule::LabelFor,
            ],
            text_tags: words(&[
                "button", "a", "label", "span", "summary", "li", "td", "th", "h1", "h2", "h3",
                "h4", "h5", "h6", "legend", "option",
            ]),
            max_text_len: 100,
            contains_threshold: crate::types::TEXT_CONTAINS_THRESHOLD,
            contains_prefix_len: crate::types::TEXT_CONTAINS_PREFIX,
            named_tags: words(&["input", "select", "textarea"]),
        }
    }
}

/// Deterministic locator synthesis over a live document
#[derive(Debug, Clone, Default)]
pub struct SelectorSynthesizer {
    classifier: StabilityClassifier,
    policy: SynthesisPolicy,
}

impl SelectorSynthesizer {
    /// Create a synthesizer
    pub fn new(classifier: StabilityClassifier, policy: SynthesisPolicy) -> Self {
        Self { classifier, policy }
    }

    /// Classifier used to gate ids, classes and attribute values
    pub fn classifier(&self) -> &StabilityClassifier {
        &self.classifier
    }

    /// Locator for `node`, or `None` when no rule applies (for example a
    /// detached element).
    pub fn synthesize(&self, doc: &Document, node: NodeId) -> Option<Locator> {
        self.synthesize_with_rule(doc, node).map(|(_, locator)| locator)
    }

    /// Like [`synthesize`](Self::synthesize), reporting an error instead of
    /// `None`.
    pub fn try_synthesize(
        &self,
        doc: &Document,
        node: NodeId,
    ) -> Result<(SynthesisRule, Locator), LocatorError> {
        self.synthesize_with_rule(doc, node).ok_or_else(|| {
            LocatorError::SynthesisFailed(format!("no locator for node {}", node.0))
        })
    }

    /// Locator for `node` together with the rule that produced it
    pub fn synthesize_with_rule(
        &self,
        doc: &Document,
        node: NodeId,
    ) -> Option<(SynthesisRule, Locator)> {
        if !doc.is_element(node) || !doc.is_connected(node) {
            debug!(node = node.0, "element is detached; nothing to synthesize");
            return None;
        }

        let rules = self
            .policy
            .order
            .iter()
            .copied()
            .filter(|rule| *rule != SynthesisRule::StructuralPath)
            .chain(std::iter::once(SynthesisRule::StructuralPath));

        for rule in rules {
            let candidate = match rule {
                SynthesisRule::ToggleInput => self.toggle_input(doc, node),
                SynthesisRule::NamedInput => self.named_input(doc, node),
                SynthesisRule::StableId => self.stable_id(doc, node),
                SynthesisRule::TextAnchor => self.text_anchor(doc, node),
                SynthesisRule::StableClasses => self.stable_classes(doc, node),
                SynthesisRule::DataAttribute => self.data_attribute(doc, node),
                SynthesisRule::LabelFor => self.label_for(doc, node),
                SynthesisRule::StructuralPath => self.structural_path(doc, node),
            };
            match candidate {
                Some(locator) => {
                    debug!(rule = rule.name(), locator = %locator, "synthesized locator");
                    return Some((rule, locator));
                }
                None => trace!(rule = rule.name(), node = node.0, "rule did not apply"),
            }
        }
        None
    }

    fn toggle_input(&self, doc: &Document, node: NodeId) -> Option<Locator> {
        let element = doc.element(node).ok()?;
        let kind = element.input_type()?;
        if kind != "radio" && kind != "checkbox" {
            return None;
        }
        let name = element.attr("name").filter(|n| !n.is_empty())?;
        let base = format!(
            "input[type=\"{}\"][name=\"{}\"]",
            escape_string(&kind),
            escape_string(name)
        );
        let value = element.attr("value").map(escape_string);
        let candidates = match (kind.as_str(), value) {
            ("radio", Some(value)) => vec![format!("{}[value=\"{}\"]", base, value)],
            ("checkbox", Some(value)) => vec![base.clone(), format!("{}[value=\"{}\"]", base, value)],
            _ => vec![base],
        };
        candidates
            .into_iter()
            .find(|selector| unique_css(doc, selector, node))
            .map(Locator::css)
    }

    fn named_input(&self, doc: &Document, node: NodeId) -> Option<Locator> {
        let element = doc.element(node).ok()?;
        if !self.policy.named_tags.iter().any(|t| *t == element.tag_name) {
            return None;
        }
        let name = element.attr("name").filter(|n| !n.is_empty())?;
        let selector = format!("{}[name=\"{}\"]", element.tag_name, escape_string(name));
        unique_css(doc, &selector, node).then(|| Locator::css(selector))
    }

    fn stable_id(&self, doc: &Document, node: NodeId) -> Option<Locator> {
        let id = doc.get_attribute(node, "id")?;
        if !self.classifier.is_stable_identifier(id) {
            return None;
        }
        if doc.element_by_id(id) != Some(node) {
            return None;
        }
        let selector = format!("#{}", escape_ident(id));
        unique_css(doc, &selector, node).then(|| Locator::css(selector))
    }

    fn text_anchor(&self, doc: &Document, node: NodeId) -> Option<Locator> {
        let tag = doc.tag_name(node)?;
        if !self.policy.text_tags.iter().any(|t| t == tag) {
            return None;
        }
        let text = doc.normalized_text(node);
        if text.is_empty() || text.chars().count() >= self.policy.max_text_len {
            return None;
        }
        let locator = Locator::text_anchor_with(
            tag,
            &text,
            self.policy.contains_threshold,
            self.policy.contains_prefix_len,
        );
        let expr = locator.xpath_expr()?;
        match doc.evaluate_xpath(&expr) {
            Ok(found) if found == [node] => Some(locator),
            _ => None,
        }
    }

    fn stable_classes(&self, doc: &Document, node: NodeId) -> Option<Locator> {
        let element = doc.element(node).ok()?;
        let stable: Vec<&str> = element
            .classes()
            .into_iter()
            .filter(|c| self.classifier.is_stable_class(c))
            .collect();
        let first = stable.first()?;
        let joined: String = stable.iter().map(|c| format!(".{}", escape_ident(c))).collect();
        if unique_css(doc, &joined, node) {
            return Some(Locator::css(joined));
        }
        let single = format!(".{}", escape_ident(first));
        unique_css(doc, &single, node).then(|| Locator::css(single))
    }

    fn data_attribute(&self, doc: &Document, node: NodeId) -> Option<Locator> {
        let element = doc.element(node).ok()?;
        element
            .attrs
            .iter()
            .filter(|(name, value)| name.starts_with("data-") && self.classifier.is_stable_value(value))
            .map(|(name, value)| {
                format!(
                    "{}[{}=\"{}\"]",
                    escape_ident(&element.tag_name),
                    escape_ident(name),
                    escape_string(value)
                )
            })
            .find(|selector| unique_css(doc, selector, node))
            .map(Locator::css)
    }

    fn label_for(&self, doc: &Document, node: NodeId) -> Option<Locator> {
        if doc.tag_name(node) != Some("label") {
            return None;
        }
        let target = doc.get_attribute(node, "for")?;
        if !self.classifier.is_stable_identifier(target) {
            return None;
        }
        let selector = format!("label[for=\"{}\"]", escape_string(target));
        unique_css(doc, &selector, node).then(|| Locator::css(selector))
    }

    /// Path from the root container (`body`, else the document element)
    /// down to `node`.
    fn structural_path(&self, doc: &Document, node: NodeId) -> Option<Locator> {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let tag = doc.tag_name(id)?.to_string();
            let parent = doc.parent_element(id);
            let is_container = tag == "body" || parent.is_none();
            let nth = if is_container || doc.same_tag_siblings(id).len() < 2 {
                None
            } else {
                Some(doc.nth_of_type(id))
            };
            segments.push(PathSegment::new(tag, nth));
            if is_container {
                break;
            }
            current = parent;
        }
        segments.reverse();
        let locator = Locator::Path { segments };
        let selector = locator.css_selector()?;
        unique_css(doc, &selector, node).then_some(locator)
    }
}

fn unique_css(doc: &Document, selector: &str, node: NodeId) -> bool {
    match doc.query_selector_all(selector) {
        Ok(found) => found == [node],
        Err(err) => {
            trace!(selector, error = %err, "candidate selector rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> (Document, NodeId) {
        let mut doc = Document::with_url("https://app.example.com/");
        let html = doc.create_element(doc.root(), "html").unwrap();
        let body = doc.create_element(html, "body").unwrap();
        (doc, body)
    }

    fn synth() -> SelectorSynthesizer {
        SelectorSynthesizer::default()
    }

    #[test]
    fn test_stable_id() {
        let (mut doc, body) = shell();
        let input = doc
            .create_element_with(body, "div", &[("id", "profile-card")])
            .unwrap();
        let (rule, locator) = synth().synthesize_with_rule(&doc, input).unwrap();
        assert_eq!(rule, SynthesisRule::StableId);
        assert_eq!(locator.to_string(), "#profile-card");
    }

    #[test]
    fn test_id_with_special_chars_is_escaped() {
        let (mut doc, body) = shell();
        let node = doc
            .create_element_with(body, "div", &[("id", "user.name")])
            .unwrap();
        assert_eq!(synth().synthesize(&doc, node).unwrap().to_string(), r"#user\.name");
    }

    #[test]
    fn test_duplicate_id_is_not_used() {
        let (mut doc, body) = shell();
        let _first = doc.create_element_with(body, "div", &[("id", "dup")]).unwrap();
        let second = doc.create_element_with(body, "div", &[("id", "dup")]).unwrap();
        let (rule, _) = synth().synthesize_with_rule(&doc, second).unwrap();
        assert_eq!(rule, SynthesisRule::StructuralPath);
    }

    #[test]
    fn test_poisoned_id_falls_through() {
        let (mut doc, body) = shell();
        let node = doc
            .create_element_with(body, "div", &[("id", "{{row.id}}"), ("class", "card")])
            .unwrap();
        let locator = synth().synthesize(&doc, node).unwrap();
        assert_eq!(locator.to_string(), ".card");
    }

    #[test]
    fn test_radio_group_prefers_name_and_value() {
        let (mut doc, body) = shell();
        let mut radios = Vec::new();
        for (i, value) in ["basic", "pro", "enterprise"].iter().enumerate() {
            let id = format!("plan-{}", i);
            radios.push(
                doc.create_element_with(
                    body,
                    "input",
                    &[
                        ("type", "radio"),
                        ("name", "plan"),
                        ("value", *value),
                        ("id", id.as_str()),
                    ],
                )
                .unwrap(),
            );
        }
        assert_eq!(
            synth().synthesize(&doc, radios[1]).unwrap().to_string(),
            r#"input[type="radio"][name="plan"][value="pro"]"#
        );
    }

    #[test]
    fn test_checkbox_adds_value_only_when_needed() {
        let (mut doc, body) = shell();
        let lone = doc
            .create_element_with(body, "input", &[("type", "checkbox"), ("name", "terms"), ("value", "yes")])
            .unwrap();
        assert_eq!(
            synth().synthesize(&doc, lone).unwrap().to_string(),
            r#"input[type="checkbox"][name="terms"]"#
        );
        let a = doc
            .create_element_with(body, "input", &[("type", "checkbox"), ("name", "topics"), ("value", "rust")])
            .unwrap();
        let _b = doc
            .create_element_with(body, "input", &[("type", "checkbox"), ("name", "topics"), ("value", "go")])
            .unwrap();
        assert_eq!(
            synth().synthesize(&doc, a).unwrap().to_string(),
            r#"input[type="checkbox"][name="topics"][value="rust"]"#
        );
    }

    #[test]
    fn test_named_input_before_id() {
        let (mut doc, body) = shell();
        let input = doc
            .create_element_with(body, "input", &[("name", "email"), ("id", "email-field")])
            .unwrap();
        assert_eq!(
            synth().synthesize(&doc, input).unwrap().to_string(),
            r#"input[name="email"]"#
        );
    }

    #[test]
    fn test_button_text_anchor() {
        let (mut doc, body) = shell();
        let button = doc.create_element(body, "button").unwrap();
        doc.append_text(button, " Place order ").unwrap();
        let (rule, locator) = synth().synthesize_with_rule(&doc, button).unwrap();
        assert_eq!(rule, SynthesisRule::TextAnchor);
        assert_eq!(
            locator.to_string(),
            r#"xpath=//button[normalize-space(.)="Place order"]"#
        );
    }

    #[test]
    fn test_ambiguous_text_falls_back() {
        let (mut doc, body) = shell();
        for _ in 0..2 {
            let b = doc
                .create_element_with(body, "button", &[("class", "ng-touched")])
                .unwrap();
            doc.append_text(b, "Delete").unwrap();
        }
        let second = doc.elements_by_tag("button")[1];
        assert_eq!(
            synth().synthesize(&doc, second).unwrap().to_string(),
            "body > button:nth-of-type(2)"
        );
    }

    #[test]
    fn test_classes_filtered_and_single_class() {
        let (mut doc, body) = shell();
        let _other = doc
            .create_element_with(body, "div", &[("class", "panel")])
            .unwrap();
        let node = doc
            .create_element_with(body, "div", &[("class", "panel wide ng-dirty selected")])
            .unwrap();
        assert_eq!(synth().synthesize(&doc, node).unwrap().to_string(), ".panel.wide");
    }

    #[test]
    fn test_data_attribute() {
        let (mut doc, body) = shell();
        let _a = doc.create_element_with(body, "div", &[("data-row", "1")]).unwrap();
        let b = doc
            .create_element_with(body, "div", &[("data-row", "2"), ("data-bind", "if(x)")])
            .unwrap();
        assert_eq!(
            synth().synthesize(&doc, b).unwrap().to_string(),
            r#"div[data-row="2"]"#
        );
    }

    #[test]
    fn test_label_for() {
        let (mut doc, body) = shell();
        let label = doc
            .create_element_with(body, "label", &[("for", "email")])
            .unwrap();
        doc.create_element(label, "i").unwrap();
        let policy = SynthesisPolicy {
            text_tags: vec![],
            ..Default::default()
        };
        let s = SelectorSynthesizer::new(StabilityClassifier::default(), policy);
        assert_eq!(s.synthesize(&doc, label).unwrap().to_string(), r#"label[for="email"]"#);
    }

    #[test]
    fn test_structural_path_ordinals() {
        let (mut doc, body) = shell();
        let _d1 = doc.create_element(body, "div").unwrap();
        let d2 = doc.create_element(body, "div").unwrap();
        let ul = doc.create_element(d2, "ul").unwrap();
        let _li1 = doc.create_element(ul, "li").unwrap();
        let li2 = doc.create_element(ul, "li").unwrap();
        let span = doc.create_element(li2, "em").unwrap();
        assert_eq!(
            synth().synthesize(&doc, span).unwrap().to_string(),
            "body > div:nth-of-type(2) > ul > li:nth-of-type(2) > em"
        );
    }

    #[test]
    fn test_namespaced_tags_are_escaped() {
        use crate::resolver::{DefaultElementResolver, ElementResolver};
        use crate::types::ResolveRequest;

        let (mut doc, body) = shell();
        let _first = doc.create_element(body, "svg:rect").unwrap();
        let second = doc.create_element(body, "svg:rect").unwrap();
        let tagged = doc
            .create_element_with(body, "svg:circle", &[("data-kind", "marker")])
            .unwrap();

        let (rule, locator) = synth().synthesize_with_rule(&doc, second).unwrap();
        assert_eq!(rule, SynthesisRule::StructuralPath);
        assert_eq!(locator.to_string(), r"body > svg\:rect:nth-of-type(2)");

        let resolved = DefaultElementResolver::default()
            .resolve(&doc, &ResolveRequest::new(&locator.to_string()))
            .unwrap();
        assert_eq!(resolved.node, second);

        assert_eq!(
            synth().synthesize(&doc, tagged).unwrap().to_string(),
            r#"svg\:circle[data-kind="marker"]"#
        );
    }

    #[test]
    fn test_detached_element_yields_none() {
        let (mut doc, body) = shell();
        let node = doc.create_element_with(body, "div", &[("id", "gone")]).unwrap();
        doc.detach(node).unwrap();
        assert!(synth().synthesize(&doc, node).is_none());
        assert!(synth().try_synthesize(&doc, node).is_err());
    }

    #[test]
    fn test_deterministic() {
        let (mut doc, body) = shell();
        let node = doc.create_element_with(body, "section", &[("class", "hero")]).unwrap();
        let first = synth().synthesize(&doc, node);
        assert_eq!(first, synth().synthesize(&doc, node));
    }

    #[test]
    fn test_policy_order_is_tunable() {
        let (mut doc, body) = shell();
        let input = doc
            .create_element_with(body, "input", &[("name", "email"), ("id", "email-field")])
            .unwrap();
        let policy = SynthesisPolicy {
            order: vec![SynthesisRule::StableId, SynthesisRule::NamedInput],
            ..Default::default()
        };
        let s = SelectorSynthesizer::new(StabilityClassifier::default(), policy);
        assert_eq!(s.synthesize(&doc, input).unwrap().to_string(), "#email-field");
    }
}
