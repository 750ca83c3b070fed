//! Arena-backed document tree

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::{DomError, SelectorError};
use crate::selector::{self, SelectorPart};
use crate::xpath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    node_type: NodeType,
}

/// Element data. Attributes keep their source order.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag_name: String,
    pub attrs: Vec<(String, String)>,
    pub value: String,
    pub checked: bool,
    pub selected_index: Option<usize>,
    pub style: Vec<(String, String)>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag_name: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|raw| raw.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    /// Lower-cased `type` attribute for inputs, `"text"` when absent.
    pub fn input_type(&self) -> Option<String> {
        if self.tag_name != "input" {
            return None;
        }
        Some(
            self.attr("type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string()),
        )
    }

    pub fn is_toggle(&self) -> bool {
        matches!(self.input_type().as_deref(), Some("checkbox") | Some("radio"))
    }

    pub fn is_text_control(&self) -> bool {
        match self.tag_name.as_str() {
            "textarea" => true,
            "input" => !matches!(
                self.input_type().as_deref(),
                Some("checkbox")
                    | Some("radio")
                    | Some("button")
                    | Some("submit")
                    | Some("reset")
                    | Some("image")
                    | Some("file")
                    | Some("hidden")
            ),
            _ => self.has_attr("contenteditable"),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.has_attr("disabled")
    }
}

/// Notification dispatched at a node, appended to the document's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DomEvent {
    Click,
    Input,
    Change,
    Focus,
    KeyDown { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchedEvent {
    pub target: NodeId,
    pub event: DomEvent,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    url: Option<String>,
    active_element: Option<NodeId>,
    scrolled_into_view: Option<NodeId>,
    events: Vec<DispatchedEvent>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                node_type: NodeType::Document,
            }],
            root: NodeId(0),
            url: None,
            active_element: None,
            scrolled_into_view: None,
            events: Vec::new(),
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.url = Some(url.into());
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_url(&mut self, url: Option<String>) {
        self.url = url;
    }

    // ---- construction ----------------------------------------------------

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    /// Creates an element appended under `parent`.
    pub fn create_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        self.node(parent)?;
        if matches!(self.nodes[parent.0].node_type, NodeType::Text(_)) {
            return Err(DomError::InvalidHierarchy {
                parent,
                child: NodeId(self.nodes.len()),
            });
        }
        Ok(self.create_node(Some(parent), NodeType::Element(Element::new(tag))))
    }

    /// Creates an element with the given attributes appended under `parent`.
    pub fn create_element_with(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<NodeId, DomError> {
        let id = self.create_element(parent, tag)?;
        for (name, value) in attrs {
            self.set_attribute(id, name, value)?;
        }
        Ok(id)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        self.element(parent)?;
        Ok(self.create_node(Some(parent), NodeType::Text(text.to_string())))
    }

    /// Removes `node` from its parent; the subtree stays in the arena but is
    /// no longer connected to the document.
    pub fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        self.node(node)?;
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
        if self.active_element == Some(node) {
            self.active_element = None;
        }
        Ok(())
    }

    // ---- structure -------------------------------------------------------

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    pub fn node_type(&self, id: NodeId) -> Option<&NodeType> {
        self.nodes.get(id.0).map(|n| &n.node_type)
    }

    pub fn element(&self, id: NodeId) -> Result<&Element, DomError> {
        match &self.node(id)?.node_type {
            NodeType::Element(element) => Ok(element),
            _ => Err(DomError::NotElement(id)),
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, DomError> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.node_type) {
            Some(NodeType::Element(element)) => Ok(element),
            Some(_) => Err(DomError::NotElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_ok()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().map(|el| el.tag_name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Parent when it is an element (the document node is excluded).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Whether the node's ancestor chain reaches the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// The `<html>` element, or the first element child of the document.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root).into_iter().next()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.all_elements()
            .into_iter()
            .find(|id| self.tag_name(*id) == Some("body"))
    }

    /// Connected elements in document order.
    pub fn all_elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_dfs(self.root, &mut out);
        out
    }

    /// Element descendants of `root` (excluding `root`) in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_dfs(root, &mut out);
        out
    }

    fn collect_elements_dfs(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(node) {
            if self.is_element(*child) {
                out.push(*child);
                self.collect_elements_dfs(*child, out);
            }
        }
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        self.all_elements()
            .into_iter()
            .filter(|id| self.tag_name(*id) == Some(tag.as_str()))
            .collect()
    }

    /// Siblings sharing the element's tag, including the element itself.
    pub fn same_tag_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent(id) else {
            return vec![id];
        };
        let tag = self.tag_name(id);
        self.element_children(parent)
            .into_iter()
            .filter(|sib| self.tag_name(*sib) == tag)
            .collect()
    }

    /// 1-based position among same-tag siblings.
    pub fn nth_of_type(&self, id: NodeId) -> usize {
        self.same_tag_siblings(id)
            .iter()
            .position(|sib| *sib == id)
            .map(|p| p + 1)
            .unwrap_or(1)
    }

    // ---- text ------------------------------------------------------------

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        match &node.node_type {
            NodeType::Text(text) => out.push_str(text),
            _ => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Text of direct text children only.
    pub fn own_text(&self, id: NodeId) -> Vec<&str> {
        self.children(id)
            .iter()
            .filter_map(|c| match &self.nodes[c.0].node_type {
                NodeType::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Text content with whitespace runs collapsed and ends trimmed.
    pub fn normalized_text(&self, id: NodeId) -> String {
        normalize_space(&self.text_content(id))
    }

    // ---- attributes ------------------------------------------------------

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).ok().and_then(|el| el.attr(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let element = self.element_mut(id)?;
        match element.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => element.attrs.push((name.clone(), value.to_string())),
        }
        match name.as_str() {
            "value" if element.tag_name == "input" => element.value = value.to_string(),
            "checked" => element.checked = true,
            _ => {}
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        element.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        Ok(())
    }

    /// First connected element carrying `id`.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.all_elements()
            .into_iter()
            .find(|node| self.get_attribute(*node, "id") == Some(id))
    }

    // ---- queries ---------------------------------------------------------

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let groups = selector::parse_selector_groups(selector)?;
        Ok(self
            .all_elements()
            .into_iter()
            .filter(|candidate| {
                groups
                    .iter()
                    .any(|parts| self.matches_selector_chain(*candidate, parts))
            })
            .collect())
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub fn matches(&self, id: NodeId, selector: &str) -> Result<bool, SelectorError> {
        let groups = selector::parse_selector_groups(selector)?;
        Ok(self.is_element(id)
            && groups
                .iter()
                .any(|parts| self.matches_selector_chain(id, parts)))
    }

    fn matches_selector_chain(&self, node: NodeId, parts: &[SelectorPart]) -> bool {
        let Some((last, rest)) = parts.split_last() else {
            return false;
        };
        if !selector::matches_step(self, node, &last.step) {
            return false;
        }
        if rest.is_empty() {
            return true;
        }
        match last.combinator {
            Some(selector::SelectorCombinator::Child) => self
                .parent_element(node)
                .is_some_and(|parent| self.matches_selector_chain(parent, rest)),
            _ => {
                let mut ancestor = self.parent_element(node);
                while let Some(candidate) = ancestor {
                    if self.matches_selector_chain(candidate, rest) {
                        return true;
                    }
                    ancestor = self.parent_element(candidate);
                }
                false
            }
        }
    }

    pub fn evaluate_xpath(&self, expr: &str) -> Result<Vec<NodeId>, SelectorError> {
        let path = xpath::parse(expr)?;
        Ok(xpath::evaluate(self, &path))
    }

    // ---- live state ------------------------------------------------------

    pub fn value(&self, id: NodeId) -> Option<String> {
        let element = self.element(id).ok()?;
        if element.tag_name == "select" {
            let index = element.selected_index?;
            let option = *self.options(id).get(index)?;
            return Some(self.option_value(option));
        }
        Some(element.value.clone())
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        if self.tag_name(id) == Some("select") {
            let index = self.option_index_by_value(id, value)?;
            return self.set_selected_index(id, index);
        }
        let element = self.element_mut(id)?;
        if !element.is_text_control() {
            return Err(DomError::NotTextControl {
                tag: element.tag_name.clone(),
            });
        }
        element.value = value.to_string();
        Ok(())
    }

    pub fn is_checked(&self, id: NodeId) -> bool {
        self.element(id).map(|el| el.checked).unwrap_or(false)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<(), DomError> {
        let (is_radio, name) = {
            let element = self.element(id)?;
            (
                element.input_type().as_deref() == Some("radio"),
                element.attr("name").map(str::to_string),
            )
        };
        if is_radio && checked {
            if let Some(name) = name {
                for other in self.all_elements() {
                    if other == id {
                        continue;
                    }
                    let same_group = self.element(other).is_ok_and(|el| {
                        el.input_type().as_deref() == Some("radio")
                            && el.attr("name") == Some(name.as_str())
                    });
                    if same_group {
                        self.element_mut(other)?.checked = false;
                    }
                }
            }
        }
        self.element_mut(id)?.checked = checked;
        Ok(())
    }

    pub fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|node| self.tag_name(*node) == Some("option"))
            .collect()
    }

    fn option_value(&self, option: NodeId) -> String {
        self.get_attribute(option, "value")
            .map(str::to_string)
            .unwrap_or_else(|| self.normalized_text(option))
    }

    fn option_index_by_value(&self, select: NodeId, value: &str) -> Result<usize, DomError> {
        self.options(select)
            .into_iter()
            .position(|opt| self.option_value(opt) == value)
            .ok_or_else(|| DomError::OptionNotFound(format!("value '{}'", value)))
    }

    pub fn selected_index(&self, select: NodeId) -> Option<usize> {
        self.element(select).ok().and_then(|el| el.selected_index)
    }

    /// Display text of the selected option.
    pub fn selected_text(&self, select: NodeId) -> Option<String> {
        let index = self.selected_index(select)?;
        self.options(select)
            .get(index)
            .map(|opt| self.normalized_text(*opt))
    }

    pub fn set_selected_index(&mut self, select: NodeId, index: usize) -> Result<(), DomError> {
        let element = self.element(select)?;
        if element.tag_name != "select" {
            return Err(DomError::NotSelect {
                tag: element.tag_name.clone(),
            });
        }
        if index >= self.options(select).len() {
            return Err(DomError::OptionNotFound(format!("index {}", index)));
        }
        self.element_mut(select)?.selected_index = Some(index);
        Ok(())
    }

    // ---- focus, scroll, style -------------------------------------------

    pub fn focus(&mut self, id: NodeId) -> Result<(), DomError> {
        self.element(id)?;
        self.active_element = Some(id);
        self.dispatch(id, DomEvent::Focus)
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    pub fn scroll_into_view(&mut self, id: NodeId) -> Result<(), DomError> {
        self.element(id)?;
        self.scrolled_into_view = Some(id);
        Ok(())
    }

    pub fn scrolled_into_view(&self) -> Option<NodeId> {
        self.scrolled_into_view
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id).ok().and_then(|el| {
            el.style
                .iter()
                .find(|(key, _)| key == property)
                .map(|(_, v)| v.as_str())
        })
    }

    /// Sets an inline style property; an empty value removes it.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        element.style.retain(|(key, _)| key != property);
        if !value.is_empty() {
            element.style.push((property.to_string(), value.to_string()));
        }
        Ok(())
    }

    // ---- events ----------------------------------------------------------

    pub fn dispatch(&mut self, target: NodeId, event: DomEvent) -> Result<(), DomError> {
        self.node(target)?;
        trace!(target = target.0, ?event, "dispatch");
        self.events.push(DispatchedEvent { target, event });
        Ok(())
    }

    /// Dispatches a click with the native checkbox/radio side effects.
    pub fn click(&mut self, id: NodeId) -> Result<(), DomError> {
        let element = self.element(id)?;
        if element.is_disabled() {
            return Err(DomError::Disabled {
                tag: element.tag_name.clone(),
            });
        }
        let kind = element.input_type();
        let was_checked = element.checked;
        self.dispatch(id, DomEvent::Click)?;
        match kind.as_deref() {
            Some("checkbox") => {
                self.set_checked(id, !was_checked)?;
                self.dispatch(id, DomEvent::Change)?;
            }
            Some("radio") if !was_checked => {
                self.set_checked(id, true)?;
                self.dispatch(id, DomEvent::Change)?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    pub fn events_for(&self, target: NodeId) -> Vec<&DomEvent> {
        self.events
            .iter()
            .filter(|e| e.target == target)
            .map(|e| &e.event)
            .collect()
    }

    pub fn count_events(&self, target: NodeId, event: &DomEvent) -> usize {
        self.events
            .iter()
            .filter(|e| e.target == target && &e.event == event)
            .count()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

/// Collapses whitespace runs to one space and trims both ends.
pub fn normalize_space(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let html = doc.create_element(doc.root(), "html").unwrap();
        let body = doc.create_element(html, "body").unwrap();
        let a = doc
            .create_element_with(body, "input", &[("type", "radio"), ("name", "plan"), ("value", "a")])
            .unwrap();
        let b = doc
            .create_element_with(body, "input", &[("type", "radio"), ("name", "plan"), ("value", "b")])
            .unwrap();
        (doc, body, a, b)
    }

    #[test]
    fn test_radio_click_unchecks_group() {
        let (mut doc, _, a, b) = form();
        doc.click(a).unwrap();
        assert!(doc.is_checked(a));
        doc.click(b).unwrap();
        assert!(!doc.is_checked(a));
        assert!(doc.is_checked(b));
    }

    #[test]
    fn test_checkbox_click_toggles() {
        let mut doc = Document::new();
        let body = doc.create_element(doc.root(), "body").unwrap();
        let cb = doc
            .create_element_with(body, "input", &[("type", "checkbox")])
            .unwrap();
        doc.click(cb).unwrap();
        assert!(doc.is_checked(cb));
        doc.click(cb).unwrap();
        assert!(!doc.is_checked(cb));
        assert_eq!(doc.count_events(cb, &DomEvent::Click), 2);
    }

    #[test]
    fn test_disabled_rejects_click() {
        let mut doc = Document::new();
        let body = doc.create_element(doc.root(), "body").unwrap();
        let btn = doc
            .create_element_with(body, "button", &[("disabled", "")])
            .unwrap();
        assert!(matches!(doc.click(btn), Err(DomError::Disabled { .. })));
        assert!(doc.events().is_empty());

        doc.remove_attribute(btn, "DISABLED").unwrap();
        assert!(doc.click(btn).is_ok());
        assert_eq!(doc.count_events(btn, &DomEvent::Click), 1);
    }

    #[test]
    fn test_detach_disconnects() {
        let (mut doc, _, a, _) = form();
        assert!(doc.is_connected(a));
        doc.detach(a).unwrap();
        assert!(!doc.is_connected(a));
        assert_eq!(doc.elements_by_tag("input").len(), 1);
    }

    #[test]
    fn test_select_value_and_text() {
        let mut doc = Document::new();
        let body = doc.create_element(doc.root(), "body").unwrap();
        let select = doc.create_element(body, "select").unwrap();
        for (value, label) in [("fr", "France"), ("de", "Germany")] {
            let opt = doc.create_element_with(select, "option", &[("value", value)]).unwrap();
            doc.append_text(opt, label).unwrap();
        }
        doc.set_value(select, "de").unwrap();
        assert_eq!(doc.selected_index(select), Some(1));
        assert_eq!(doc.selected_text(select).as_deref(), Some("Germany"));
        assert!(doc.set_value(select, "es").is_err());
    }

    #[test]
    fn test_nth_of_type_and_normalized_text() {
        let mut doc = Document::new();
        let body = doc.create_element(doc.root(), "body").unwrap();
        let _first = doc.create_element(body, "p").unwrap();
        let second = doc.create_element(body, "p").unwrap();
        doc.append_text(second, "  hello \n  world ").unwrap();
        assert_eq!(doc.nth_of_type(second), 2);
        assert_eq!(doc.normalized_text(second), "hello world");
    }
}
