//! In-memory DOM
//!
//! A small arena-backed document used to exercise the engine without a
//! browser. Supports the selector subset used by the selector tables:
//! compound selectors (`tag`, `#id`, `.class`, `[attr]`, `[attr="v"]`),
//! descendant combinators and comma-separated lists.
//!
//! Observers queue events synchronously on mutation, which is enough to
//! model `MutationObserver` delivery for a single-threaded engine.

use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{Dom, DomError, DomEvent, ObserverId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    current_time: f64,
    clicks: u32,
}

#[derive(Debug, Clone)]
enum ObserverKind {
    Children(NodeId),
    Attribute(NodeId, String),
    Click(NodeId),
}

#[derive(Debug, Default)]
struct Inner {
    nodes: Vec<NodeData>,
    observers: BTreeMap<ObserverId, ObserverKind>,
    next_observer: u32,
    events: Vec<DomEvent>,
}

pub struct MemoryDom {
    inner: RefCell<Inner>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// A document with a single `<body>` root.
    pub fn new() -> Self {
        let mut inner = Inner::default();
        inner.nodes.push(NodeData { tag: "body".into(), ..NodeData::default() });
        Self { inner: RefCell::new(inner) }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Create a detached element from a compound selector such as
    /// `a.link[href="/foo"]`.
    pub fn create(&self, spec: &str) -> NodeId {
        let compound = parse_compound(spec.trim());
        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.nodes.len());
        inner.nodes.push(NodeData {
            tag: compound.tag.unwrap_or_else(|| "div".into()),
            classes: compound.classes,
            attributes: compound
                .id
                .map(|id| ("id".to_string(), id))
                .into_iter()
                .chain(compound.attributes.into_iter().map(|(k, v)| (k, v.unwrap_or_default())))
                .collect(),
            ..NodeData::default()
        });
        id
    }

    /// Create an element from `spec` and append it to `parent`.
    pub fn add(&self, parent: &NodeId, spec: &str) -> NodeId {
        let node = self.create(spec);
        self.attach(*parent, node, None);
        node
    }

    /// Like [`add`](Self::add), setting text content.
    pub fn add_text(&self, parent: &NodeId, spec: &str, text: &str) -> NodeId {
        let node = self.add(parent, spec);
        self.set_text(&node, text);
        node
    }

    pub fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.inner.borrow().nodes[node.0].children.clone()
    }

    pub fn current_time(&self, node: &NodeId) -> f64 {
        self.inner.borrow().nodes[node.0].current_time
    }

    pub fn click_count(&self, node: &NodeId) -> u32 {
        self.inner.borrow().nodes[node.0].clicks
    }

    /// Number of live observers and listeners.
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Number of elements matching `selector` in the document.
    pub fn count(&self, selector: &str) -> usize {
        self.query_all(None, selector).len()
    }

    fn attach(&self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        let mut inner = self.inner.borrow_mut();
        inner.detach(node);

        let children = &mut inner.nodes[parent.0].children;
        let index = before
            .and_then(|b| children.iter().position(|&c| c == b))
            .unwrap_or(children.len());
        children.insert(index, node);
        inner.nodes[node.0].parent = Some(parent);

        let fired: Vec<ObserverId> = inner
            .observers
            .iter()
            .filter_map(|(&id, kind)| match kind {
                ObserverKind::Children(target) if *target == parent => Some(id),
                _ => None,
            })
            .collect();
        inner.events.extend(fired.into_iter().map(DomEvent::ChildrenAdded));
    }

    fn register(&self, kind: ObserverKind) -> ObserverId {
        let mut inner = self.inner.borrow_mut();
        inner.next_observer += 1;
        let id = ObserverId(inner.next_observer);
        inner.observers.insert(id, kind);
        id
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = inner.nodes[root.0].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(inner.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    fn matches(&self, node: NodeId, selector: &[Vec<Compound>]) -> bool {
        let inner = self.inner.borrow();
        selector.iter().any(|complex| inner.matches_complex(node, complex))
    }
}

impl Inner {
    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let data = &self.nodes[node.0];
        if let Some(tag) = &compound.tag {
            if !data.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &compound.id {
            if self.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !compound.classes.iter().all(|c| data.classes.contains(c)) {
            return false;
        }
        compound.attributes.iter().all(|(name, value)| match (self.attribute(node, name), value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    /// Right-to-left match; descendant combinators only, so a greedy
    /// ancestor walk is exact.
    fn matches_complex(&self, node: NodeId, complex: &[Compound]) -> bool {
        let Some((last, rest)) = complex.split_last() else {
            return false;
        };
        if !self.matches_compound(node, last) {
            return false;
        }

        let mut ancestor = self.nodes[node.0].parent;
        for compound in rest.iter().rev() {
            loop {
                match ancestor {
                    None => return false,
                    Some(a) => {
                        ancestor = self.nodes[a.0].parent;
                        if self.matches_compound(a, compound) {
                            break;
                        }
                    }
                }
            }
        }
        true
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        let data = &self.nodes[node.0];
        if name == "class" {
            return None;
        }
        data.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn query(&self, root: Option<&NodeId>, selector: &str) -> Option<NodeId> {
        let parsed = parse_selector(selector);
        self.descendants(root.copied().unwrap_or(self.root()))
            .into_iter()
            .find(|&n| self.matches(n, &parsed))
    }

    fn query_all(&self, root: Option<&NodeId>, selector: &str) -> Vec<NodeId> {
        let parsed = parse_selector(selector);
        self.descendants(root.copied().unwrap_or(self.root()))
            .into_iter()
            .filter(|&n| self.matches(n, &parsed))
            .collect()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.inner.borrow().nodes[node.0].parent
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        let inner = self.inner.borrow();
        let mut current = *node;
        loop {
            if current == NodeId(0) {
                return true;
            }
            match inner.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn create_element(&self, tag: &str) -> Result<NodeId, DomError> {
        if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(DomError::CreateElement(tag.to_string()));
        }
        Ok(self.create(tag))
    }

    fn insert_before(&self, parent: &NodeId, node: &NodeId, reference: &NodeId) -> Result<(), DomError> {
        if self.parent(reference) != Some(*parent) {
            return Err(DomError::Operation("reference is not a child of parent".into()));
        }
        self.attach(*parent, *node, Some(*reference));
        Ok(())
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) -> Result<(), DomError> {
        self.attach(*parent, *child, None);
        Ok(())
    }

    fn remove(&self, node: &NodeId) {
        self.inner.borrow_mut().detach(*node);
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.inner.borrow().nodes[node.0].classes.iter().any(|c| c == class)
    }

    fn add_class(&self, node: &NodeId, class: &str) {
        if !self.has_class(node, class) {
            self.inner.borrow_mut().nodes[node.0].classes.push(class.to_string());
        }
    }

    fn remove_class(&self, node: &NodeId, class: &str) {
        self.inner.borrow_mut().nodes[node.0].classes.retain(|c| c != class);
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.inner.borrow().attribute(*node, name).map(str::to_string)
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) {
        let mut inner = self.inner.borrow_mut();
        let data = &mut inner.nodes[node.0];
        match data.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) if v == value => return,
            Some((_, v)) => *v = value.to_string(),
            None => data.attributes.push((name.to_string(), value.to_string())),
        }

        let fired: Vec<ObserverId> = inner
            .observers
            .iter()
            .filter_map(|(&id, kind)| match kind {
                ObserverKind::Attribute(target, attr) if *target == *node && attr == name => Some(id),
                _ => None,
            })
            .collect();
        inner.events.extend(fired.into_iter().map(DomEvent::AttributeChanged));
    }

    fn text(&self, node: &NodeId) -> String {
        let mut out = self.inner.borrow().nodes[node.0].text.clone();
        for child in self.children(node) {
            out.push_str(&self.text(&child));
        }
        out
    }

    fn set_text(&self, node: &NodeId, text: &str) {
        let children = self.children(node);
        let mut inner = self.inner.borrow_mut();
        for child in children {
            inner.detach(child);
        }
        inner.nodes[node.0].text = text.to_string();
    }

    fn click(&self, node: &NodeId) {
        let mut inner = self.inner.borrow_mut();
        inner.nodes[node.0].clicks += 1;
        let fired: Vec<ObserverId> = inner
            .observers
            .iter()
            .filter_map(|(&id, kind)| match kind {
                ObserverKind::Click(target) if *target == *node => Some(id),
                _ => None,
            })
            .collect();
        inner.events.extend(fired.into_iter().map(DomEvent::Clicked));
    }

    fn seek_media_by(&self, media: &NodeId, seconds: f64) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        let data = &mut inner.nodes[media.0];
        if !data.tag.eq_ignore_ascii_case("video") {
            return Err(DomError::Operation(format!("<{}> is not a media element", data.tag)));
        }
        data.current_time = (data.current_time + seconds).max(0.0);
        Ok(())
    }

    fn observe_children(&self, target: &NodeId) -> Result<ObserverId, DomError> {
        Ok(self.register(ObserverKind::Children(*target)))
    }

    fn observe_attribute(&self, target: &NodeId, attribute: &str) -> Result<ObserverId, DomError> {
        Ok(self.register(ObserverKind::Attribute(*target, attribute.to_string())))
    }

    fn listen_click(&self, target: &NodeId) -> Result<ObserverId, DomError> {
        Ok(self.register(ObserverKind::Click(*target)))
    }

    fn disconnect(&self, id: ObserverId) {
        let mut inner = self.inner.borrow_mut();
        inner.observers.remove(&id);
        inner.events.retain(|e| e.observer() != id);
    }

    fn drain_events(&self) -> Vec<DomEvent> {
        std::mem::take(&mut self.inner.borrow_mut().events)
    }
}

// =============================================================================
// Selector parsing
// =============================================================================

#[derive(Debug, Default, Clone, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

/// Comma-separated list of descendant chains.
fn parse_selector(selector: &str) -> Vec<Vec<Compound>> {
    split_outside_brackets(selector, ',')
        .into_iter()
        .map(|complex| {
            split_outside_brackets(complex, ' ')
                .into_iter()
                .filter(|part| !part.is_empty())
                .map(parse_compound)
                .collect()
        })
        .filter(|complex: &Vec<Compound>| !complex.is_empty())
        .collect()
}

fn split_outside_brackets(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(input[start..].trim());
    parts
}

fn parse_compound(input: &str) -> Compound {
    let mut compound = Compound::default();
    let bytes = input.as_bytes();
    let mut pos = 0;

    let name_end = |from: usize| {
        bytes[from..]
            .iter()
            .position(|&b| matches!(b, b'.' | b'#' | b'['))
            .map(|i| from + i)
            .unwrap_or(bytes.len())
    };

    let tag_end = name_end(0);
    if tag_end > 0 {
        compound.tag = Some(input[..tag_end].to_ascii_lowercase());
    }
    pos = pos.max(tag_end);

    while pos < bytes.len() {
        match bytes[pos] {
            b'.' => {
                let end = name_end(pos + 1);
                compound.classes.push(input[pos + 1..end].to_string());
                pos = end;
            }
            b'#' => {
                let end = name_end(pos + 1);
                compound.id = Some(input[pos + 1..end].to_string());
                pos = end;
            }
            b'[' => {
                let end = find_bracket_end(input, pos + 1);
                let body = &input[pos + 1..end];
                let attr = match body.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                        (name.trim().to_string(), Some(value.to_string()))
                    }
                    None => (body.trim().to_string(), None),
                };
                compound.attributes.push(attr);
                pos = (end + 1).min(bytes.len());
            }
            _ => pos += 1,
        }
    }

    compound
}

fn find_bracket_end(input: &str, from: usize) -> usize {
    let mut quote: Option<char> = None;
    for (i, c) in input[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => return from + i,
            _ => {}
        }
    }
    input.len()
}
