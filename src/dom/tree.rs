//! Arena-backed document tree
//!
//! Nodes are never freed: detaching a subtree only unlinks it, so stale
//! `NodeId`s stay valid and `is_connected` tells whether they are still in
//! the document.

use std::fmt;

use tokio::sync::mpsc;
use tracing::trace;

use super::observer::{
    MutationKind, MutationObserver, MutationRecord, ObserveOptions, ObserverId, Registration,
};
use super::selector::Selector;

/// Handle to a node in a `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// One inline style declaration
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDecl {
    pub value: String,
    pub important: bool,
}

/// Live document tree of the hosted page
#[derive(Debug)]
pub struct Document {
    url: String,
    nodes: Vec<Node>,
    document_element: NodeId,
    body: NodeId,
    observers: Vec<Registration>,
    next_observer: u64,
}

impl Document {
    /// Create a document with an empty `html > head + body` skeleton
    pub fn new(url: &str) -> Self {
        let mut doc = Self {
            url: url.to_string(),
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            document_element: NodeId(0),
            body: NodeId(0),
            observers: Vec::new(),
            next_observer: 1,
        };

        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(NodeId(0), html);
        doc.link(html, head);
        doc.link(html, body);
        doc.document_element = html;
        doc.body = body;
        doc
    }

    /// Page URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The document node itself
    pub fn document_node(&self) -> NodeId {
        NodeId(0)
    }

    /// The `html` element
    pub fn document_element(&self) -> NodeId {
        self.document_element
    }

    /// The `body` element
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Whether `node` is the document, `html` or `body`
    pub fn is_page_level(&self, node: NodeId) -> bool {
        node == self.document_node() || node == self.document_element || node == self.body
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn unlink(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent.take()?;
        self.nodes[parent.0].children.retain(|&c| c != node);
        Some(parent)
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    /// Append `child` to `parent`, detaching it from its old parent first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if child == parent || self.contains(child, parent) {
            return;
        }
        self.remove(child);
        self.link(parent, child);
        self.notify(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        });
    }

    /// Detach `node` from its parent
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.unlink(node) {
            self.notify(MutationRecord {
                target: parent,
                kind: MutationKind::ChildList {
                    added: Vec::new(),
                    removed: vec![node],
                },
            });
        }
    }

    /// Replace all children of `node` with a single text node
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let removed = std::mem::take(&mut self.nodes[node.0].children);
        for &child in &removed {
            self.nodes[child.0].parent = None;
        }
        let text_node = self.create_text(text);
        self.link(node, text_node);
        self.notify(MutationRecord {
            target: node,
            kind: MutationKind::ChildList {
                added: vec![text_node],
                removed,
            },
        });
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(attrs) = self.attrs_mut(node) else {
            return;
        };
        let old_value = match attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => {
                if existing == value {
                    return;
                }
                Some(std::mem::replace(existing, value.to_string()))
            }
            None => {
                attrs.push((name.to_string(), value.to_string()));
                None
            }
        };
        self.notify(MutationRecord {
            target: node,
            kind: MutationKind::Attributes {
                name: name.to_string(),
                old_value,
            },
        });
    }

    /// Remove an attribute
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let Some(attrs) = self.attrs_mut(node) else {
            return;
        };
        let Some(pos) = attrs.iter().position(|(n, _)| n == name) else {
            return;
        };
        let (_, old) = attrs.remove(pos);
        self.notify(MutationRecord {
            target: node,
            kind: MutationKind::Attributes {
                name: name.to_string(),
                old_value: Some(old),
            },
        });
    }

    /// Add a class if missing
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let mut classes: Vec<&str> = self.classes(node).collect();
        classes.push(class);
        let joined = classes.join(" ");
        self.set_attribute(node, "class", &joined);
    }

    /// Remove a class if present
    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let joined = self
            .classes(node)
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &joined);
    }

    /// Set one inline style property
    pub fn set_style_property(&mut self, node: NodeId, property: &str, value: &str, important: bool) {
        let mut decls = self.style_decls(node);
        let decl = StyleDecl {
            value: value.to_string(),
            important,
        };
        match decls.iter_mut().find(|(p, _)| p == property) {
            Some((_, existing)) => *existing = decl,
            None => decls.push((property.to_string(), decl)),
        }
        let style = serialize_style(&decls);
        self.set_attribute(node, "style", &style);
    }

    /// Remove one inline style property
    pub fn remove_style_property(&mut self, node: NodeId, property: &str) {
        let mut decls = self.style_decls(node);
        let before = decls.len();
        decls.retain(|(p, _)| p != property);
        if decls.len() == before {
            return;
        }
        if decls.is_empty() {
            self.remove_attribute(node, "style");
        } else {
            let style = serialize_style(&decls);
            self.set_attribute(node, "style", &style);
        }
    }

    fn attrs_mut(&mut self, node: NodeId) -> Option<&mut Vec<(String, String)>> {
        match &mut self.nodes.get_mut(node.0)?.kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    /// Whether `node` is an element
    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node.0).map(|n| &n.kind),
            Some(NodeKind::Element { .. })
        )
    }

    /// Lower-case tag name of an element
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Parent node
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    /// Parent, if it is an element
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|&p| self.is_element(p))
    }

    /// `node` itself when it is an element, else its closest element ancestor
    pub fn nearest_element(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.is_element(id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Children in order
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node.0).map_or(&[], |n| &n.children)
    }

    /// Attribute value
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Whether an attribute is present
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Class list
    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attribute(node, "class")
            .unwrap_or_default()
            .split_whitespace()
    }

    /// Whether the class list contains `class`
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|c| c == class)
    }

    /// Parsed inline style declarations in source order
    pub fn style_decls(&self, node: NodeId) -> Vec<(String, StyleDecl)> {
        self.attribute(node, "style")
            .map(parse_style)
            .unwrap_or_default()
    }

    /// One inline style declaration
    pub fn style_property(&self, node: NodeId, property: &str) -> Option<StyleDecl> {
        self.style_decls(node)
            .into_iter()
            .find(|(p, _)| p == property)
            .map(|(_, d)| d)
    }

    /// Concatenated descendant text with whitespace collapsed
    pub fn text_content(&self, node: NodeId) -> String {
        let mut raw = String::new();
        for id in self.descendants(node) {
            if let NodeKind::Text(text) = &self.nodes[id.0].kind {
                raw.push_str(text);
                raw.push(' ');
            }
        }
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether `node` is attached to the document
    pub fn is_connected(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len() && self.contains(self.document_node(), node)
    }

    /// Rendered-visibility approximation from inline styles and the `hidden` attribute
    ///
    /// `visibility` inherits, so the nearest element declaring it decides.
    pub fn is_hidden(&self, node: NodeId) -> bool {
        if !self.is_connected(node) {
            return true;
        }
        let mut visibility_decided = false;
        let mut current = Some(node);
        while let Some(id) = current {
            if self.is_element(id) {
                if self.has_attribute(id, "hidden")
                    || self
                        .style_property(id, "display")
                        .is_some_and(|d| d.value == "none")
                {
                    return true;
                }
                if !visibility_decided {
                    if let Some(decl) = self.style_property(id, "visibility") {
                        if decl.value == "hidden" || decl.value == "collapse" {
                            return true;
                        }
                        visibility_decided = true;
                    }
                }
            }
            current = self.parent(id);
        }
        false
    }

    /// Pre-order traversal including `root`
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Elements matching `selector` in `root`'s subtree, `root` included
    pub fn query_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| selector.matches(self, id))
            .collect()
    }

    /// First element matching `selector` in `root`'s subtree, `root` included
    pub fn query(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if selector.matches(self, id) {
                return Some(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        None
    }

    /// Closest inclusive ancestor matching `selector`
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if selector.matches(self, id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register a mutation observer on `target`
    pub fn observe(&mut self, target: NodeId, options: ObserveOptions) -> MutationObserver {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(Registration {
            id,
            target,
            options,
            tx,
        });
        MutationObserver::new(id, target, rx)
    }

    /// Stop delivering records to an observer
    pub fn disconnect(&mut self, id: ObserverId) {
        self.observers.retain(|r| r.id != id);
    }

    /// Number of live observer registrations
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn notify(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let mut closed = Vec::new();
        for registration in &self.observers {
            let in_scope = registration.target == record.target
                || (registration.options.subtree && self.contains(registration.target, record.target));
            if !in_scope || !registration.options.wants(&record.kind) {
                continue;
            }
            if registration.tx.send(record.clone()).is_err() {
                closed.push(registration.id);
            }
        }
        if !closed.is_empty() {
            trace!("Pruning {} closed observers", closed.len());
            self.observers.retain(|r| !closed.contains(&r.id));
        }
    }
}

fn parse_style(style: &str) -> Vec<(String, StyleDecl)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let mut value = value.trim();
            let important = value.ends_with("!important");
            if important {
                value = value.trim_end_matches("!important").trim_end();
            }
            (!property.is_empty()).then(|| {
                (
                    property,
                    StyleDecl {
                        value: value.to_ascii_lowercase(),
                        important,
                    },
                )
            })
        })
        .collect()
}

fn serialize_style(decls: &[(String, StyleDecl)]) -> String {
    decls
        .iter()
        .map(|(p, d)| {
            if d.important {
                format!("{}: {} !important;", p, d.value)
            } else {
                format!("{}: {};", p, d.value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
