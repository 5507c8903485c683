//! Declarative element construction
//!
//! Builds a detached subtree and attaches it with one `append_child`, so
//! observers see a single child-list record per inserted fragment, the way
//! a host page inserting markup would produce one.

use super::tree::{Document, NodeId};

/// Element description
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    tag: String,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<ElementSpec>,
}

/// Start describing an element
pub fn el(tag: &str) -> ElementSpec {
    ElementSpec {
        tag: tag.to_string(),
        ..Default::default()
    }
}

impl ElementSpec {
    /// Add a class
    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    /// Set an attribute
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    /// Leading text content
    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Append a child element
    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Create the subtree without attaching it
    pub fn build(self, doc: &mut Document) -> NodeId {
        let node = doc.create_element(&self.tag);
        if !self.classes.is_empty() {
            doc.set_attribute(node, "class", &self.classes.join(" "));
        }
        for (name, value) in &self.attrs {
            doc.set_attribute(node, name, value);
        }
        if let Some(text) = &self.text {
            let text_node = doc.create_text(text);
            doc.append_child(node, text_node);
        }
        for child in self.children {
            let child_node = child.build(doc);
            doc.append_child(node, child_node);
        }
        node
    }

    /// Create the subtree and append it to `parent`
    pub fn append_to(self, doc: &mut Document, parent: NodeId) -> NodeId {
        let node = self.build(doc);
        doc.append_child(parent, node);
        node
    }
}
