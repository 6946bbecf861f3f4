//! Host DOM Abstraction
//!
//! The engine never talks to a browser directly. Everything it needs from the
//! page (tree shape, attributes, layout box sizes, class mutations and the
//! mutation record queue) goes through the [`Dom`] trait.
//!
//! Implementations:
//! - [`MemoryDom`]: arena-backed tree that queues mutation records like a
//!   browser mutation observer; used by tests and the CLI
//! - Browser hosts: wrap the live document and may override
//!   [`Dom::query_selector`] with the native query

mod memory;
mod snapshot;

pub use memory::MemoryDom;
pub use snapshot::{ElementSnapshot, PageSnapshot, SnapshotNode};

use crate::selector::{self, SelectorList};
use fieldmark_common::{MutationRecord, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

/// Rendered layout box of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxSize {
    pub width: f32,
    pub height: f32,
}

impl BoxSize {
    pub const ZERO: BoxSize = BoxSize {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Only the box size is considered; CSS visibility and opacity are not.
    pub fn is_rendered(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Host platform view of a document.
///
/// Read accessors return `None` (or empty collections) for unknown nodes
/// rather than failing.
pub trait Dom {
    /// The document element (`<html>`).
    fn root(&self) -> NodeId;

    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Lowercase tag name for elements.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// All child nodes (elements, text, comments) in document order.
    fn child_nodes(&self, node: NodeId) -> Vec<NodeId>;

    /// Character data of a text node.
    fn text(&self, node: NodeId) -> Option<&str>;

    fn box_size(&self, node: NodeId) -> BoxSize;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Creates a detached element.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Creates a detached text node.
    fn create_text(&mut self, data: &str) -> NodeId;

    /// Moves `child` under `parent` as its last child.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Drains the mutation records queued since the previous call.
    fn take_mutation_records(&mut self) -> Vec<MutationRecord>;

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.child_nodes(node)
            .into_iter()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Whether the node's ancestor chain reaches the document element.
    fn is_connected(&self, node: NodeId) -> bool {
        if self.kind(node).is_none() {
            return false;
        }
        let root = self.root();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn head(&self) -> Option<NodeId> {
        self.element_children(self.root())
            .into_iter()
            .find(|child| self.tag_name(*child) == Some("head"))
    }

    fn body(&self) -> Option<NodeId> {
        self.element_children(self.root())
            .into_iter()
            .find(|child| self.tag_name(*child) == Some("body"))
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if !self.is_element(node) || self.has_class(node, class) {
            return;
        }
        let updated = match self.attribute(node, "class") {
            Some(list) if !list.trim().is_empty() => format!("{} {}", list.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &updated);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let updated = self
            .attribute(node, "class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &updated);
    }

    fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        descendants(self, self.root()).find(|node| self.attribute(*node, "id") == Some(id))
    }

    /// First element in document order matching `selector`, or `None`.
    fn query_selector(&self, selector: &SelectorList) -> Option<NodeId> {
        descendants(self, self.root()).find(|node| selector::matches(self, *node, selector))
    }

    fn query_selector_all(&self, selector: &SelectorList) -> Vec<NodeId> {
        descendants(self, self.root())
            .filter(|node| selector::matches(self, *node, selector))
            .collect()
    }
}

/// Pre-order iterator over `start` and every element beneath it.
pub struct Descendants<'a, D: Dom + ?Sized> {
    dom: &'a D,
    stack: Vec<NodeId>,
}

pub fn descendants<D: Dom + ?Sized>(dom: &D, start: NodeId) -> Descendants<'_, D> {
    let stack = if dom.is_element(start) {
        vec![start]
    } else {
        Vec::new()
    };
    Descendants { dom, stack }
}

impl<D: Dom + ?Sized> Iterator for Descendants<'_, D> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.dom.element_children(node).into_iter().rev());
        Some(node)
    }
}

/// Whether `ancestor` is `node` or one of its ancestors.
pub fn is_inclusive_ancestor<D: Dom + ?Sized>(dom: &D, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = dom.parent(id);
    }
    false
}

/// Slash-separated element child indices from the document element, e.g. `1/0/2`.
/// The document element itself has the empty path.
pub fn node_path<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Option<String> {
    let root = dom.root();
    let mut segments = Vec::new();
    let mut current = node;
    while current != root {
        let parent = dom.parent(current)?;
        let index = dom
            .element_children(parent)
            .iter()
            .position(|child| *child == current)?;
        segments.push(index.to_string());
        current = parent;
    }
    segments.reverse();
    Some(segments.join("/"))
}

/// Inverse of [`node_path`].
pub fn node_at_path<D: Dom + ?Sized>(dom: &D, path: &str) -> Option<NodeId> {
    let mut current = dom.root();
    for segment in path.split('/').filter(|s| !s.trim().is_empty()) {
        let index: usize = segment.trim().parse().ok()?;
        current = *dom.element_children(current).get(index)?;
    }
    Some(current)
}
