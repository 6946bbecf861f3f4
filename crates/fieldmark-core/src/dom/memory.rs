use super::{is_inclusive_ancestor, BoxSize, Dom, NodeKind};
use fieldmark_common::{MutationKind, MutationRecord, NodeId};

/// Default box for elements that were not given an explicit size.
const DEFAULT_BOX: BoxSize = BoxSize {
    width: 100.0,
    height: 20.0,
};

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    tag: Option<String>,
    attributes: Vec<(String, String)>,
    data: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    size: BoxSize,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            tag: None,
            attributes: Vec::new(),
            data: String::new(),
            parent: None,
            children: Vec::new(),
            size: DEFAULT_BOX,
        }
    }
}

/// Arena-backed document.
///
/// Mutations on connected nodes are queued as [`MutationRecord`]s until the
/// next [`Dom::take_mutation_records`] call, the same way a browser queues
/// records for a subtree observer on the document element.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<NodeData>,
    root: NodeId,
    records: Vec<MutationRecord>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// An empty `<html>` document with `<head>` and `<body>`.
    pub fn new() -> Self {
        let mut dom = Self::with_root("html");
        let root = dom.root;
        dom.element(root, "head", &[]);
        dom.element(root, "body", &[]);
        dom.records.clear();
        dom
    }

    /// A document consisting of a bare root element.
    pub fn with_root(tag: &str) -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            records: Vec::new(),
        };
        dom.root = dom.create_element(tag);
        dom
    }

    fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0 as usize)
    }

    fn data_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(node.0 as usize)
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        if self.is_connected(target) {
            self.records.push(MutationRecord { target, kind });
        }
    }

    fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.data_mut(child)?.parent.take()?;
        if let Some(parent_data) = self.data_mut(parent) {
            parent_data.children.retain(|c| *c != child);
        }
        Some(parent)
    }

    /// Appends a new element with the given attributes under `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let node = self.create_element(tag);
        if let Some(data) = self.data_mut(node) {
            data.attributes = attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
        }
        self.append_child(parent, node);
        node
    }

    /// Appends a new text node under `parent`.
    pub fn text_node(&mut self, parent: NodeId, data: &str) -> NodeId {
        let node = self.create_text(data);
        self.append_child(parent, node);
        node
    }

    pub fn comment(&mut self, parent: NodeId, data: &str) -> NodeId {
        let mut node = NodeData::new(NodeKind::Comment);
        node.data = data.to_string();
        let id = self.alloc(node);
        self.append_child(parent, id);
        id
    }

    pub fn set_box_size(&mut self, node: NodeId, size: BoxSize) {
        if let Some(data) = self.data_mut(node) {
            data.size = size;
        }
    }

    /// Inserts `child` before `reference` in `parent`'s child list, or appends
    /// it when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        if self.data(parent).is_none()
            || self.data(child).is_none()
            || is_inclusive_ancestor(self, child, parent)
        {
            return;
        }
        if let Some(old_parent) = self.detach(child) {
            self.record(
                old_parent,
                MutationKind::ChildList {
                    added: Vec::new(),
                    removed: vec![child],
                },
            );
        }
        let Some(parent_data) = self.data_mut(parent) else {
            return;
        };
        let position = parent_data
            .children
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(parent_data.children.len());
        parent_data.children.insert(position, child);
        if let Some(child_data) = self.data_mut(child) {
            child_data.parent = Some(parent);
        }
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        );
    }

    /// Detaches `node` from its parent. The node and its subtree stay in the
    /// arena and can be re-inserted.
    pub fn remove(&mut self, node: NodeId) {
        let connected_parent = self.parent(node).filter(|p| self.is_connected(*p));
        if let Some(parent) = self.detach(node) {
            if connected_parent.is_some() {
                self.records.push(MutationRecord {
                    target: parent,
                    kind: MutationKind::ChildList {
                        added: Vec::new(),
                        removed: vec![node],
                    },
                });
            }
        }
    }

    /// Replaces every child of `node` with a single text node, the way
    /// framework re-renders swap text content.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        let removed: Vec<NodeId> = self
            .data(node)
            .map(|data| data.children.clone())
            .unwrap_or_default();
        for child in &removed {
            if let Some(data) = self.data_mut(*child) {
                data.parent = None;
            }
        }
        let added = self.create_text(text);
        if let Some(data) = self.data_mut(added) {
            data.parent = Some(node);
        }
        let Some(data) = self.data_mut(node) else {
            return;
        };
        data.children = vec![added];
        self.record(
            node,
            MutationKind::ChildList {
                added: vec![added],
                removed,
            },
        );
    }

    /// Changes the character data of an existing text node in place.
    pub fn set_data(&mut self, node: NodeId, data: &str) {
        let Some(node_data) = self.data_mut(node) else {
            return;
        };
        if node_data.kind == NodeKind::Element {
            return;
        }
        node_data.data = data.to_string();
        self.record(node, MutationKind::CharacterData);
    }

    pub fn pending_records(&self) -> usize {
        self.records.len()
    }
}

impl Dom for MemoryDom {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.data(node).map(|data| data.kind)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.data(node).and_then(|data| data.tag.as_deref())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.data(node)?
            .attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).and_then(|data| data.parent)
    }

    fn child_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.data(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        let data = self.data(node)?;
        match data.kind {
            NodeKind::Text => Some(data.data.as_str()),
            _ => None,
        }
    }

    fn box_size(&self, node: NodeId) -> BoxSize {
        self.data(node).map(|data| data.size).unwrap_or(BoxSize::ZERO)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(data) = self.data_mut(node) else {
            return;
        };
        if data.kind != NodeKind::Element {
            return;
        }
        match data
            .attributes
            .iter_mut()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => data.attributes.push((name.to_string(), value.to_string())),
        }
        self.record(
            node,
            MutationKind::Attributes {
                name: name.to_string(),
            },
        );
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let Some(data) = self.data_mut(node) else {
            return;
        };
        let before = data.attributes.len();
        data.attributes
            .retain(|(attr, _)| !attr.eq_ignore_ascii_case(name));
        if data.attributes.len() != before {
            self.record(
                node,
                MutationKind::Attributes {
                    name: name.to_string(),
                },
            );
        }
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Element);
        data.tag = Some(tag.to_ascii_lowercase());
        self.alloc(data)
    }

    fn create_text(&mut self, data: &str) -> NodeId {
        let mut node = NodeData::new(NodeKind::Text);
        node.data = data.to_string();
        self.alloc(node)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        // Inserting before a node that is never a child appends.
        self.insert_before(parent, child, child);
    }

    fn take_mutation_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }
}
