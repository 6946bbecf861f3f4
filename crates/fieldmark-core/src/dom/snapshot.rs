use super::{BoxSize, Dom, MemoryDom};
use fieldmark_common::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable capture of a rendered page, loadable into a [`MemoryDom`].
///
/// ```yaml
/// url: https://jobs.example.com/123
/// root:
///   tag: html
///   children:
///     - tag: body
///       children:
///         - tag: h1
///           attributes: { class: "job-title" }
///           children: ["Senior Engineer"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub root: ElementSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Text(String),
    Element(ElementSnapshot),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

impl MemoryDom {
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        let mut dom = MemoryDom::with_root(&snapshot.root.tag);
        let root = dom.root();
        dom.apply_element(root, &snapshot.root);

        let mut pending: Vec<(NodeId, &ElementSnapshot)> = vec![(root, &snapshot.root)];
        while let Some((node, element)) = pending.pop() {
            for child in &element.children {
                match child {
                    SnapshotNode::Text(text) => {
                        dom.text_node(node, text);
                    }
                    SnapshotNode::Element(child_element) => {
                        let child_node = dom.create_element(&child_element.tag);
                        dom.apply_element(child_node, child_element);
                        dom.append_child(node, child_node);
                        pending.push((child_node, child_element));
                    }
                }
            }
        }

        dom.take_mutation_records();
        dom
    }

    fn apply_element(&mut self, node: NodeId, element: &ElementSnapshot) {
        for (name, value) in &element.attributes {
            self.set_attribute(node, name, value);
        }
        if element.width.is_some() || element.height.is_some() {
            let current = self.box_size(node);
            self.set_box_size(
                node,
                BoxSize::new(
                    element.width.unwrap_or(current.width),
                    element.height.unwrap_or(current.height),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node_at_path;

    #[test]
    fn loads_nested_elements_and_text() {
        let yaml = r#"
root:
  tag: html
  children:
    - tag: head
    - tag: body
      children:
        - tag: h1
          attributes: { id: title }
          children: ["Engineer"]
        - tag: span
          height: 0
          children: ["hidden"]
"#;
        let snapshot: PageSnapshot = serde_yaml::from_str(yaml).unwrap();
        let dom = MemoryDom::from_snapshot(&snapshot);

        let h1 = node_at_path(&dom, "1/0").unwrap();
        assert_eq!(dom.tag_name(h1), Some("h1"));
        assert_eq!(dom.attribute(h1, "id"), Some("title"));
        let text = dom.child_nodes(h1)[0];
        assert_eq!(dom.text(text), Some("Engineer"));

        let span = node_at_path(&dom, "1/1").unwrap();
        assert!(!dom.box_size(span).is_rendered());
        assert_eq!(dom.pending_records(), 0);
    }
}
