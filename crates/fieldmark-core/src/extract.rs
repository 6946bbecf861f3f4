use crate::dom::{Dom, NodeKind};
use fieldmark_common::NodeId;

/// Rendered text of `node` and its visible descendants.
///
/// Text nodes contribute their trimmed value in document order; element
/// children with a zero-size box contribute nothing, and neither does their
/// subtree. The result is whitespace-normalized. Returns `""` for `None`, a
/// non-element, or an element that is not rendered itself.
pub fn extract_visible_text<D: Dom + ?Sized>(dom: &D, node: Option<NodeId>) -> String {
    let Some(node) = node else {
        return String::new();
    };
    if !is_rendered_element(dom, node) {
        return String::new();
    }

    let mut pieces: Vec<String> = Vec::new();
    let mut stack: Vec<NodeId> = dom.child_nodes(node).into_iter().rev().collect();

    while let Some(current) = stack.pop() {
        match dom.kind(current) {
            Some(NodeKind::Text) => {
                pieces.push(dom.text(current).unwrap_or_default().trim().to_string());
            }
            Some(NodeKind::Element) if is_rendered_element(dom, current) => {
                stack.extend(dom.child_nodes(current).into_iter().rev());
            }
            _ => {}
        }
    }

    normalize_whitespace(&pieces.join(" "))
}

fn is_rendered_element<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    dom.is_element(node) && dom.box_size(node).is_rendered()
}

/// Collapses every whitespace run to a single space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
