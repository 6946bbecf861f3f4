use super::{Combinator, ComplexSelector, CompoundSelector, SelectorList};
use crate::dom::Dom;
use fieldmark_common::NodeId;

/// Whether element `node` matches any selector in `list`.
pub fn matches<D: Dom + ?Sized>(dom: &D, node: NodeId, list: &SelectorList) -> bool {
    dom.is_element(node)
        && list
            .selectors
            .iter()
            .any(|selector| matches_complex(dom, node, selector))
}

fn matches_complex<D: Dom + ?Sized>(dom: &D, node: NodeId, selector: &ComplexSelector) -> bool {
    let Some(last) = selector.compounds.len().checked_sub(1) else {
        return false;
    };
    matches_from(dom, node, selector, last)
}

/// Matches `compounds[..=index]` right to left with `node` as the subject of
/// `compounds[index]`. Descendant combinators backtrack over every ancestor.
fn matches_from<D: Dom + ?Sized>(
    dom: &D,
    node: NodeId,
    selector: &ComplexSelector,
    index: usize,
) -> bool {
    if !matches_compound(dom, node, &selector.compounds[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match selector.combinators.get(index - 1) {
        Some(Combinator::Child) => parent_element(dom, node)
            .is_some_and(|parent| matches_from(dom, parent, selector, index - 1)),
        Some(Combinator::Descendant) => {
            let mut ancestor = parent_element(dom, node);
            while let Some(candidate) = ancestor {
                if matches_from(dom, candidate, selector, index - 1) {
                    return true;
                }
                ancestor = parent_element(dom, candidate);
            }
            false
        }
        None => false,
    }
}

fn parent_element<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Option<NodeId> {
    dom.parent(node).filter(|parent| dom.is_element(*parent))
}

fn matches_compound<D: Dom + ?Sized>(dom: &D, node: NodeId, compound: &CompoundSelector) -> bool {
    if let Some(tag) = &compound.tag {
        if dom.tag_name(node) != Some(tag.as_str()) {
            return false;
        }
    }

    if !compound
        .ids
        .iter()
        .all(|id| dom.attribute(node, "id") == Some(id.as_str()))
    {
        return false;
    }

    if !compound.classes.iter().all(|class| dom.has_class(node, class)) {
        return false;
    }

    let attributes_match = compound.attributes.iter().all(|attr| {
        match (dom.attribute(node, &attr.name), &attr.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    });
    if !attributes_match {
        return false;
    }

    if compound.nth_child.is_empty() {
        return true;
    }
    let position = element_index(dom, node);
    compound.nth_child.iter().all(|n| *n == position)
}

/// 1-based index among the parent's element children. A parentless element
/// counts as the only child.
fn element_index<D: Dom + ?Sized>(dom: &D, node: NodeId) -> usize {
    match dom.parent(node) {
        Some(parent) => dom
            .element_children(parent)
            .iter()
            .position(|child| *child == node)
            .map_or(0, |i| i + 1),
        None => 1,
    }
}
