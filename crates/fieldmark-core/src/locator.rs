//! Locator generation.
//!
//! Tiers are tried in a fixed order and the first applicable one wins:
//! `#id`, `.class.list`, `[data-testid="…"]`, `[aria-label="…"]`, then a
//! positional `tag:nth-child(i)` path anchored at the nearest ancestor id
//! (or at the document element). Tiers 2 to 4 are not checked for
//! uniqueness.

use crate::dom::{Dom, NodeKind};
use crate::selector::{escape_ident, quote_string};
use fieldmark_common::{Locator, LocatorError, LocatorTier, NodeId};
use tracing::debug;

const PATH_SEPARATOR: &str = " > ";

/// Generates a locator using every class on the element.
///
/// Locators committed by the learning controller skip its highlight and
/// selected marker classes instead, so an element whose only classes are
/// markers gets a test-id, aria-label or path locator there. See
/// [`generate_locator_with_tier`].
pub fn generate_locator<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Result<Locator, LocatorError> {
    generate_locator_with_tier(dom, node, &[]).map(|(locator, _)| locator)
}

/// Generates a locator and reports which tier produced it.
///
/// Classes in `ignored_classes` are left out of the class-list tier; the
/// learning controller passes its own marker classes here so a hovered or
/// previously selected element does not bake them into its locator.
pub fn generate_locator_with_tier<D: Dom + ?Sized>(
    dom: &D,
    node: NodeId,
    ignored_classes: &[&str],
) -> Result<(Locator, LocatorTier), LocatorError> {
    match dom.kind(node) {
        Some(NodeKind::Element) => {}
        Some(_) => return Err(LocatorError::NotAnElement(node)),
        None => return Err(LocatorError::UnknownNode(node)),
    }

    let (locator, tier) = match attribute_tier(dom, node, ignored_classes) {
        Some(found) => found,
        None => (positional_path(dom, node)?, LocatorTier::Path),
    };

    debug!(node = %node, tier = tier.name(), locator = %locator, "Generated locator");
    Ok((Locator::new(locator), tier))
}

fn attribute_tier<D: Dom + ?Sized>(
    dom: &D,
    node: NodeId,
    ignored_classes: &[&str],
) -> Option<(String, LocatorTier)> {
    if let Some(id) = non_empty_id(dom, node) {
        return Some((format!("#{}", escape_ident(id)), LocatorTier::Id));
    }

    if let Some(list) = dom.attribute(node, "class") {
        let classes: Vec<String> = list
            .split_whitespace()
            .filter(|class| !ignored_classes.contains(class))
            .map(escape_ident)
            .collect();
        if !classes.is_empty() {
            return Some((format!(".{}", classes.join(".")), LocatorTier::ClassList));
        }
    }

    if let Some(value) = dom.attribute(node, "data-testid") {
        return Some((
            format!("[data-testid={}]", quote_string(value)),
            LocatorTier::TestId,
        ));
    }

    if let Some(value) = dom.attribute(node, "aria-label") {
        return Some((
            format!("[aria-label={}]", quote_string(value)),
            LocatorTier::AriaLabel,
        ));
    }

    None
}

fn non_empty_id<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Option<&str> {
    dom.attribute(node, "id").filter(|id| !id.is_empty())
}

fn positional_path<D: Dom + ?Sized>(dom: &D, node: NodeId) -> Result<String, LocatorError> {
    if !dom.is_connected(node) {
        return Err(LocatorError::ElementDetached(node));
    }

    let root = dom.root();
    if node == root {
        return Ok(dom.tag_name(root).unwrap_or("html").to_string());
    }

    let mut segments = Vec::new();
    let mut current = node;
    while current != root {
        if let Some(id) = non_empty_id(dom, current) {
            segments.push(format!("#{}", escape_ident(id)));
            break;
        }

        let parent = dom
            .parent(current)
            .ok_or(LocatorError::ElementDetached(node))?;
        let index = dom
            .element_children(parent)
            .iter()
            .position(|child| *child == current)
            .ok_or(LocatorError::ElementDetached(node))?;
        let tag = dom.tag_name(current).unwrap_or("*");
        segments.push(format!("{}:nth-child({})", tag, index + 1));
        current = parent;
    }

    segments.reverse();
    Ok(segments.join(PATH_SEPARATOR))
}
