//! Locator Resolution
//!
//! Turns a stored [`Locator`] back into a live node with a single selector
//! query against the [`Dom`]. When several elements match, the first in
//! document order wins; nothing here checks that a locator is unique.

use crate::dom::Dom;
use crate::selector::parse_selector;
use fieldmark_common::{Locator, NodeId, SelectorError};
use tracing::debug;

/// Returns `Ok(Some(node))` for the first match, `Ok(None)` if nothing
/// matches, or `Err` when the locator is not a valid selector.
pub fn resolve<D: Dom + ?Sized>(dom: &D, locator: &Locator) -> Result<Option<NodeId>, SelectorError> {
    let selector = parse_selector(locator.as_str())?;
    let node = dom.query_selector(&selector);
    debug!(locator = %locator, node = ?node, "Resolved locator");
    Ok(node)
}

/// Every match in document order. Used to report ambiguity; extraction
/// always goes through [`resolve`].
pub fn resolve_all<D: Dom + ?Sized>(dom: &D, locator: &Locator) -> Result<Vec<NodeId>, SelectorError> {
    let selector = parse_selector(locator.as_str())?;
    Ok(dom.query_selector_all(&selector))
}
