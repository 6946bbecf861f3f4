use crate::protocol::NodeId;
use thiserror::Error;

/// Errors raised while generating a locator for an element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// The positional fallback needs the element's ancestor chain, but the
    /// element is not attached to the document. The result must not be persisted.
    #[error("Element {0} is not attached to the document")]
    ElementDetached(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
}

/// Errors raised while parsing or evaluating a selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("Invalid selector '{selector}': {reason}")]
    Invalid { selector: String, reason: String },
}

/// Errors surfaced by persistent key-value stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown field kind '{0}' (expected job-title or company-name)")]
pub struct ParseFieldKindError(pub String);
