//! Operations behind the `fieldmark` binary. Pages are captured
//! [`PageSnapshot`]s (YAML or JSON) and nodes are addressed by element
//! child index paths such as `1/0/2`.

use crate::session::PageSession;
use crate::storage::{load_bindings, KeyValueStore};
use fieldmark_common::{
    Binding, ExtractionResult, FieldKind, Locator, LocatorError, LocatorTier, NodeId, Request,
    SelectorError, StoreError,
};
use fieldmark_core::config::FieldmarkConfig;
use fieldmark_core::dom::{node_at_path, node_path};
use fieldmark_core::{
    extract_visible_text, generate_locator_with_tier, resolve_all, ClickEvent, ClickOutcome,
    HintClassifier, MemoryDom, PageSnapshot,
};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read page: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse page: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("No element at path '{0}'")]
    NoSuchNode(String),
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Nothing was saved: {0}")]
    NotCommitted(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocateReport {
    pub locator: Locator,
    pub tier: LocatorTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveReport {
    pub locator: Locator,
    /// Paths of every match in document order; the first one is used.
    pub matches: Vec<String>,
    /// Visible text of the first match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

pub async fn load_page(path: &Path) -> Result<MemoryDom, CliError> {
    let content = tokio::fs::read_to_string(path).await?;
    let snapshot: PageSnapshot = serde_yaml::from_str(&content)?;
    Ok(MemoryDom::from_snapshot(&snapshot))
}

fn element_at(dom: &MemoryDom, path: &str) -> Result<NodeId, CliError> {
    node_at_path(dom, path).ok_or_else(|| CliError::NoSuchNode(path.to_string()))
}

pub fn locate(dom: &MemoryDom, path: &str) -> Result<LocateReport, CliError> {
    let node = element_at(dom, path)?;
    let (locator, tier) = generate_locator_with_tier(dom, node, &[])?;
    Ok(LocateReport { locator, tier })
}

pub fn resolve(dom: &MemoryDom, locator: &str) -> Result<ResolveReport, CliError> {
    let locator = Locator::new(locator);
    let nodes = resolve_all(dom, &locator)?;
    let text = nodes
        .first()
        .map(|node| extract_visible_text(dom, Some(*node)));
    let matches = nodes
        .iter()
        .filter_map(|node| node_path(dom, *node))
        .collect();
    Ok(ResolveReport {
        locator,
        matches,
        text,
    })
}

/// Runs one learning cycle on the page: enable with `field` as the hint,
/// hover and click the element at `path`. The selection defaults to the
/// element's visible text.
pub async fn teach<S: KeyValueStore>(
    dom: MemoryDom,
    kv: S,
    config: &FieldmarkConfig,
    path: &str,
    field: FieldKind,
    selection: Option<String>,
) -> Result<Binding, CliError> {
    let node = element_at(&dom, path)?;
    let selection = selection.unwrap_or_else(|| extract_visible_text(&dom, Some(node)));

    let mut session = PageSession::open(dom, kv, config, Box::new(HintClassifier)).await;
    session
        .handle_request(Request::EnableSelection { mode: Some(field) })
        .await;
    session.pointer_over(node);
    let result = session.click(&ClickEvent::new(node, selection)).await;
    session.teardown().await;

    match result.outcome {
        ClickOutcome::Committed(binding) => Ok(binding),
        ClickOutcome::Detached(e) => Err(e.into()),
        ClickOutcome::NoSelection => Err(CliError::NotCommitted(
            "the element has no visible text; pass --text".to_string(),
        )),
        ClickOutcome::Aborted => Err(CliError::NotCommitted("classification aborted".to_string())),
        ClickOutcome::Ignored => Err(CliError::NotCommitted(format!(
            "clicks on '{}' are not intercepted",
            path
        ))),
    }
}

/// Resolves every stored binding against the page and refreshes the
/// cached texts.
pub async fn extract<S: KeyValueStore>(
    dom: MemoryDom,
    kv: S,
    config: &FieldmarkConfig,
) -> Result<ExtractionResult, CliError> {
    let mut session = PageSession::open(dom, kv, config, Box::new(HintClassifier)).await;
    let response = session.handle_request(Request::Extract).await;
    session.teardown().await;
    Ok(response.result.unwrap_or_default())
}

pub async fn show<S: KeyValueStore + ?Sized>(kv: &S) -> Result<Vec<Binding>, CliError> {
    let bindings = load_bindings(kv).await?;
    Ok(bindings.bindings().cloned().collect())
}

