use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldmarkConfig {
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Marker names used while teaching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Transient class on the hovered element.
    #[serde(default = "default_highlight_class")]
    pub highlight_class: String,
    /// Persistent class on committed elements.
    #[serde(default = "default_selected_class")]
    pub selected_class: String,
    /// Id of the injected `<style>` element.
    #[serde(default = "default_style_id")]
    pub style_id: String,
    /// Elements never highlighted and whose clicks pass through.
    #[serde(default = "default_exclude_ids")]
    pub exclude_ids: Vec<String>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            highlight_class: default_highlight_class(),
            selected_class: default_selected_class(),
            style_id: default_style_id(),
            exclude_ids: default_exclude_ids(),
        }
    }
}

fn default_highlight_class() -> String {
    "highlight-element".to_string()
}

fn default_selected_class() -> String {
    "selected-element".to_string()
}

fn default_style_id() -> String {
    "highlight-style".to_string()
}

fn default_exclude_ids() -> Vec<String> {
    vec!["learning-mode-button".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Collapse every batch delivered in one event-loop turn into a single
    /// re-extraction.
    #[serde(default = "default_coalesce")]
    pub coalesce: bool,
    /// Skip batches that touch no resolved element, as long as every
    /// binding currently resolves.
    #[serde(default)]
    pub scope_to_resolved: bool,
    #[serde(default)]
    pub observe: ObserveOptions,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            coalesce: default_coalesce(),
            scope_to_resolved: false,
            observe: ObserveOptions::default(),
        }
    }
}

fn default_coalesce() -> bool {
    true
}

/// Which mutation records trigger re-extraction, mirroring a mutation
/// observer's init options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveOptions {
    #[serde(default = "default_true")]
    pub child_list: bool,
    #[serde(default = "default_true")]
    pub subtree: bool,
    #[serde(default)]
    pub character_data: bool,
    #[serde(default)]
    pub attributes: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            child_list: true,
            subtree: true,
            character_data: false,
            attributes: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file backing the key-value store. `None` means
    /// `~/.fieldmark/store.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}
