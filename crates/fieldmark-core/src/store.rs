//! In-memory table of committed [`Binding`]s and its flat key-value encoding.
//!
//! The persistent store is a plain string map owned by the host. Each field
//! uses three keys: `<field>Selector`, `<field>SelectorText` and
//! `<field>SelectorCapturedAt` (RFC 3339), where `<field>` is the field's
//! storage prefix (`jobTitle`, `companyName`).

use chrono::{DateTime, Utc};
use fieldmark_common::{Binding, FieldKind, Locator};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

pub fn locator_key(kind: FieldKind) -> String {
    format!("{}Selector", kind.storage_prefix())
}

pub fn text_key(kind: FieldKind) -> String {
    format!("{}SelectorText", kind.storage_prefix())
}

pub fn captured_key(kind: FieldKind) -> String {
    format!("{}SelectorCapturedAt", kind.storage_prefix())
}

/// Every key the store reads at session start.
pub fn keys() -> Vec<String> {
    FieldKind::ALL
        .iter()
        .flat_map(|kind| [locator_key(*kind), text_key(*kind), captured_key(*kind)])
        .collect()
}

/// At most one binding per field. Changes are tracked until the host
/// drains them with [`LocatorStore::take_pending`] and writes them out.
#[derive(Debug, Clone, Default)]
pub struct LocatorStore {
    bindings: BTreeMap<FieldKind, Binding>,
    dirty: BTreeSet<FieldKind>,
}

impl LocatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the table from stored entries. A field without a non-empty
    /// locator key has no binding.
    pub fn from_entries(entries: &HashMap<String, String>) -> Self {
        let mut bindings = BTreeMap::new();

        for kind in FieldKind::ALL {
            let Some(locator) = entries
                .get(&locator_key(kind))
                .filter(|value| !value.is_empty())
            else {
                continue;
            };

            let captured_at = entries
                .get(&captured_key(kind))
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|at| at.with_timezone(&Utc));

            bindings.insert(
                kind,
                Binding {
                    field_kind: kind,
                    locator: Locator::new(locator.clone()),
                    last_known_text: entries.get(&text_key(kind)).cloned().unwrap_or_default(),
                    captured_at,
                },
            );
        }

        debug!(count = bindings.len(), "Loaded bindings");
        Self {
            bindings,
            dirty: BTreeSet::new(),
        }
    }

    /// Stores `binding`, replacing any earlier binding for the same field.
    /// Returns the replaced binding.
    pub fn commit(&mut self, binding: Binding) -> Option<Binding> {
        let kind = binding.field_kind;
        info!(field = %kind, locator = %binding.locator, "Committed binding");
        self.dirty.insert(kind);
        self.bindings.insert(kind, binding)
    }

    pub fn get(&self, kind: FieldKind) -> Option<&Binding> {
        self.bindings.get(&kind)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Replaces the cached text of an existing binding; the locator is never
    /// touched. Returns whether anything changed.
    pub fn refresh_text(&mut self, kind: FieldKind, text: &str) -> bool {
        let Some(binding) = self.bindings.get_mut(&kind) else {
            return false;
        };
        if binding.last_known_text == text {
            return false;
        }
        debug!(field = %kind, text, "Refreshed cached text");
        binding.last_known_text = text.to_string();
        self.dirty.insert(kind);
        true
    }

    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Drains changed bindings as key-value entries ready to be written.
    pub fn take_pending(&mut self) -> HashMap<String, String> {
        let mut entries = HashMap::new();
        for kind in std::mem::take(&mut self.dirty) {
            let Some(binding) = self.bindings.get(&kind) else {
                continue;
            };
            entries.insert(locator_key(kind), binding.locator.as_str().to_string());
            entries.insert(text_key(kind), binding.last_known_text.clone());
            if let Some(at) = binding.captured_at {
                entries.insert(captured_key(kind), at.to_rfc3339());
            }
        }
        entries
    }
}
