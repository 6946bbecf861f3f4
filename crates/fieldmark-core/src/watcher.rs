//! Re-extraction on DOM mutation.
//!
//! The watcher never changes a binding's locator. Each observed batch
//! re-resolves every binding, re-extracts its visible text, publishes the
//! resulting [`ExtractionResult`] and refreshes the store's cached text.

use crate::config::{ObserveOptions, WatcherConfig};
use crate::dom::{is_inclusive_ancestor, Dom};
use crate::extract::extract_visible_text;
use crate::resolution::resolve;
use crate::store::LocatorStore;
use fieldmark_common::{ExtractionResult, FieldKind, MutationKind, MutationRecord, NodeId};
use tracing::{debug, info, warn};

pub struct MutationWatcher {
    observe: ObserveOptions,
    coalesce: bool,
    scope_to_resolved: bool,
    running: bool,
    /// Nodes the bindings resolved to during the last refresh.
    resolved: Vec<(FieldKind, Option<NodeId>)>,
    extractions: u64,
}

impl MutationWatcher {
    pub fn new(config: &WatcherConfig) -> Self {
        Self {
            observe: config.observe,
            coalesce: config.coalesce,
            scope_to_resolved: config.scope_to_resolved,
            running: false,
            resolved: Vec::new(),
            extractions: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether batches delivered in the same turn should be merged.
    pub fn coalesces(&self) -> bool {
        self.coalesce
    }

    /// Number of full re-extractions run since the watcher was created.
    pub fn extractions(&self) -> u64 {
        self.extractions
    }

    /// Starts observing and runs an initial extraction. Starting a running
    /// watcher only refreshes.
    pub fn start<D: Dom + ?Sized>(&mut self, dom: &D, store: &mut LocatorStore) -> ExtractionResult {
        if !self.running {
            info!("Mutation watcher started");
            self.running = true;
        }
        self.refresh(dom, store)
    }

    pub fn stop(&mut self) {
        if self.running {
            info!("Mutation watcher stopped");
        }
        self.running = false;
        self.resolved.clear();
    }

    /// Whether `record` is one the configured observer would have queued.
    /// Without `subtree` only records targeting the document element count.
    pub fn observes<D: Dom + ?Sized>(&self, dom: &D, record: &MutationRecord) -> bool {
        let kind_observed = match record.kind {
            MutationKind::ChildList { .. } => self.observe.child_list,
            MutationKind::CharacterData => self.observe.character_data,
            MutationKind::Attributes { .. } => self.observe.attributes,
        };
        kind_observed && (self.observe.subtree || record.target == dom.root())
    }

    /// Handles one delivered batch. Returns the new result when the batch
    /// triggered a re-extraction, or `None` when the watcher is stopped or
    /// the batch was filtered out.
    pub fn on_batch<D: Dom + ?Sized>(
        &mut self,
        dom: &D,
        store: &mut LocatorStore,
        records: &[MutationRecord],
    ) -> Option<ExtractionResult> {
        if !self.running {
            return None;
        }

        let observed: Vec<&MutationRecord> =
            records.iter().filter(|r| self.observes(dom, r)).collect();
        if observed.is_empty() {
            return None;
        }

        if self.scope_to_resolved && !self.touches_resolved(dom, store, &observed) {
            debug!(records = observed.len(), "Batch outside resolved elements");
            return None;
        }

        Some(self.refresh(dom, store))
    }

    /// Re-resolves and re-extracts every binding now. Non-empty text
    /// replaces the cached text; empty or unresolved fields are absent.
    pub fn refresh<D: Dom + ?Sized>(&mut self, dom: &D, store: &mut LocatorStore) -> ExtractionResult {
        let mut result = ExtractionResult::default();
        let mut resolved = Vec::new();
        let mut refreshed = Vec::new();

        for binding in store.bindings() {
            let node = match resolve(dom, &binding.locator) {
                Ok(node) => node,
                Err(e) => {
                    warn!(field = %binding.field_kind, "Stored locator is invalid: {}", e);
                    None
                }
            };
            resolved.push((binding.field_kind, node));

            let text = extract_visible_text(dom, node);
            if text.is_empty() {
                continue;
            }
            result.set(binding.field_kind, Some(text.clone()));
            refreshed.push((binding.field_kind, text));
        }

        for (kind, text) in refreshed {
            store.refresh_text(kind, &text);
        }

        self.extractions += 1;
        debug!(result = ?result, extractions = self.extractions, "Extracted fields");
        self.resolved = resolved;
        result
    }

    /// Whether the batch may change the extraction result. It may unless
    /// every binding still resolves to the node it resolved to last time
    /// and no record targets one of those nodes' ancestor chain or subtree.
    /// Re-resolving catches earlier matches inserted elsewhere in the page.
    fn touches_resolved<D: Dom + ?Sized>(
        &self,
        dom: &D,
        store: &LocatorStore,
        records: &[&MutationRecord],
    ) -> bool {
        if store.bindings().count() != self.resolved.len() {
            return true;
        }

        let mut nodes = Vec::with_capacity(self.resolved.len());
        for (kind, node) in &self.resolved {
            let (Some(binding), Some(node)) = (store.get(*kind), *node) else {
                return true;
            };
            match resolve(dom, &binding.locator) {
                Ok(Some(current)) if current == node => nodes.push(node),
                _ => return true,
            }
        }

        records.iter().any(|record| {
            nodes.iter().any(|node| {
                is_inclusive_ancestor(dom, record.target, *node)
                    || is_inclusive_ancestor(dom, *node, record.target)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use fieldmark_common::{Binding, Locator};

    fn page() -> (MemoryDom, NodeId) {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let company = dom.element(body, "span", &[("id", "company")]);
        dom.text_node(company, "Acme Corp");
        dom.take_mutation_records();
        (dom, company)
    }

    fn store() -> LocatorStore {
        let mut store = LocatorStore::new();
        store.commit(Binding::new(
            FieldKind::CompanyName,
            Locator::new("#company"),
            "Acme Corp",
        ));
        store.take_pending();
        store
    }

    #[test]
    fn stopped_watcher_ignores_batches() {
        let (mut dom, company) = page();
        let mut store = store();
        let mut watcher = MutationWatcher::new(&WatcherConfig::default());

        dom.set_text_content(company, "Globex");
        let records = dom.take_mutation_records();
        assert_eq!(watcher.on_batch(&dom, &mut store, &records), None);

        watcher.start(&dom, &mut store);
        watcher.stop();
        assert_eq!(watcher.on_batch(&dom, &mut store, &records), None);
    }

    #[test]
    fn unobserved_record_kinds_are_filtered() {
        let (mut dom, company) = page();
        let mut store = store();
        let mut watcher = MutationWatcher::new(&WatcherConfig::default());
        watcher.start(&dom, &mut store);

        let text = dom.child_nodes(company)[0];
        dom.set_data(text, "Globex");
        let records = dom.take_mutation_records();
        assert_eq!(watcher.on_batch(&dom, &mut store, &records), None);

        let mut config = WatcherConfig::default();
        config.observe.character_data = true;
        let mut watcher = MutationWatcher::new(&config);
        watcher.start(&dom, &mut store);
        let result = watcher.on_batch(&dom, &mut store, &records).unwrap();
        assert_eq!(result.company_name.as_deref(), Some("Globex"));
    }

    #[test]
    fn empty_text_keeps_the_cached_value() {
        let (mut dom, company) = page();
        let mut store = store();
        let mut watcher = MutationWatcher::new(&WatcherConfig::default());
        watcher.start(&dom, &mut store);

        dom.set_text_content(company, "   ");
        let records = dom.take_mutation_records();
        let result = watcher.on_batch(&dom, &mut store, &records).unwrap();
        assert_eq!(result.company_name, None);
        assert_eq!(
            store.get(FieldKind::CompanyName).unwrap().last_known_text,
            "Acme Corp"
        );
    }

    #[test]
    fn scoped_watcher_skips_unrelated_batches() {
        let (mut dom, company) = page();
        let mut store = store();
        let config = WatcherConfig {
            scope_to_resolved: true,
            ..WatcherConfig::default()
        };
        let mut watcher = MutationWatcher::new(&config);
        watcher.start(&dom, &mut store);

        let body = dom.body().unwrap();
        let footer = dom.element(body, "footer", &[]);
        dom.take_mutation_records();
        dom.text_node(footer, "(c) 2024");
        let unrelated = dom.take_mutation_records();
        assert_eq!(watcher.on_batch(&dom, &mut store, &unrelated), None);

        dom.set_text_content(company, "Acme Corp Inc");
        let related = dom.take_mutation_records();
        let result = watcher.on_batch(&dom, &mut store, &related).unwrap();
        assert_eq!(result.company_name.as_deref(), Some("Acme Corp Inc"));
    }

    #[test]
    fn scoped_watcher_sees_earlier_match_inserted_elsewhere() {
        let mut dom = MemoryDom::new();
        let body = dom.body().unwrap();
        let header = dom.element(body, "header", &[]);
        let main = dom.element(body, "main", &[]);
        let old = dom.element(main, "h2", &[("class", "title")]);
        dom.text_node(old, "Old Job");
        dom.take_mutation_records();

        let mut store = LocatorStore::new();
        store.commit(Binding::new(
            FieldKind::JobTitle,
            Locator::new(".title"),
            "Old Job",
        ));
        store.take_pending();

        let config = WatcherConfig {
            scope_to_resolved: true,
            ..WatcherConfig::default()
        };
        let mut watcher = MutationWatcher::new(&config);
        watcher.start(&dom, &mut store);

        let new = dom.element(header, "h2", &[("class", "title")]);
        dom.text_node(new, "New Job");
        let records = dom.take_mutation_records();

        let result = watcher.on_batch(&dom, &mut store, &records).unwrap();
        assert_eq!(result.get(FieldKind::JobTitle), Some("New Job"));
        assert_eq!(result.get(FieldKind::CompanyName), None);
        assert_eq!(
            store.get(FieldKind::JobTitle).unwrap().last_known_text,
            "New Job"
        );
    }

    #[test]
    fn every_refresh_is_counted() {
        let (mut dom, company) = page();
        let mut store = store();
        let mut watcher = MutationWatcher::new(&WatcherConfig::default());
        assert_eq!(watcher.extractions(), 0);

        watcher.start(&dom, &mut store);
        dom.set_text_content(company, "Globex");
        let records = dom.take_mutation_records();
        watcher.on_batch(&dom, &mut store, &records);
        assert_eq!(watcher.extractions(), 2);
    }
}
