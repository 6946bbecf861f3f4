//! Learning mode: point at an element, click it, bind it to a field.
//!
//! ```text
//! Idle --enable--> Listening --click--> Classifying --field--> Committing --> Idle
//!                      ^                     |
//!                      +------aborted--------+
//! Listening | Classifying --disable--> Idle
//! ```

mod classifier;
mod highlight;

pub use classifier::{Classification, ConfirmClassifier, FieldClassifier, HintClassifier};
pub use highlight::Highlighter;

use crate::config::LearningConfig;
use crate::dom::Dom;
use crate::locator::generate_locator_with_tier;
use crate::resolution::resolve;
use crate::store::LocatorStore;
use fieldmark_common::{Binding, FieldKind, LocatorError, NodeId};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningState {
    Idle,
    Listening,
    Classifying,
    Committing,
}

/// A click as seen by the capture-phase handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub target: NodeId,
    /// Text currently selected in the document, untrimmed.
    pub selection: String,
}

impl ClickEvent {
    pub fn new(target: NodeId, selection: impl Into<String>) -> Self {
        Self {
            target,
            selection: selection.into(),
        }
    }
}

/// What the host must do with the original event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDisposition {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventDisposition {
    pub const PASS_THROUGH: EventDisposition = EventDisposition {
        prevent_default: false,
        stop_propagation: false,
    };

    pub const SUPPRESS: EventDisposition = EventDisposition {
        prevent_default: true,
        stop_propagation: true,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Not listening, or the target is excluded.
    Ignored,
    /// Nothing selected; still listening.
    NoSelection,
    /// No locator could be built; still listening and nothing was stored.
    Detached(LocatorError),
    /// The classifier declined; still listening.
    Aborted,
    Committed(Binding),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClickResult {
    pub disposition: EventDisposition,
    pub outcome: ClickOutcome,
}

impl ClickResult {
    fn new(disposition: EventDisposition, outcome: ClickOutcome) -> Self {
        Self {
            disposition,
            outcome,
        }
    }
}

pub struct LearningController {
    highlighter: Highlighter,
    exclude_ids: Vec<String>,
    state: LearningState,
    hint: Option<FieldKind>,
    last_selected: Option<NodeId>,
}

impl LearningController {
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            highlighter: Highlighter::new(config),
            exclude_ids: config.exclude_ids.clone(),
            state: LearningState::Idle,
            hint: None,
            last_selected: None,
        }
    }

    pub fn state(&self) -> LearningState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == LearningState::Listening
    }

    pub fn hint(&self) -> Option<FieldKind> {
        self.hint
    }

    /// Element marked by the most recent commit of this controller.
    pub fn last_selected(&self) -> Option<NodeId> {
        self.last_selected
    }

    /// Enters learning mode. Injects the stylesheet if missing and re-marks
    /// every element that committed bindings currently resolve to. Enabling
    /// while already listening only replaces the hint.
    pub fn enable<D: Dom + ?Sized>(
        &mut self,
        dom: &mut D,
        store: &LocatorStore,
        hint: Option<FieldKind>,
    ) {
        self.hint = hint;
        if self.state != LearningState::Idle {
            debug!(hint = ?hint, "Learning mode already active");
            return;
        }

        self.highlighter.inject_styles(dom);
        for binding in store.bindings() {
            match resolve(dom, &binding.locator) {
                Ok(Some(node)) => self.highlighter.mark_selected(dom, node),
                Ok(None) => {}
                Err(e) => warn!(field = %binding.field_kind, "Stored locator is invalid: {}", e),
            }
        }

        self.state = LearningState::Listening;
        info!(hint = ?hint, "Learning mode enabled");
    }

    /// Leaves learning mode from any state. Transient highlights are removed;
    /// the last committed element keeps its selected mark.
    pub fn disable<D: Dom + ?Sized>(&mut self, dom: &mut D) {
        self.highlighter.clear_transient(dom);
        if let Some(node) = self.last_selected.filter(|node| dom.is_connected(*node)) {
            self.highlighter.mark_selected(dom, node);
        }
        if self.state != LearningState::Idle {
            info!("Learning mode disabled");
        }
        self.state = LearningState::Idle;
        self.hint = None;
    }

    /// Hover handler. Returns whether `node` is now highlighted.
    pub fn pointer_over<D: Dom + ?Sized>(&mut self, dom: &mut D, node: NodeId) -> bool {
        if !self.is_listening() || !dom.is_element(node) || self.is_excluded(dom, node) {
            return false;
        }
        self.highlighter.highlight(dom, node);
        true
    }

    /// Capture-phase click handler.
    pub fn click<D, C>(
        &mut self,
        dom: &mut D,
        store: &mut LocatorStore,
        event: &ClickEvent,
        classifier: &mut C,
    ) -> ClickResult
    where
        D: Dom + ?Sized,
        C: FieldClassifier + ?Sized,
    {
        if !self.is_listening() || self.is_excluded(dom, event.target) {
            return ClickResult::new(EventDisposition::PASS_THROUGH, ClickOutcome::Ignored);
        }
        let suppress = EventDisposition::SUPPRESS;

        let text = event.selection.trim();
        if text.is_empty() {
            debug!(node = %event.target, "Click without a selection");
            return ClickResult::new(suppress, ClickOutcome::NoSelection);
        }

        let ignored = [
            self.highlighter.highlight_class(),
            self.highlighter.selected_class(),
        ];
        let locator = match generate_locator_with_tier(dom, event.target, &ignored) {
            Ok((locator, _)) => locator,
            Err(e) => {
                warn!(node = %event.target, "Cannot build a locator: {}", e);
                return ClickResult::new(suppress, ClickOutcome::Detached(e));
            }
        };

        self.state = LearningState::Classifying;
        let kind = match classifier.classify(text, self.hint) {
            Classification::Field(kind) => kind,
            Classification::Aborted => {
                debug!("Classification aborted");
                self.state = LearningState::Listening;
                return ClickResult::new(suppress, ClickOutcome::Aborted);
            }
        };

        self.state = LearningState::Committing;
        let binding = Binding::new(kind, locator, text);
        store.commit(binding.clone());

        self.highlighter.clear_transient(dom);
        self.highlighter.mark_selected(dom, event.target);
        self.last_selected = Some(event.target);
        self.state = LearningState::Idle;
        self.hint = None;
        info!(
            field = %kind,
            locator = %binding.locator,
            text = %binding.last_known_text,
            "Saved selection"
        );

        ClickResult::new(suppress, ClickOutcome::Committed(binding))
    }

    /// Whether `node` or one of its ancestors carries an excluded id.
    fn is_excluded<D: Dom + ?Sized>(&self, dom: &D, node: NodeId) -> bool {
        if self.exclude_ids.is_empty() {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if dom
                .attribute(id, "id")
                .is_some_and(|value| self.exclude_ids.iter().any(|ex| ex == value))
            {
                return true;
            }
            current = dom.parent(id);
        }
        false
    }
}
