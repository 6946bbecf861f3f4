pub mod config;
pub mod dom;
pub mod extract;
pub mod learner;
pub mod locator;
pub mod resolution;
pub mod selector;
pub mod store;
pub mod watcher;

pub use dom::{BoxSize, Dom, MemoryDom, NodeKind, PageSnapshot};
pub use extract::{extract_visible_text, normalize_whitespace};
pub use learner::{
    Classification, ClickEvent, ClickOutcome, ClickResult, ConfirmClassifier, EventDisposition,
    FieldClassifier, HintClassifier, LearningController, LearningState,
};
pub use locator::{generate_locator, generate_locator_with_tier};
pub use resolution::{resolve, resolve_all};
pub use selector::{parse_selector, SelectorList};
pub use store::LocatorStore;
pub use watcher::MutationWatcher;

pub use fieldmark_common::*;
