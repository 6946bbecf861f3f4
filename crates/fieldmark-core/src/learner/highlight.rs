use crate::config::LearningConfig;
use crate::dom::{descendants, Dom};
use fieldmark_common::NodeId;
use tracing::debug;

/// Applies the transient and persistent marker classes and owns the
/// stylesheet that renders them.
#[derive(Debug, Clone)]
pub struct Highlighter {
    highlight_class: String,
    selected_class: String,
    style_id: String,
}

impl Highlighter {
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            highlight_class: config.highlight_class.clone(),
            selected_class: config.selected_class.clone(),
            style_id: config.style_id.clone(),
        }
    }

    pub fn highlight_class(&self) -> &str {
        &self.highlight_class
    }

    pub fn selected_class(&self) -> &str {
        &self.selected_class
    }

    pub fn stylesheet(&self) -> String {
        format!(
            ".{highlight} {{\n  outline: 2px solid #007bff;\n  outline-offset: 2px;\n  transition: outline 0.2s ease-in-out;\n}}\n\
             .{selected} {{\n  outline: 2px solid #28a745;\n  outline-offset: 2px;\n  transition: outline 0.2s ease-in-out;\n}}\n",
            highlight = self.highlight_class,
            selected = self.selected_class,
        )
    }

    /// Adds the `<style>` element once per document. Returns whether it was
    /// inserted by this call.
    pub fn inject_styles<D: Dom + ?Sized>(&self, dom: &mut D) -> bool {
        if dom.get_element_by_id(&self.style_id).is_some() {
            return false;
        }

        let style = dom.create_element("style");
        dom.set_attribute(style, "id", &self.style_id);
        let css = dom.create_text(&self.stylesheet());
        dom.append_child(style, css);

        let container = dom.head().unwrap_or_else(|| dom.root());
        dom.append_child(container, style);
        debug!(style_id = %self.style_id, "Injected highlight stylesheet");
        true
    }

    /// Moves the transient highlight to `node`.
    pub fn highlight<D: Dom + ?Sized>(&self, dom: &mut D, node: NodeId) {
        self.clear_transient(dom);
        dom.add_class(node, &self.highlight_class);
    }

    /// Removes the transient highlight from every element in the document.
    pub fn clear_transient<D: Dom + ?Sized>(&self, dom: &mut D) {
        let view: &D = dom;
        let marked: Vec<NodeId> = descendants(view, view.root())
            .filter(|node| view.has_class(*node, &self.highlight_class))
            .collect();
        for node in marked {
            dom.remove_class(node, &self.highlight_class);
        }
    }

    pub fn mark_selected<D: Dom + ?Sized>(&self, dom: &mut D, node: NodeId) {
        dom.add_class(node, &self.selected_class);
    }
}
