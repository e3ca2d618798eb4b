use crate::editor::tooltip::{MarkerId, TooltipController};
use crate::network::Issue;
use crate::render::{MarkerData, RenderedDocument};
use crate::storage::Theme;

/// Identifies one dispatched analysis request and the document it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    pub generation: u64,
    pub revision: u64,
    pub text: String,
}

/// All mutable editor state. Owned by the controller task and only touched
/// from its event loop.
#[derive(Debug, Default)]
pub struct EditorState {
    text: String,
    revision: u64,
    pub caret: Option<usize>,
    pub rendered: RenderedDocument,
    rendered_revision: u64,
    render_generation: u64,
    latest_check: u64,
    pub tooltip: TooltipController,
    pub locked: bool,
    pub fix_all_in_flight: bool,
    pub theme: Theme,
    /// Trimmed; empty when no search is active.
    pub search_term: String,
}

impl EditorState {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.revision += 1;
    }

    pub fn next_ticket(&mut self) -> CheckTicket {
        self.latest_check += 1;
        CheckTicket {
            generation: self.latest_check,
            revision: self.revision,
            text: self.text.clone(),
        }
    }

    /// A response is current when no newer check was dispatched and the
    /// document has not changed since its request.
    pub fn is_current(&self, ticket: &CheckTicket) -> bool {
        ticket.generation == self.latest_check && ticket.revision == self.revision
    }

    /// Replaces the render wholesale; every previously issued marker id dies.
    pub fn install_render(&mut self, text: &str, issues: &[Issue]) -> &RenderedDocument {
        self.render_generation += 1;
        self.rendered = RenderedDocument::new(self.render_generation, text, issues);
        self.rendered_revision = self.revision;
        &self.rendered
    }

    /// Records that the render was edited in place to match the current text.
    pub fn sync_render_revision(&mut self) {
        self.rendered_revision = self.revision;
    }

    pub fn render_is_current(&self) -> bool {
        self.rendered_revision == self.revision
    }

    pub fn resolve_marker(&self, marker: MarkerId) -> Option<&MarkerData> {
        if marker.generation != self.rendered.generation || !self.render_is_current() {
            return None;
        }
        self.rendered.marker(marker.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::IssueCategory;

    fn spelling(offset: usize, length: usize) -> Issue {
        Issue {
            offset,
            length,
            category: IssueCategory::Spelling,
            suggestions: vec!["fix".to_string()],
        }
    }

    #[test]
    fn ticket_goes_stale_after_edit_or_newer_check() {
        let mut state = EditorState::new("first");
        let first = state.next_ticket();
        assert!(state.is_current(&first));

        let second = state.next_ticket();
        assert!(!state.is_current(&first));
        assert!(state.is_current(&second));

        state.set_text("changed".to_string());
        assert!(!state.is_current(&second));
    }

    #[test]
    fn markers_resolve_only_for_the_current_render() {
        let mut state = EditorState::new("teh cat");
        state.install_render("teh cat", &[spelling(0, 3)]);
        let marker = MarkerId::new(state.rendered.generation, 0);
        assert!(state.resolve_marker(marker).is_some());

        state.install_render("teh cat", &[spelling(0, 3)]);
        assert!(state.resolve_marker(marker).is_none());
        assert!(state.resolve_marker(MarkerId::new(state.rendered.generation, 0)).is_some());
    }

    #[test]
    fn edits_invalidate_markers_until_the_next_render() {
        let mut state = EditorState::new("teh cat");
        state.install_render("teh cat", &[spelling(0, 3)]);
        let marker = MarkerId::new(state.rendered.generation, 0);

        state.set_text("teh cats".to_string());

        assert!(!state.render_is_current());
        assert!(state.resolve_marker(marker).is_none());
    }
}
