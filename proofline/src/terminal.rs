//! Line-oriented host for the editor controller.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::editor::tooltip::{MarkerBounds, MarkerId, TooltipPanel};
use crate::editor::{CopyLabel, EditorEvent, EditorView, FixAllLabel};
use crate::export::ExportError;
use crate::export::clipboard::write_osc52;
use crate::network::Issue;
use crate::render::{CaretPosition, RenderedDocument, plain_text};
use crate::search::SearchHighlight;
use crate::stats::TextStats;
use crate::storage::Theme;

/// What the host last saw rendered. Used to address markers and to append
/// typed lines to the current document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot(Arc<Mutex<SessionSnapshot>>);

impl SharedSnapshot {
    pub fn get(&self) -> SessionSnapshot {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Appends `line` to the document and returns the new text.
    pub fn append_line(&self, line: &str) -> String {
        let mut snapshot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !snapshot.text.is_empty() {
            snapshot.text.push('\n');
        }
        snapshot.text.push_str(line);
        snapshot.text.clone()
    }

    fn replace(&self, generation: u64, text: String) {
        let mut snapshot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        snapshot.generation = generation;
        snapshot.text = text;
    }
}

pub struct TerminalView<W: Write + Send + 'static> {
    out: W,
    snapshot: SharedSnapshot,
}

impl<W: Write + Send + 'static> TerminalView<W> {
    pub fn new(out: W, snapshot: SharedSnapshot) -> Self {
        Self { out, snapshot }
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!("failed to write to terminal: {err}");
        }
    }
}

impl<W: Write + Send + 'static> EditorView for TerminalView<W> {
    fn replace_content(&mut self, document: &RenderedDocument) {
        self.snapshot
            .replace(document.generation, plain_text(&document.segments));

        self.emit(&format!("--- render {} ---", document.generation));
        self.emit(&document.markup);
        for (index, segment) in document.segments.iter().enumerate() {
            let Some(marker) = &segment.marker else {
                continue;
            };
            self.emit(&format!(
                "  [{index}] {:?} {} -> {}",
                segment.text,
                marker.category.css_class(),
                marker.suggestions.join(", ")
            ));
        }
    }

    fn place_caret(&mut self, caret: CaretPosition) {
        debug!(?caret, "caret placed");
    }

    fn show_tooltip(&mut self, panel: &TooltipPanel) {
        self.emit(&format!(
            "  {}: {} (at {:.0},{:.0})",
            panel.heading(),
            panel.items().join(" | "),
            panel.left,
            panel.top
        ));
    }

    fn hide_tooltip(&mut self) {
        self.emit("  (suggestions hidden)");
    }

    fn set_fix_all_label(&mut self, label: FixAllLabel) {
        self.emit(&format!("[{}]", label.text()));
    }

    fn set_copy_label(&mut self, label: CopyLabel) {
        self.emit(&format!("[{}]", label.text()));
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.emit(&format!("theme: {} ({})", theme.as_str(), theme.toggle_label()));
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), ExportError> {
        write_osc52(&mut self.out, text)
    }

    fn update_stats(&mut self, stats: TextStats) {
        self.emit(&format!(
            "chars: {} words: {} spaces: {}",
            stats.characters, stats.words, stats.spaces
        ));
    }

    fn show_search(&mut self, highlight: &SearchHighlight) {
        if highlight.term.is_empty() {
            self.emit("search cleared");
            return;
        }
        self.emit(&format!(
            "search {:?}: {} found",
            highlight.term, highlight.occurrences
        ));
        self.emit(&highlight.markup);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    /// A plain line of text to append to the document.
    Append(String),
    Copy,
    Save,
    Clear,
    Fix,
    Theme,
    Hover(usize),
    Leave,
    Apply { index: usize, suggestion: String },
    /// An empty term clears the search.
    Find(String),
    Replace(String),
    Report,
    Quit,
}

impl TerminalCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Self::Append(line.to_string()));
        };

        let (name, args) = command.split_once(' ').unwrap_or((command, ""));
        match name {
            "copy" => Ok(Self::Copy),
            "save" => Ok(Self::Save),
            "clear" => Ok(Self::Clear),
            "fix" => Ok(Self::Fix),
            "theme" => Ok(Self::Theme),
            "leave" => Ok(Self::Leave),
            "report" => Ok(Self::Report),
            "quit" | "q" => Ok(Self::Quit),
            "find" => Ok(Self::Find(args.trim().to_string())),
            "replace" => Ok(Self::Replace(args.to_string())),
            "hover" => Ok(Self::Hover(parse_index(args)?)),
            "apply" => {
                let (index, suggestion) = args.split_once(' ').unwrap_or((args, ""));
                let index = parse_index(index)?;
                if suggestion.is_empty() {
                    return Err("usage: :apply N TEXT".to_string());
                }
                Ok(Self::Apply {
                    index,
                    suggestion: suggestion.to_string(),
                })
            }
            other => Err(format!("unknown command :{other}")),
        }
    }

    /// Maps the command to a controller event. `Report` and `Quit` are
    /// handled by the caller and yield `None`.
    pub fn into_event(self, snapshot: &SharedSnapshot) -> Option<EditorEvent> {
        let marker = |index| MarkerId::new(snapshot.get().generation, index);
        let event = match self {
            Self::Append(line) => EditorEvent::Edit {
                text: snapshot.append_line(&line),
                caret: None,
            },
            Self::Copy => EditorEvent::Copy,
            Self::Save => EditorEvent::Download,
            Self::Clear => EditorEvent::Clear,
            Self::Fix => EditorEvent::FixAll,
            Self::Theme => EditorEvent::ToggleTheme,
            Self::Hover(index) => EditorEvent::PointerOverMarker {
                marker: marker(index),
                bounds: MarkerBounds {
                    left: 0.0,
                    top: 0.0,
                    right: 0.0,
                    bottom: 1.0,
                },
            },
            Self::Leave => EditorEvent::PointerOverText,
            Self::Apply { index, suggestion } => EditorEvent::ApplySuggestion {
                marker: marker(index),
                suggestion,
            },
            Self::Find(term) => EditorEvent::Search { term },
            Self::Replace(replacement) => EditorEvent::ReplaceAll { replacement },
            Self::Report | Self::Quit => return None,
        };
        Some(event)
    }
}

fn parse_index(value: &str) -> Result<usize, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("expected a marker number, got {value:?}"))
}

/// One human-readable line per issue: `line:column category "text" -> suggestions`.
pub fn describe_issues(text: &str, issues: &[Issue]) -> Vec<String> {
    issues
        .iter()
        .filter_map(|issue| {
            let flagged = text.get(issue.offset..issue.end())?;
            let before = &text[..issue.offset];
            let line = before.matches('\n').count() + 1;
            let column = before
                .rsplit('\n')
                .next()
                .map_or(0, |tail| tail.chars().count())
                + 1;
            let suggestions = if issue.suggestions.is_empty() {
                "(no suggestions)".to_string()
            } else {
                issue.suggestions.join(", ")
            };
            Some(format!(
                "{line}:{column} {} {flagged:?} -> {suggestions}",
                issue.category.css_class()
            ))
        })
        .collect()
}
