//! The editor controller: one task that owns the document, the render, the
//! tooltip and every pending delay, and processes host events serially.
//!
//! Suspension points are the analysis requests (spawned, their completion is
//! posted back as a message) and the delays in [`timer`]. Nothing else yields,
//! so state is never observed half-updated.

pub mod correction;
pub mod debounce;
pub mod timer;
pub mod tooltip;


use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::export::{ExportError, export_text};
use crate::metrics::{AnalysisMetrics, AnalysisReport};
use crate::network::{Checker, Issue, NetworkError};
use crate::render::{CaretPolicy, CaretPosition, RenderedDocument, locate_caret};
use crate::search::{SearchHighlight, replace_word};
use crate::settings::EditorSettings;
use crate::state::{CheckTicket, EditorState};
use crate::stats::TextStats;
use crate::storage::{KeyValueStore, SAVED_TEXT_KEY, Theme};

use correction::{apply_all_corrections, replace_marker};
use debounce::Debouncer;
use timer::{DelayHandle, TimerKind};
use tooltip::{MarkerBounds, MarkerId, TooltipEffect, TooltipPanel};

pub use tooltip::TooltipState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixAllLabel {
    Idle,
    Fixing,
    Fixed,
    Failed,
}

impl FixAllLabel {
    pub fn text(self) -> &'static str {
        match self {
            Self::Idle => "🪄 Fix All",
            Self::Fixing => "⏳ Fixing...",
            Self::Fixed => "✅ Fixed!",
            Self::Failed => "⚠️ Try Again",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyLabel {
    Idle,
    Copied,
}

impl CopyLabel {
    pub fn text(self) -> &'static str {
        match self {
            Self::Idle => "📋 Copy Text",
            Self::Copied => "✅",
        }
    }
}

/// The host surface the controller renders into.
pub trait EditorView: Send + 'static {
    /// Replaces the editable region with `document.markup`. Marker ids the
    /// host reports back must carry `document.generation`.
    fn replace_content(&mut self, document: &RenderedDocument);
    fn place_caret(&mut self, caret: CaretPosition);
    fn show_tooltip(&mut self, panel: &TooltipPanel);
    fn hide_tooltip(&mut self);
    fn set_fix_all_label(&mut self, label: FixAllLabel);
    fn set_copy_label(&mut self, label: CopyLabel);
    fn apply_theme(&mut self, theme: Theme);
    fn write_clipboard(&mut self, text: &str) -> Result<(), ExportError>;
    /// Called after every change to the document.
    fn update_stats(&mut self, stats: TextStats);
    /// The search pane. A blank term comes with the plain escaped text.
    fn show_search(&mut self, highlight: &SearchHighlight);
}

/// Events delivered by the host, in the order the user produced them.
#[derive(Debug)]
pub enum EditorEvent {
    /// The editable region changed. `caret` is a char offset when known.
    Edit { text: String, caret: Option<usize> },
    PointerOverMarker { marker: MarkerId, bounds: MarkerBounds },
    /// Pointer is over editor text outside any marker.
    PointerOverText,
    PointerEnterTooltip,
    PointerLeaveTooltip,
    ApplySuggestion { marker: MarkerId, suggestion: String },
    FixAll,
    Copy,
    Download,
    Clear,
    ToggleTheme,
    /// Highlights whole-word occurrences of `term` until it is cleared.
    Search { term: String },
    /// Replaces every occurrence of the active search term.
    ReplaceAll { replacement: String },
    Report(oneshot::Sender<AnalysisReport>),
    Shutdown,
}

pub(crate) enum Message {
    Host(EditorEvent),
    TimerFired {
        kind: TimerKind,
        token: u64,
    },
    CheckCompleted {
        ticket: CheckTicket,
        latency_ms: u64,
        result: Result<Vec<Issue>, NetworkError>,
    },
    FixAllCompleted {
        ticket: CheckTicket,
        latency_ms: u64,
        result: Result<Vec<Issue>, NetworkError>,
    },
}

type Completion = fn(CheckTicket, u64, Result<Vec<Issue>, NetworkError>) -> Message;

/// Cloneable sender used by the host to feed the controller.
#[derive(Clone)]
pub struct EditorHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl EditorHandle {
    pub fn send(&self, event: EditorEvent) -> Result<(), AppError> {
        self.tx
            .send(Message::Host(event))
            .map_err(|_| AppError::Runtime("editor controller has stopped".to_string()))
    }

    pub fn edit(&self, text: impl Into<String>) -> Result<(), AppError> {
        self.send(EditorEvent::Edit {
            text: text.into(),
            caret: None,
        })
    }

    pub async fn report(&self) -> Result<AnalysisReport, AppError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EditorEvent::Report(reply_tx))?;
        reply_rx
            .await
            .map_err(|_| AppError::Runtime("editor controller dropped the report".to_string()))
    }

    pub fn shutdown(&self) -> Result<(), AppError> {
        self.send(EditorEvent::Shutdown)
    }
}

pub struct EditorController<V: EditorView> {
    settings: EditorSettings,
    checker: Arc<dyn Checker>,
    view: V,
    store: Option<KeyValueStore>,
    export_dir: PathBuf,
    state: EditorState,
    metrics: AnalysisMetrics,
    debouncer: Debouncer,
    hide_timer: DelayHandle,
    recheck_timer: DelayHandle,
    fix_all_label_timer: DelayHandle,
    copy_label_timer: DelayHandle,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl<V: EditorView> EditorController<V> {
    pub fn new(settings: EditorSettings, checker: Arc<dyn Checker>, view: V) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            debouncer: Debouncer::new(settings.check_delay()),
            settings,
            checker,
            view,
            store: None,
            export_dir: PathBuf::from("."),
            state: EditorState::default(),
            metrics: AnalysisMetrics::new(),
            hide_timer: DelayHandle::new(TimerKind::Hide),
            recheck_timer: DelayHandle::new(TimerKind::Recheck),
            fix_all_label_timer: DelayHandle::new(TimerKind::FixAllLabel),
            copy_label_timer: DelayHandle::new(TimerKind::CopyLabel),
            tx,
            rx,
        }
    }

    /// Persists the document and theme in `store` and restores them on start.
    pub fn with_store(mut self, store: KeyValueStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn handle(&self) -> EditorHandle {
        EditorHandle {
            tx: self.tx.clone(),
        }
    }

    /// Processes events until [`EditorEvent::Shutdown`], then hands the view back.
    pub async fn run(mut self) -> V {
        self.restore();
        info!("editor controller started");

        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Host(EditorEvent::Shutdown) => break,
                Message::Host(event) => self.handle_event(event),
                Message::TimerFired { kind, token } => self.handle_timer(kind, token),
                Message::CheckCompleted {
                    ticket,
                    latency_ms,
                    result,
                } => self.handle_check_completed(ticket, latency_ms, result),
                Message::FixAllCompleted {
                    ticket,
                    latency_ms,
                    result,
                } => self.handle_fix_all_completed(ticket, latency_ms, result),
            }
        }

        self.teardown();
        self.view
    }

    fn restore(&mut self) {
        let Some(store) = self.store.clone() else {
            return;
        };

        match store.theme() {
            Ok(theme) => {
                self.state.theme = theme;
                self.view.apply_theme(theme);
            }
            Err(err) => warn!("failed to restore theme: {err}"),
        }

        match store.saved_text() {
            Ok(Some(text)) if !text.is_empty() => {
                info!(chars = text.chars().count(), "restored saved document");
                self.state.set_text(text.clone());
                self.document_changed();
                self.render(&text, &[]);
                self.debouncer.on_edit(self.state.locked, &self.tx);
            }
            Ok(_) => {}
            Err(err) => warn!("failed to restore saved document: {err}"),
        }
    }

    fn teardown(&mut self) {
        self.debouncer.cancel();
        self.hide_timer.cancel();
        self.recheck_timer.cancel();
        self.fix_all_label_timer.cancel();
        self.copy_label_timer.cancel();
        self.state.tooltip.clear();

        let report = self.metrics.report();
        info!(
            checks_completed = report.checks_completed,
            checks_failed = report.checks_failed,
            stale_responses_discarded = report.stale_responses_discarded,
            corrections_applied = report.corrections_applied,
            p95_ms = report.check_latency.p95_ms,
            "editor controller stopped"
        );
    }

    fn handle_event(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::Edit { text, caret } => self.on_edit(text, caret),
            EditorEvent::PointerOverMarker { marker, bounds } => {
                if self.state.resolve_marker(marker).is_none() {
                    debug!(?marker, "pointer over a marker that is no longer rendered");
                    return;
                }
                let effect = self.state.tooltip.pointer_over_marker(marker);
                self.apply_tooltip_effect(effect, bounds);
            }
            EditorEvent::PointerOverText => {
                let effect = self.state.tooltip.pointer_over_text();
                self.apply_tooltip_effect(effect, MarkerBounds::default());
            }
            EditorEvent::PointerEnterTooltip => {
                let effect = self.state.tooltip.pointer_enter_panel();
                self.apply_tooltip_effect(effect, MarkerBounds::default());
            }
            EditorEvent::PointerLeaveTooltip => {
                let effect = self.state.tooltip.pointer_leave_panel();
                self.apply_tooltip_effect(effect, MarkerBounds::default());
            }
            EditorEvent::ApplySuggestion { marker, suggestion } => {
                self.apply_suggestion(marker, &suggestion)
            }
            EditorEvent::FixAll => self.start_fix_all(),
            EditorEvent::Copy => self.copy_to_clipboard(),
            EditorEvent::Download => self.download(),
            EditorEvent::Clear => self.clear(),
            EditorEvent::ToggleTheme => self.toggle_theme(),
            EditorEvent::Search { term } => {
                self.state.search_term = term.trim().to_string();
                self.show_search();
            }
            EditorEvent::ReplaceAll { replacement } => self.replace_all(&replacement),
            EditorEvent::Report(reply) => {
                let _ = reply.send(self.metrics.report());
            }
            EditorEvent::Shutdown => {}
        }
    }

    fn handle_timer(&mut self, kind: TimerKind, token: u64) {
        match kind {
            TimerKind::Check => {
                if self.debouncer.fire(token) {
                    self.start_check();
                }
            }
            TimerKind::Hide => {
                if self.hide_timer.take_fired(token) {
                    let effect = self.state.tooltip.hide_elapsed();
                    self.apply_tooltip_effect(effect, MarkerBounds::default());
                }
            }
            TimerKind::Recheck => {
                if self.recheck_timer.take_fired(token) {
                    self.state.locked = false;
                    self.start_check();
                }
            }
            TimerKind::FixAllLabel => {
                if self.fix_all_label_timer.take_fired(token) {
                    self.view.set_fix_all_label(FixAllLabel::Idle);
                }
            }
            TimerKind::CopyLabel => {
                if self.copy_label_timer.take_fired(token) {
                    self.view.set_copy_label(CopyLabel::Idle);
                }
            }
        }
    }

    fn on_edit(&mut self, text: String, caret: Option<usize>) {
        self.state.set_text(text);
        self.state.caret = caret;
        self.document_changed();

        // The rendered markers no longer line up with the text.
        self.dismiss_tooltip();

        if !self.debouncer.on_edit(self.state.locked, &self.tx) {
            self.metrics.record_locked_skip();
            debug!("edit arrived while a correction is settling; check not scheduled");
        }
    }

    /// Checks the current document.
    fn start_check(&mut self) {
        if self.state.locked {
            self.metrics.record_locked_skip();
            debug!("skipping check while a correction is settling");
            return;
        }
        if self.state.text().trim().is_empty() {
            return;
        }

        let ticket = self.state.next_ticket();
        debug!(generation = ticket.generation, revision = ticket.revision, "dispatching check");
        self.dispatch(ticket, |ticket, latency_ms, result| Message::CheckCompleted {
            ticket,
            latency_ms,
            result,
        });
    }

    /// Runs the checker off the event loop. A checker that panics still
    /// reports back, as a request failure.
    fn dispatch(&self, ticket: CheckTicket, completion: Completion) {
        let checker = Arc::clone(&self.checker);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let text = ticket.text.clone();
            let result = match tokio::spawn(async move { checker.check(&text).await }).await {
                Ok(result) => result,
                Err(err) => Err(NetworkError::Request(format!("check task failed: {err}"))),
            };
            let latency_ms = started.elapsed().as_millis() as u64;
            let _ = tx.send(completion(ticket, latency_ms, result));
        });
    }

    fn handle_check_completed(
        &mut self,
        ticket: CheckTicket,
        latency_ms: u64,
        result: Result<Vec<Issue>, NetworkError>,
    ) {
        let issues = match result {
            Ok(issues) => issues,
            Err(err) => {
                self.metrics.record_failure();
                warn!(generation = ticket.generation, "analysis check failed: {err}");
                return;
            }
        };
        self.metrics.record_check(latency_ms);

        if !self.state.is_current(&ticket) {
            if self.settings.discard_stale_responses {
                self.metrics.record_stale_discard();
                debug!(
                    generation = ticket.generation,
                    revision = ticket.revision,
                    current_revision = self.state.revision(),
                    "discarding stale analysis response"
                );
                return;
            }
            if ticket.revision != self.state.revision() {
                warn!(
                    generation = ticket.generation,
                    "rendering a response for an older document; newer edits are overwritten"
                );
                self.state.set_text(ticket.text.clone());
                self.document_changed();
            }
        }

        self.render(&ticket.text, &issues);
    }

    fn render(&mut self, text: &str, issues: &[Issue]) {
        let rendered = self.state.install_render(text, issues);
        debug!(
            generation = rendered.generation,
            markers = rendered.marker_count(),
            "rendering analysis results"
        );
        self.view.replace_content(rendered);

        let caret = match (self.settings.caret, self.state.caret) {
            (CaretPolicy::Preserve, Some(offset)) => {
                locate_caret(&self.state.rendered.segments, offset)
            }
            _ => CaretPosition::End,
        };
        self.view.place_caret(caret);

        // A visible panel points at a marker from the replaced render.
        self.dismiss_tooltip();
    }

    fn apply_tooltip_effect(&mut self, effect: TooltipEffect, bounds: MarkerBounds) {
        match effect {
            TooltipEffect::None => {}
            TooltipEffect::CancelHide => self.hide_timer.cancel(),
            TooltipEffect::Show(marker) => {
                self.hide_timer.cancel();
                if let Some(data) = self.state.resolve_marker(marker) {
                    let panel = TooltipPanel::new(marker, data, bounds);
                    self.view.show_tooltip(&panel);
                }
            }
            TooltipEffect::ScheduleHide => {
                self.hide_timer
                    .schedule(self.settings.hide_delay(), &self.tx);
            }
            TooltipEffect::Hide => self.view.hide_tooltip(),
        }
    }

    fn dismiss_tooltip(&mut self) {
        self.hide_timer.cancel();
        if self.state.tooltip.clear() {
            self.view.hide_tooltip();
        }
    }

    fn apply_suggestion(&mut self, marker: MarkerId, suggestion: &str) {
        if self.state.resolve_marker(marker).is_none() {
            debug!(?marker, "ignoring suggestion for a marker that is no longer rendered");
            return;
        }
        let Some(text) = replace_marker(&mut self.state.rendered.segments, marker.index, suggestion)
        else {
            return;
        };

        self.state.rendered.refresh_markup();
        self.state.set_text(text);
        self.state.sync_render_revision();
        self.document_changed();
        self.metrics.record_corrections(1);
        info!(?marker, "applied suggestion");

        self.dismiss_tooltip();
        self.view.replace_content(&self.state.rendered);

        self.debouncer.cancel();
        self.state.locked = true;
        self.recheck_timer
            .schedule(self.settings.settle_delay(), &self.tx);
    }

    fn start_fix_all(&mut self) {
        if self.state.text().trim().is_empty() {
            return;
        }
        if self.state.fix_all_in_flight {
            debug!("fix all already in flight");
            return;
        }

        self.state.fix_all_in_flight = true;
        self.fix_all_label_timer.cancel();
        self.view.set_fix_all_label(FixAllLabel::Fixing);

        let ticket = self.state.next_ticket();
        self.dispatch(ticket, |ticket, latency_ms, result| Message::FixAllCompleted {
            ticket,
            latency_ms,
            result,
        });
    }

    fn handle_fix_all_completed(
        &mut self,
        ticket: CheckTicket,
        latency_ms: u64,
        result: Result<Vec<Issue>, NetworkError>,
    ) {
        self.state.fix_all_in_flight = false;

        let issues = match result {
            Ok(issues) => issues,
            Err(err) => {
                self.metrics.record_failure();
                error!("fix all failed: {err}");
                self.flash_fix_all_label(FixAllLabel::Failed);
                return;
            }
        };
        self.metrics.record_check(latency_ms);

        if self.settings.discard_stale_responses && ticket.revision != self.state.revision() {
            self.metrics.record_stale_discard();
            warn!("document changed while fixing; corrections were not applied");
            self.flash_fix_all_label(FixAllLabel::Failed);
            return;
        }

        let (corrected, applied) = apply_all_corrections(&ticket.text, &issues);
        info!(applied, "applied all corrections");
        self.metrics.record_corrections(applied as u64);

        self.debouncer.cancel();
        self.state.set_text(corrected);
        self.document_changed();
        let text = self.state.text().to_string();
        self.render(&text, &[]);
        self.start_check();

        self.flash_fix_all_label(FixAllLabel::Fixed);
    }

    fn flash_fix_all_label(&mut self, label: FixAllLabel) {
        self.view.set_fix_all_label(label);
        self.fix_all_label_timer
            .schedule(self.settings.label_revert_delay(), &self.tx);
    }

    fn copy_to_clipboard(&mut self) {
        match self.view.write_clipboard(self.state.text()) {
            Ok(()) => {
                self.view.set_copy_label(CopyLabel::Copied);
                self.copy_label_timer
                    .schedule(self.settings.label_revert_delay(), &self.tx);
            }
            Err(err) => warn!("failed to copy document: {err}"),
        }
    }

    fn download(&mut self) {
        match export_text(&self.export_dir, self.state.text()) {
            Ok(path) => info!(path = %path.display(), "exported document"),
            Err(err) => warn!("failed to export document: {err}"),
        }
    }

    fn clear(&mut self) {
        self.debouncer.cancel();
        self.state.set_text(String::new());
        self.state.caret = None;
        self.document_changed();
        self.render("", &[]);

        if let Some(store) = &self.store {
            if let Err(err) = store.remove(SAVED_TEXT_KEY) {
                warn!("failed to clear saved document: {err}");
            }
        }
    }

    fn toggle_theme(&mut self) {
        let theme = self.state.theme.toggled();
        self.state.theme = theme;
        if let Some(store) = &self.store {
            if let Err(err) = store.set_theme(theme) {
                warn!("failed to persist theme: {err}");
            }
        }
        self.view.apply_theme(theme);
    }

    fn replace_all(&mut self, replacement: &str) {
        if self.state.search_term.is_empty() {
            debug!("replace all without a search term");
            return;
        }

        match replace_word(self.state.text(), &self.state.search_term, replacement) {
            Ok((_, 0)) => debug!(term = %self.state.search_term, "nothing to replace"),
            Ok((text, count)) => {
                info!(count, term = %self.state.search_term, "replaced search term");
                self.on_edit(text, None);
            }
            Err(err) => warn!("failed to replace search term: {err}"),
        }
    }

    fn show_search(&mut self) {
        match SearchHighlight::new(self.state.text(), &self.state.search_term) {
            Ok(highlight) => self.view.show_search(&highlight),
            Err(err) => warn!("failed to highlight search term: {err}"),
        }
    }

    /// Persists the document and refreshes everything derived from it
    /// outside the render.
    fn document_changed(&mut self) {
        self.persist_text();
        self.view.update_stats(TextStats::count(self.state.text()));
        if !self.state.search_term.is_empty() {
            self.show_search();
        }
    }

    fn persist_text(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.set(SAVED_TEXT_KEY, self.state.text()) {
            warn!("failed to persist document: {err}");
        }
    }
}
