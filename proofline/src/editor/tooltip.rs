use serde::Serialize;

use crate::network::IssueCategory;
use crate::render::{MarkerData, escape_html};

/// Vertical gap between a marker's bottom edge and the panel.
pub const PANEL_GAP: f32 = 8.0;
pub const NO_SUGGESTIONS: &str = "No suggestions";

/// Weak reference to a rendered marker: only valid while `generation`
/// matches the current render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerId {
    pub generation: u64,
    pub index: usize,
}

impl MarkerId {
    pub fn new(generation: u64, index: usize) -> Self {
        Self { generation, index }
    }
}

/// On-screen box of a marker in page coordinates (scroll already applied).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarkerBounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipPanel {
    pub marker: MarkerId,
    pub category: IssueCategory,
    pub suggestions: Vec<String>,
    pub left: f32,
    pub top: f32,
}

impl TooltipPanel {
    pub fn new(marker: MarkerId, data: &MarkerData, bounds: MarkerBounds) -> Self {
        Self {
            marker,
            category: data.category,
            suggestions: data.suggestions.clone(),
            left: bounds.left,
            top: bounds.bottom + PANEL_GAP,
        }
    }

    pub fn heading(&self) -> &'static str {
        self.category.heading()
    }

    /// Suggestion rows, or the placeholder row when there are none.
    pub fn items(&self) -> Vec<&str> {
        if self.suggestions.is_empty() {
            vec![NO_SUGGESTIONS]
        } else {
            self.suggestions.iter().map(String::as_str).collect()
        }
    }

    pub fn to_markup(&self) -> String {
        let items: String = self
            .items()
            .into_iter()
            .map(|item| format!("<li>{}</li>", escape_html(item)))
            .collect();
        format!("<strong>{}:</strong><ul>{items}</ul>", self.heading())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TooltipState {
    #[default]
    Hidden,
    Visible(MarkerId),
}

/// What the owner must do after a pointer transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipEffect {
    None,
    CancelHide,
    /// Render the panel for this marker; any pending hide is cancelled.
    Show(MarkerId),
    ScheduleHide,
    Hide,
}

#[derive(Debug, Default)]
pub struct TooltipController {
    state: TooltipState,
    inside_hover_zone: bool,
    over_panel: bool,
    hide_pending: bool,
}

impl TooltipController {
    pub fn state(&self) -> TooltipState {
        self.state
    }

    pub fn active_marker(&self) -> Option<MarkerId> {
        match self.state {
            TooltipState::Visible(marker) => Some(marker),
            TooltipState::Hidden => None,
        }
    }

    pub fn pointer_over_marker(&mut self, marker: MarkerId) -> TooltipEffect {
        self.inside_hover_zone = true;
        self.hide_pending = false;
        if self.state == TooltipState::Visible(marker) {
            return TooltipEffect::CancelHide;
        }
        self.state = TooltipState::Visible(marker);
        TooltipEffect::Show(marker)
    }

    /// Pointer is over editor text that is not a marker.
    pub fn pointer_over_text(&mut self) -> TooltipEffect {
        // Text under the panel still counts as the panel.
        if self.over_panel {
            return TooltipEffect::None;
        }
        self.inside_hover_zone = false;
        if self.state == TooltipState::Hidden || self.hide_pending {
            return TooltipEffect::None;
        }
        self.hide_pending = true;
        TooltipEffect::ScheduleHide
    }

    pub fn pointer_enter_panel(&mut self) -> TooltipEffect {
        self.inside_hover_zone = true;
        self.over_panel = true;
        self.hide_pending = false;
        TooltipEffect::CancelHide
    }

    pub fn pointer_leave_panel(&mut self) -> TooltipEffect {
        self.inside_hover_zone = false;
        self.over_panel = false;
        if self.state == TooltipState::Hidden {
            return TooltipEffect::None;
        }
        self.hide_pending = true;
        TooltipEffect::ScheduleHide
    }

    /// The grace period ran out without the hide being cancelled.
    pub fn hide_elapsed(&mut self) -> TooltipEffect {
        self.hide_pending = false;
        if self.inside_hover_zone || self.over_panel || self.state == TooltipState::Hidden {
            return TooltipEffect::None;
        }
        self.state = TooltipState::Hidden;
        TooltipEffect::Hide
    }

    /// Drops all hover state; returns whether the panel was visible.
    pub fn clear(&mut self) -> bool {
        let was_visible = self.state != TooltipState::Hidden;
        *self = Self::default();
        was_visible
    }
}
