//! Turns document text plus analysis issues into inline-marked markup.
//!
//! The render is always rebuilt wholesale from the text it was derived from;
//! there is no partial update path.

pub mod caret;

use serde::Serialize;

use crate::network::{Issue, IssueCategory};
use crate::utils::floor_char_boundary;

pub use caret::{CaretPolicy, CaretPosition, locate_caret};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerData {
    pub category: IssueCategory,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub text: String,
    pub marker: Option<MarkerData>,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            marker: None,
        }
    }

    pub fn is_marker(&self) -> bool {
        self.marker.is_some()
    }
}

/// Replaces `&`, `<`, `>`, `"` and `'` with their entity equivalents.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Splits `text` into plain and marker segments, one marker per issue.
///
/// Issues are walked in ascending offset order. An issue that starts before
/// the end of the previous one is skipped; ranges are clamped to the text.
pub fn segment(text: &str, issues: &[Issue]) -> Vec<Segment> {
    let mut ordered: Vec<&Issue> = issues.iter().collect();
    ordered.sort_by_key(|issue| issue.offset);

    let mut segments = Vec::with_capacity(ordered.len() * 2 + 1);
    let mut cursor = 0_usize;
    for issue in ordered {
        let start = floor_char_boundary(text, issue.offset);
        let end = floor_char_boundary(text, issue.end());
        if start < cursor || start >= end {
            continue;
        }

        if start > cursor {
            segments.push(Segment::plain(&text[cursor..start]));
        }
        segments.push(Segment {
            text: text[start..end].to_string(),
            marker: Some(MarkerData {
                category: issue.category,
                suggestions: issue.suggestions.clone(),
            }),
        });
        cursor = end;
    }

    if cursor < text.len() || segments.is_empty() {
        segments.push(Segment::plain(&text[cursor..]));
    }
    segments
}

/// Serialises segments to markup. Marker spans carry their index in
/// `data-marker` and their suggestions as an escaped JSON array.
pub fn to_markup(segments: &[Segment]) -> String {
    let mut markup = String::new();
    for (index, segment) in segments.iter().enumerate() {
        let Some(marker) = &segment.marker else {
            markup.push_str(&escape_html(&segment.text));
            continue;
        };

        let suggestions =
            serde_json::to_string(&marker.suggestions).unwrap_or_else(|_| "[]".to_string());
        markup.push_str(&format!(
            "<span class=\"{}\" data-marker=\"{}\" data-suggestions=\"{}\">{}</span>",
            marker.category.css_class(),
            index,
            escape_html(&suggestions),
            escape_html(&segment.text)
        ));
    }
    markup
}

/// Concatenated text of all segments.
pub fn plain_text(segments: &[Segment]) -> String {
    segments.iter().map(|segment| segment.text.as_str()).collect()
}

/// One full render of the document.
#[derive(Debug, Clone, Default)]
pub struct RenderedDocument {
    pub generation: u64,
    pub segments: Vec<Segment>,
    pub markup: String,
}

impl RenderedDocument {
    pub fn new(generation: u64, text: &str, issues: &[Issue]) -> Self {
        let segments = segment(text, issues);
        let markup = to_markup(&segments);
        Self {
            generation,
            segments,
            markup,
        }
    }

    pub fn marker(&self, index: usize) -> Option<&MarkerData> {
        self.segments
            .get(index)
            .and_then(|segment| segment.marker.as_ref())
    }

    pub fn marker_count(&self) -> usize {
        self.segments.iter().filter(|segment| segment.is_marker()).count()
    }

    pub fn refresh_markup(&mut self) {
        self.markup = to_markup(&self.segments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(offset: usize, length: usize, category: IssueCategory, suggestions: &[&str]) -> Issue {
        Issue {
            offset,
            length,
            category,
            suggestions: suggestions.iter().map(|value| value.to_string()).collect(),
        }
    }

    /// Drops every tag and decodes the five entities `escape_html` produces.
    fn strip_markup(markup: &str) -> String {
        let mut text = String::new();
        let mut in_tag = false;
        for ch in markup.chars() {
            match ch {
                '<' => in_tag = true,
                '>' if in_tag => in_tag = false,
                other if !in_tag => text.push(other),
                _ => {}
            }
        }
        text.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#039;", "'")
            .replace("&amp;", "&")
    }

    #[test]
    fn text_without_issues_is_only_escaped() {
        let text = "Tom & Jerry <3 \"quotes\" 'single'";
        let segments = segment(text, &[]);
        let markup = to_markup(&segments);

        assert_eq!(markup, escape_html(text));
        assert!(!markup.contains("<span"));
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn empty_text_renders_empty_markup() {
        let segments = segment("", &[]);
        assert_eq!(to_markup(&segments), "");
        assert_eq!(plain_text(&segments), "");
    }

    #[test]
    fn markers_wrap_issue_text_with_category_and_suggestions() {
        let text = "I has a speling error";
        let issues = vec![
            issue(8, 7, IssueCategory::Spelling, &["spelling"]),
            issue(2, 3, IssueCategory::Grammar, &["have"]),
        ];

        let markup = to_markup(&segment(text, &issues));

        assert_eq!(
            markup,
            "I <span class=\"error-grammar\" data-marker=\"1\" data-suggestions=\"[&quot;have&quot;]\">has</span> a \
             <span class=\"error-spell\" data-marker=\"3\" data-suggestions=\"[&quot;spelling&quot;]\">speling</span> error"
        );
    }

    #[test]
    fn stripping_markers_reconstructs_original_text() {
        let samples = [
            ("plain text only", vec![]),
            (
                "a <b> & 'c' \"d\"",
                vec![
                    issue(0, 1, IssueCategory::Spelling, &["A"]),
                    issue(2, 3, IssueCategory::Grammar, &[]),
                    issue(8, 3, IssueCategory::Grammar, &["'x'"]),
                ],
            ),
            ("über naïve", vec![issue(6, 6, IssueCategory::Spelling, &["naive"])]),
            ("tail", vec![issue(0, 4, IssueCategory::Spelling, &["tale"])]),
        ];

        for (text, issues) in samples {
            let segments = segment(text, &issues);
            assert_eq!(plain_text(&segments), text);
            assert_eq!(strip_markup(&to_markup(&segments)), text);
        }
    }

    #[test]
    fn hostile_input_is_escaped_in_plain_and_marker_segments() {
        let text = "<script>&\"' <script>&\"'";
        let issues = vec![issue(12, 11, IssueCategory::Grammar, &["<b>"])];

        let markup = to_markup(&segment(text, &issues));

        assert!(!markup.contains("<script>"));
        assert_eq!(markup.matches("&lt;script&gt;&amp;&quot;&#039;").count(), 2);
        assert!(markup.contains("[&quot;&lt;b&gt;&quot;]"));
    }

    #[test]
    fn overlapping_and_out_of_range_issues_are_skipped() {
        let text = "abcdef";
        let issues = vec![
            issue(0, 3, IssueCategory::Grammar, &[]),
            issue(1, 2, IssueCategory::Grammar, &[]),
            issue(4, 10, IssueCategory::Spelling, &[]),
            issue(20, 1, IssueCategory::Spelling, &[]),
        ];

        let segments = segment(text, &issues);

        let markers: Vec<&str> = segments
            .iter()
            .filter(|segment| segment.is_marker())
            .map(|segment| segment.text.as_str())
            .collect();
        assert_eq!(markers, vec!["abc", "ef"]);
        assert_eq!(plain_text(&segments), text);
    }

    #[test]
    fn rendered_document_resolves_markers_by_index() {
        let document = RenderedDocument::new(
            4,
            "teh cat",
            &[issue(0, 3, IssueCategory::Spelling, &["the"])],
        );

        assert_eq!(document.generation, 4);
        assert_eq!(document.marker_count(), 1);
        assert_eq!(document.marker(0).map(|m| m.suggestions.clone()), Some(vec!["the".to_string()]));
        assert!(document.marker(1).is_none());
    }
}
