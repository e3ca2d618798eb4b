use crate::network::Issue;
use crate::render::{Segment, plain_text};
use crate::utils::floor_char_boundary;

/// Applies every issue's first suggestion to `text`, highest offset first, so
/// that each replacement leaves the offsets of the remaining issues intact.
///
/// Ranges are clamped to the text; issues without suggestions are skipped.
/// Returns the corrected text and the number of replacements made.
pub fn apply_all_corrections(text: &str, issues: &[Issue]) -> (String, usize) {
    let mut ordered: Vec<&Issue> = issues.iter().collect();
    ordered.sort_by(|left, right| right.offset.cmp(&left.offset));

    let mut corrected = text.to_string();
    let mut applied = 0;
    for issue in ordered {
        let Some(best) = issue.best_suggestion() else {
            continue;
        };
        let start = floor_char_boundary(&corrected, issue.offset);
        let end = floor_char_boundary(&corrected, issue.end());
        if start > end {
            continue;
        }
        corrected.replace_range(start..end, best);
        applied += 1;
    }

    (corrected, applied)
}

/// Turns marker segment `index` into plain text holding `suggestion`.
/// Returns the resulting document text, or `None` when `index` is not a marker.
pub fn replace_marker(segments: &mut [Segment], index: usize, suggestion: &str) -> Option<String> {
    let segment = segments.get_mut(index)?;
    segment.marker.as_ref()?;

    segment.text = suggestion.to_string();
    segment.marker = None;
    Some(plain_text(segments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::IssueCategory;
    use crate::render::segment;

    fn issue(offset: usize, length: usize, suggestions: &[&str]) -> Issue {
        Issue {
            offset,
            length,
            category: IssueCategory::Spelling,
            suggestions: suggestions.iter().map(|value| value.to_string()).collect(),
        }
    }

    #[test]
    fn issues_are_applied_back_to_front() {
        let issues = vec![issue(5, 3, &["X"]), issue(0, 2, &["Y"])];

        let (corrected, applied) = apply_all_corrections("ab cde", &issues);

        assert_eq!(corrected, "Y cdX");
        assert_eq!(applied, 2);
    }

    #[test]
    fn length_changing_replacements_do_not_shift_earlier_issues() {
        // Ascending order would move "c" two bytes to the right before it is replaced.
        let issues = vec![issue(0, 1, &["xxx"]), issue(5, 1, &["y"])];

        let (corrected, _) = apply_all_corrections("a bb c", &issues);

        assert_eq!(corrected, "xxx bb y");
    }

    #[test]
    fn issues_without_suggestions_are_left_alone() {
        let issues = vec![issue(0, 3, &[]), issue(4, 4, &["four"])];

        let (corrected, applied) = apply_all_corrections("one fuor", &issues);

        assert_eq!(corrected, "one four");
        assert_eq!(applied, 1);
    }

    #[test]
    fn multibyte_text_is_never_split() {
        // Byte 2 falls inside "é", so the range is pulled back to end before it.
        let issues = vec![issue(0, 2, &["N"])];
        let (corrected, _) = apply_all_corrections("néx", &issues);
        assert_eq!(corrected, "Néx");
    }

    #[test]
    fn replacing_a_marker_produces_plain_text() {
        let mut segments = segment("I has it", &[issue(2, 3, &["have"])]);

        let text = replace_marker(&mut segments, 1, "have").expect("segment 1 is a marker");

        assert_eq!(text, "I have it");
        assert!(segments.iter().all(|segment| !segment.is_marker()));
    }

    #[test]
    fn replacing_a_plain_segment_is_refused() {
        let mut segments = segment("I has it", &[issue(2, 3, &["have"])]);
        assert_eq!(replace_marker(&mut segments, 0, "nope"), None);
        assert_eq!(replace_marker(&mut segments, 7, "nope"), None);
        assert_eq!(plain_text(&segments), "I has it");
    }
}
