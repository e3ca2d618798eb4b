//! Live document counters shown next to the editor.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    /// Unicode scalar values, so an accented letter counts once.
    pub characters: usize,
    pub words: usize,
    /// Literal U+0020 spaces only; tabs and newlines are not counted.
    pub spaces: usize,
}

impl TextStats {
    pub fn count(text: &str) -> Self {
        Self {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
            spaces: text.matches(' ').count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_text_have_no_words() {
        assert_eq!(TextStats::count(""), TextStats::default());
        assert_eq!(
            TextStats::count("   \n"),
            TextStats {
                characters: 4,
                words: 0,
                spaces: 3
            }
        );
    }

    #[test]
    fn runs_of_whitespace_separate_single_words() {
        let stats = TextStats::count("  two  words\there\n");

        assert_eq!(stats.words, 3);
        assert_eq!(stats.spaces, 4);
        assert_eq!(stats.characters, 18);
    }

    #[test]
    fn characters_are_counted_not_bytes() {
        assert_eq!(TextStats::count("café ✓").characters, 6);
    }
}
