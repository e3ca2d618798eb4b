use serde::{Deserialize, Serialize};

use crate::render::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaretPolicy {
    /// Snap the caret to the end of the content after every full render.
    #[default]
    End,
    /// Restore the caret at the char offset reported by the last edit.
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretPosition {
    End,
    /// `offset` counts chars inside segment `segment`.
    Within { segment: usize, offset: usize },
}

/// Finds the segment holding the caret by counting chars through `segments`.
///
/// A caret sitting exactly on a boundary belongs to the earlier segment, so
/// typing continues the text it was placed after.
pub fn locate_caret(segments: &[Segment], char_offset: usize) -> CaretPosition {
    let mut remaining = char_offset;
    for (index, segment) in segments.iter().enumerate() {
        let len = segment.text.chars().count();
        if remaining <= len {
            return CaretPosition::Within {
                segment: index,
                offset: remaining,
            };
        }
        remaining -= len;
    }
    CaretPosition::End
}
