use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current time as milliseconds since Unix epoch.
pub fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts a UTF-16 code unit offset into a byte offset of `text`.
///
/// Returns `None` when the offset lies past the end of the text or inside a
/// surrogate pair.
pub fn utf16_to_byte_offset(text: &str, utf16_offset: usize) -> Option<usize> {
    let mut units = 0_usize;
    for (byte_index, ch) in text.char_indices() {
        if units == utf16_offset {
            return Some(byte_index);
        }
        if units > utf16_offset {
            return None;
        }
        units += ch.len_utf16();
    }

    (units == utf16_offset).then_some(text.len())
}

/// Clamps `index` to the text length and moves it back to the nearest char boundary.
pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }

    let mut boundary = index;
    while !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_offsets_map_to_ascii_bytes() {
        assert_eq!(utf16_to_byte_offset("hello", 0), Some(0));
        assert_eq!(utf16_to_byte_offset("hello", 3), Some(3));
        assert_eq!(utf16_to_byte_offset("hello", 5), Some(5));
        assert_eq!(utf16_to_byte_offset("hello", 6), None);
    }

    #[test]
    fn utf16_offsets_skip_multibyte_characters() {
        // "é" is one UTF-16 unit and two bytes, the emoji is two units and four bytes.
        let text = "é😀x";
        assert_eq!(utf16_to_byte_offset(text, 1), Some(2));
        assert_eq!(utf16_to_byte_offset(text, 3), Some(6));
        assert_eq!(utf16_to_byte_offset(text, 2), None);
    }

    #[test]
    fn floor_boundary_never_splits_characters() {
        let text = "aé";
        assert_eq!(floor_char_boundary(text, 2), 1);
        assert_eq!(floor_char_boundary(text, 10), text.len());
    }
}
