use std::io::Write;

use base64::Engine;

use crate::export::ExportError;

/// Terminals commonly cap OSC 52 payloads around this size.
pub const MAX_OSC52_PAYLOAD_BYTES: usize = 100_000;

/// Builds the OSC 52 escape that asks the terminal to set its clipboard.
pub fn osc52_sequence(text: &str) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{payload}\x07")
}

pub fn write_osc52<W: Write>(writer: &mut W, text: &str) -> Result<(), ExportError> {
    let sequence = osc52_sequence(text);
    if sequence.len() > MAX_OSC52_PAYLOAD_BYTES {
        return Err(ExportError::Clipboard(format!(
            "text is too large for terminal clipboard ({} bytes encoded)",
            sequence.len()
        )));
    }

    writer
        .write_all(sequence.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|err| ExportError::Clipboard(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_wraps_base64_payload() {
        assert_eq!(osc52_sequence("hi"), "\x1b]52;c;aGk=\x07");
    }

    #[test]
    fn write_emits_sequence_bytes() {
        let mut buffer = Vec::new();
        write_osc52(&mut buffer, "copy me").expect("write should succeed");

        let written = String::from_utf8(buffer).expect("utf8");
        let payload = written
            .strip_prefix("\x1b]52;c;")
            .and_then(|rest| rest.strip_suffix('\x07'))
            .expect("osc 52 framing");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .expect("base64 decode should succeed");
        assert_eq!(decoded, b"copy me");
    }

    #[test]
    fn oversized_text_is_rejected() {
        let mut buffer = Vec::new();
        let text = "x".repeat(MAX_OSC52_PAYLOAD_BYTES);
        assert!(matches!(
            write_osc52(&mut buffer, &text),
            Err(ExportError::Clipboard(_))
        ));
        assert!(buffer.is_empty());
    }
}
