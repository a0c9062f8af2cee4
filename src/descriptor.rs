//! USB string-descriptor encoding, matching the byte-array constants the
//! USB firmware embeds (`bLength`, `bDescriptorType = 3`, then UTF-16LE
//! code units).
//!
//! The encoding is the simplified two-byte form: each character becomes its
//! code point's low byte followed by 0x00. Characters above U+00FF truncate
//! silently; descriptors are ASCII in practice and the firmware shares the
//! limitation.

/// Descriptor type tag for string descriptors.
pub const STRING_DESCRIPTOR_TYPE: u8 = 3;

/// Encode `text` as a string-descriptor byte sequence.
pub fn encode(text: &str) -> Vec<u8> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::with_capacity(2 + 2 * chars.len());
    out.push((2 * chars.len() + 2) as u8);
    out.push(STRING_DESCRIPTOR_TYPE);
    for c in chars {
        out.push(c as u32 as u8);
        out.push(0x00);
    }
    out
}

/// Render the descriptor the way the firmware source writes the constant:
/// length and type in decimal, code units in hex.
pub fn format_literal(bytes: &[u8]) -> String {
    let mut s = String::from("[");
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        if i < 2 {
            s.push_str(&b.to_string());
        } else {
            s.push_str(&format!("0x{b:02X}"));
        }
    }
    s.push(']');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_single_char() {
        assert_eq!(encode("A"), vec![4, 3, 65, 0]);
    }

    #[test]
    fn encode_two_chars() {
        assert_eq!(encode("AB"), vec![6, 3, 65, 0, 66, 0]);
    }

    #[test]
    fn encode_empty_is_header_only() {
        assert_eq!(encode(""), vec![2, 3]);
    }

    #[test]
    fn high_code_points_truncate_to_low_byte() {
        // Documented limitation, kept as-is.
        assert_eq!(encode("\u{0141}"), vec![4, 3, 0x41, 0]);
    }

    #[test]
    fn literal_format_matches_firmware_style() {
        assert_eq!(format_literal(&encode("AB")), "[6, 3, 0x41, 0x00, 0x42, 0x00]");
    }
}
