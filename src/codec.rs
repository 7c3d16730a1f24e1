use crate::{*, model::*};

// C10: turns a user-entered string into the bytes a write needs, and bytes read back from the
// inferior into display text. Width metadata always travels with the bytes (the caller already
// knows `kind` on both ends), so round trips are exact for fixed-width kinds.

pub fn parse_value(kind: ValueKind, text: &str) -> Option<Vec<u8>> {
    match kind {
        ValueKind::Byte => pack_int(parse_int(text)?, 1),
        ValueKind::Word => pack_int(parse_int(text)?, 2),
        ValueKind::DWord => pack_int(parse_int(text)?, 4),
        ValueKind::QWord => pack_int(parse_int(text)?, 8),
        ValueKind::Float => text.trim().parse::<f32>().ok().map(|f| f.to_le_bytes().to_vec()),
        ValueKind::Double => text.trim().parse::<f64>().ok().map(|f| f.to_le_bytes().to_vec()),
        ValueKind::String {encoding, zero_terminated} => encode_string(text, encoding, zero_terminated),
        ValueKind::ByteArray => parse_byte_array(text),
    }
}

pub fn format_value(kind: ValueKind, bytes: &[u8]) -> Option<String> {
    match kind {
        ValueKind::Byte | ValueKind::Word | ValueKind::DWord | ValueKind::QWord => {
            let width = kind.fixed_width()?;
            if bytes.len() != width {
                return None;
            }
            let mut padded = [0u8; 8];
            padded[..width].copy_from_slice(bytes);
            Some(u64::from_le_bytes(padded).to_string())
        }
        ValueKind::Float => {
            let arr: [u8; 4] = bytes.try_into().ok()?;
            Some(f32::from_le_bytes(arr).to_string())
        }
        ValueKind::Double => {
            let arr: [u8; 8] = bytes.try_into().ok()?;
            Some(f64::from_le_bytes(arr).to_string())
        }
        ValueKind::String {encoding, zero_terminated} => decode_string(bytes, encoding, zero_terminated),
        ValueKind::ByteArray => Some(format_byte_array(bytes)),
    }
}

// Decimal, or `0x`-prefixed hex; an optional leading `-` applies to either form.
fn parse_int(text: &str) -> Option<i128> {
    let t = text.trim();
    let (neg, rest) = match t.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, t),
    };
    let magnitude = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => rest.parse::<i128>().ok()?,
    };
    Some(if neg {-magnitude} else {magnitude})
}

fn pack_int(value: i128, width: usize) -> Option<Vec<u8>> {
    let max_unsigned = (1i128 << (width * 8)) - 1;
    let min_signed = -(1i128 << (width * 8 - 1));
    if value > max_unsigned || value < min_signed {
        return None;
    }
    let bytes = (value as u64).to_le_bytes();
    Some(bytes[..width].to_vec())
}

fn encode_string(text: &str, encoding: StringEncoding, zero_terminated: bool) -> Option<Vec<u8>> {
    if encoding == StringEncoding::Ascii && !text.is_ascii() {
        return None;
    }
    let mut bytes = text.as_bytes().to_vec();
    if zero_terminated {
        bytes.push(0);
    }
    Some(bytes)
}

// Mirrors the read-by-expression rule: with `zero_terminated` set, a leading NUL means "the
// empty string" (rendered as the literal escape so it's visible in a table cell, not dropped),
// otherwise the text is truncated at the first NUL; without it, the whole buffer is the string.
fn decode_string(bytes: &[u8], encoding: StringEncoding, zero_terminated: bool) -> Option<String> {
    let text = match encoding {
        StringEncoding::Ascii => {
            if !bytes.is_ascii() {
                return None;
            }
            bytes.iter().map(|&b| b as char).collect::<String>()
        }
        StringEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
    };
    if zero_terminated {
        if bytes.first() == Some(&0) {
            return Some("\\x00".to_string());
        }
        return Some(match text.find('\0') {
            Some(idx) => text[..idx].to_string(),
            None => text,
        });
    }
    Some(text)
}

fn parse_byte_array(text: &str) -> Option<Vec<u8>> {
    let t = text.trim();
    if t.is_empty() {
        return Some(Vec::new());
    }
    t.split_whitespace()
        .map(|tok| {
            let hex = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")).unwrap_or(tok);
            u8::from_str_radix(hex, 16).ok()
        })
        .collect()
}

fn format_byte_array(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("0x{:02x}", b)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dword_round_trips_decimal_and_hex() {
        assert_eq!(parse_value(ValueKind::DWord, "255"), Some(vec![255, 0, 0, 0]));
        assert_eq!(parse_value(ValueKind::DWord, "0xff"), Some(vec![255, 0, 0, 0]));
        assert_eq!(format_value(ValueKind::DWord, &[255, 0, 0, 0]), Some("255".to_string()));
    }

    #[test]
    fn dword_rejects_out_of_range() {
        assert_eq!(parse_value(ValueKind::DWord, "0x100000000"), None);
        assert_eq!(parse_value(ValueKind::Byte, "256"), None);
    }

    #[test]
    fn negative_values_pack_as_twos_complement() {
        assert_eq!(parse_value(ValueKind::Byte, "-1"), Some(vec![0xff]));
        assert_eq!(parse_value(ValueKind::Word, "-1"), Some(vec![0xff, 0xff]));
    }

    #[test]
    fn double_round_trips() {
        let bytes = parse_value(ValueKind::Double, "3.5").unwrap();
        assert_eq!(format_value(ValueKind::Double, &bytes), Some("3.5".to_string()));
    }

    #[test]
    fn byte_array_wire_form_round_trips() {
        let bytes = parse_byte_array("0x4a 0xFF 0x00").unwrap();
        assert_eq!(bytes, vec![0x4a, 0xff, 0x00]);
        assert_eq!(format_byte_array(&bytes), "0x4a 0xff 0x00");
    }

    #[test]
    fn byte_array_rejects_malformed_token() {
        assert_eq!(parse_byte_array("0x4a zz"), None);
    }

    #[test]
    fn zero_terminated_string_truncates_at_first_nul() {
        let bytes = b"abc\0garbage";
        assert_eq!(
            decode_string(bytes, StringEncoding::Ascii, true),
            Some("abc".to_string())
        );
    }

    #[test]
    fn zero_terminated_string_leading_nul_is_escaped_empty() {
        let bytes = b"\0anything";
        assert_eq!(
            decode_string(bytes, StringEncoding::Ascii, true),
            Some("\\x00".to_string())
        );
    }

    #[test]
    fn ascii_encoding_rejects_non_ascii_text() {
        assert_eq!(encode_string("héllo", StringEncoding::Ascii, false), None);
        assert!(encode_string("héllo", StringEncoding::Utf8, false).is_some());
    }
}
