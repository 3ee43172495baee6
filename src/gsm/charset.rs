// ABOUTME: GSM 03.38 default alphabet and extension table lookups
// ABOUTME: Decoding is total (unknown input becomes a replacement or fallback character)

const ESCAPE: u8 = 0x1B;

/// Base table, indexed by septet value. The escape slot maps to NBSP and is
/// never emitted directly.
const BASE: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{A0}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

/// Escaped code -> character
const EXTENSION: [(u8, char); 11] = [
    (0x0A, '\u{0C}'),
    (0x0D, '\r'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

fn extension_char(code: u8) -> Option<char> {
    EXTENSION
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, ch)| *ch)
}

/// Convert unpacked GSM-7 septets to UTF-8.
///
/// An escape followed by an unmapped code renders as a space and the base
/// character. A trailing escape renders as a space. Bytes above 0x7F render
/// as U+FFFD.
pub fn convert_gsm_to_utf8(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    let mut iter = data.iter().copied();

    while let Some(c) = iter.next() {
        if c > 0x7F {
            out.push(char::REPLACEMENT_CHARACTER);
            continue;
        }

        if c != ESCAPE {
            out.push(BASE[c as usize]);
            continue;
        }

        match iter.next() {
            None => out.push(' '),
            Some(next) if next > 0x7F => {
                out.push(' ');
                out.push(char::REPLACEMENT_CHARACTER);
            }
            Some(next) => match extension_char(next) {
                Some(ch) => out.push(ch),
                None => {
                    out.push(' ');
                    out.push(BASE[next as usize]);
                }
            },
        }
    }

    out
}

/// Convert text to unpacked GSM-7 septets, or `None` if any character has no
/// representation in the default alphabet or its extension table.
pub fn convert_utf8_to_gsm(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());

    for ch in text.chars() {
        if let Some(pos) = BASE
            .iter()
            .position(|&b| b == ch)
            .filter(|&pos| pos != ESCAPE as usize)
        {
            out.push(pos as u8);
        } else if let Some((code, _)) = EXTENSION.iter().find(|(_, c)| *c == ch) {
            out.push(ESCAPE);
            out.push(*code);
        } else {
            return None;
        }
    }

    Some(out)
}

/// Whether every character of `text` can be sent in the GSM-7 alphabet
pub fn is_gsm_compatible(text: &str) -> bool {
    convert_utf8_to_gsm(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_table_lookup() {
        assert_eq!(convert_gsm_to_utf8(&[0x00, 0x01, 0x02]), "@£$");
        assert_eq!(convert_gsm_to_utf8(b"Hello"), "Hello");
        assert_eq!(convert_gsm_to_utf8(&[0x10, 0x5B, 0x7F]), "ΔÄà");
    }

    #[test]
    fn extension_table_lookup() {
        assert_eq!(convert_gsm_to_utf8(&[0x1B, 0x65]), "€");
        assert_eq!(convert_gsm_to_utf8(&[0x1B, 0x28, 0x41, 0x1B, 0x29]), "{A}");
        assert_eq!(convert_gsm_to_utf8(&[0x1B, 0x2F]), "\\");
    }

    #[test]
    fn unmapped_escape_falls_back() {
        assert_eq!(convert_gsm_to_utf8(&[0x1B, 0x41]), " A");
        assert_eq!(convert_gsm_to_utf8(&[0x41, 0x1B]), "A ");
    }

    #[test]
    fn high_bytes_become_replacement() {
        assert_eq!(convert_gsm_to_utf8(&[0x41, 0x80, 0xFF]), "A\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn encode_then_decode() {
        let text = "Price: 5€ [ok] {x} ~|^ @home";
        let septets = convert_utf8_to_gsm(text).unwrap();
        assert_eq!(convert_gsm_to_utf8(&septets), text);
    }

    #[test]
    fn encode_rejects_foreign_characters() {
        assert!(convert_utf8_to_gsm("Привет").is_none());
        assert!(!is_gsm_compatible("😀"));
        assert!(is_gsm_compatible("Hello, World!"));
    }
}
