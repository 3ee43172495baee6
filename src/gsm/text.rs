// ABOUTME: Text payload conversions: septet packing, UCS-2, BCD digits, Latin-1 and USSD/CBS strings
// ABOUTME: All functions are pure; strict decoders return CodecError, lenient ones are total

use super::charset::convert_gsm_to_utf8;
use super::data_coding::{GsmEncoding, decode_cbs_dcs};
use crate::codec::CodecError;

const BCD_ALPHABET: &[u8; 15] = b"0123456789*#abc";

/// Septets carried by `len` packed bytes
pub fn max_septets(len: usize) -> usize {
    len * 8 / 7
}

/// Unpack GSM septets from packed octets.
///
/// Emits `min(max_chars, max_septets(data.len()))` septets.
pub fn unpack_7bit(data: &[u8], max_chars: usize) -> Vec<u8> {
    let count = max_chars.min(max_septets(data.len()));
    let mut out = Vec::with_capacity(count);

    for i in 0..count {
        let bit = i * 7;
        let byte = bit / 8;
        let shift = bit % 8;

        let mut value = (data[byte] >> shift) as u16;
        if shift > 1 {
            value |= (data[byte + 1] as u16) << (8 - shift);
        }
        out.push((value & 0x7F) as u8);
    }

    out
}

/// Pack septets into octets, the inverse of [`unpack_7bit`].
pub fn pack_7bit(septets: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; (septets.len() * 7).div_ceil(8)];

    for (i, &septet) in septets.iter().enumerate() {
        let septet = septet & 0x7F;
        let bit = i * 7;
        let byte = bit / 8;
        let shift = bit % 8;

        out[byte] |= septet << shift;
        if shift > 1 {
            out[byte + 1] |= septet >> (8 - shift);
        }
    }

    out
}

/// Append a Unicode scalar value to `out`.
///
/// Surrogates and values above U+10FFFF are rejected.
pub fn append_codepoint(out: &mut String, value: u32) -> Result<(), CodecError> {
    let ch = char::from_u32(value).ok_or(CodecError::InvalidCodepoint(value))?;
    out.push(ch);
    Ok(())
}

/// Decode UCS-2 (with UTF-16 surrogate pairs) into a string.
pub fn convert_ucs2_to_utf8(data: &[u8], big_endian: bool) -> Result<String, CodecError> {
    if data.len() % 2 != 0 {
        return Err(CodecError::OddLength(data.len()));
    }

    let unit = |i: usize| {
        let pair = [data[i], data[i + 1]];
        if big_endian {
            u16::from_be_bytes(pair)
        } else {
            u16::from_le_bytes(pair)
        }
    };

    let mut out = String::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let high = unit(i) as u32;

        let value = if (0xD800..=0xDBFF).contains(&high) {
            if i + 3 >= data.len() {
                return Err(CodecError::InvalidSurrogate(i));
            }
            let low = unit(i + 2) as u32;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(CodecError::InvalidSurrogate(i));
            }
            i += 2;
            ((high - 0xD800) << 10) + (low - 0xDC00) + 0x10000
        } else {
            high
        };

        append_codepoint(&mut out, value)?;
        i += 2;
    }

    Ok(out)
}

/// ISO-8859-1 bytes map one-to-one onto the first 256 codepoints
pub fn convert_latin1_to_utf8(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

/// Decode swapped-nibble BCD digits, stopping at the first 0xF filler.
pub fn decode_bcd(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);

    'outer: for &byte in data {
        for nibble in [byte & 0x0F, byte >> 4] {
            if nibble == 0x0F {
                break 'outer;
            }
            out.push(BCD_ALPHABET[nibble as usize] as char);
        }
    }

    out
}

/// USSD strings are dialled codes: digits, `*`, `+` and `#`.
pub fn is_valid_ussd(cmd: &str) -> bool {
    !cmd.is_empty()
        && cmd
            .bytes()
            .all(|c| c.is_ascii_digit() || matches!(c, b'*' | b'+' | b'#'))
}

/// Decode a USSD or cell broadcast payload according to its CBS coding scheme.
pub fn decode_cbs_text(data: &[u8], dcs: u8) -> Result<String, CodecError> {
    let scheme = decode_cbs_dcs(dcs).ok_or(CodecError::UnsupportedDcs(dcs))?;

    if scheme.compressed || scheme.has_iso_lang {
        return Err(CodecError::UnsupportedUssd);
    }

    match scheme.encoding {
        GsmEncoding::Gsm7 => {
            let mut septets = unpack_7bit(data, usize::MAX);
            // A final CR fills the spare septet when the text ends on an octet boundary
            if septets.len() % 8 == 0 && septets.last() == Some(&0x0D) {
                septets.pop();
            }
            Ok(convert_gsm_to_utf8(&septets))
        }
        GsmEncoding::Eight => Ok(convert_gsm_to_utf8(data)),
        GsmEncoding::Ucs2 => convert_ucs2_to_utf8(data, true),
    }
}
