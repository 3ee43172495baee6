// ABOUTME: Hex transcoding for PDU bodies exchanged through AT+CMGL / AT+CMGR / AT+CMGS
// ABOUTME: Includes the lenient decode used for modem replies that may not be hex at all

use crate::codec::CodecError;

/// Decode a hex string (either case) into bytes.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(s.trim()).map_err(|e| CodecError::InvalidHex(e.to_string()))
}

pub fn encode_hex(data: &[u8], uppercase: bool) -> String {
    if uppercase {
        hex::encode_upper(data)
    } else {
        hex::encode(data)
    }
}

/// Hex-decode `s`, or return its bytes unchanged when it is not valid hex.
///
/// Some modems answer text-mode commands even when PDU mode was requested.
pub fn hex_or_raw(s: &str) -> Vec<u8> {
    decode_hex(s).unwrap_or_else(|_| s.as_bytes().to_vec())
}
