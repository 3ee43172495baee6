// ABOUTME: Turns a decoded PDU's user data into text, splitting off the User Data Header first
// ABOUTME: 7-bit bodies skip the septets covered by the header and its fill bits

use super::Pdu;
use super::udh::UserDataHeader;
use crate::codec::CodecError;
use crate::gsm::{
    GsmEncoding, convert_gsm_to_utf8, convert_latin1_to_utf8, convert_ucs2_to_utf8,
    decode_sms_dcs, unpack_7bit,
};

/// User data split into its header and decoded body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    pub header: UserDataHeader,
    /// Octets following the header, undecoded
    pub payload: Vec<u8>,
    pub text: String,
}

/// Decode raw TP-UD octets.
///
/// `udl` is the TP-UDL value as transmitted (septets for 7-bit text).
/// 8-bit bodies are rendered as ISO-8859-1.
pub fn decode_user_data(
    data: &[u8],
    udl: u8,
    udhi: bool,
    dcs: u8,
) -> Result<UserData, CodecError> {
    let scheme = decode_sms_dcs(dcs).ok_or(CodecError::UnsupportedDcs(dcs))?;
    if scheme.compressed {
        return Err(CodecError::Compressed);
    }

    let (header, header_len) = if udhi {
        UserDataHeader::decode(data)?
    } else {
        (UserDataHeader::default(), 0)
    };
    let payload = &data[header_len..];

    let text = match scheme.encoding {
        GsmEncoding::Gsm7 => {
            let septets = unpack_7bit(data, udl as usize);
            let skip = (header_len * 8).div_ceil(7);
            convert_gsm_to_utf8(septets.get(skip..).unwrap_or_default())
        }
        GsmEncoding::Eight => convert_latin1_to_utf8(payload),
        GsmEncoding::Ucs2 => convert_ucs2_to_utf8(payload, true)?,
    };

    Ok(UserData {
        header,
        payload: payload.to_vec(),
        text,
    })
}

impl Pdu {
    /// Decode this PDU's user data
    pub fn user_data(&self) -> Result<UserData, CodecError> {
        decode_user_data(self.data(), self.udl(), self.udhi(), self.dcs())
    }
}
