// ABOUTME: TP address and service-centre address fields (GSM 03.40 section 9.1.2.5)
// ABOUTME: Digits are swapped-nibble BCD; alphanumeric senders are packed GSM-7

use num_enum::TryFromPrimitive;
use std::fmt;

use crate::codec::{BinaryReader, CodecError};
use crate::gsm::{convert_gsm_to_utf8, decode_bcd, unpack_7bit};

/// Type of number, bits 6..4 of the type-of-address octet
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddrType {
    #[default]
    Unknown = 0,
    International = 1,
    National = 2,
    NetworkSpecific = 3,
    Subscriber = 4,
    Alphanumeric = 5,
    Abbreviated = 6,
    Reserved = 7,
}

/// Numbering plan identification, bits 3..0 of the type-of-address octet.
/// Unassigned plan values decode as `Reserved`.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum NumberingPlan {
    #[default]
    Unknown = 0,
    Isdn = 1,
    Data = 3,
    Telex = 4,
    ServiceCentre1 = 5,
    ServiceCentre2 = 6,
    National = 8,
    Private = 9,
    Ermes = 10,
    Reserved = 15,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PduAddr {
    pub number: String,
    pub addr_type: AddrType,
    pub plan: NumberingPlan,
}

impl PduAddr {
    pub fn is_empty(&self) -> bool {
        self.number.is_empty()
    }

    /// Decode an address field.
    ///
    /// The length octet of the service-centre address counts octets including
    /// the type octet, so `len - 1` bytes follow. Every other address counts
    /// semi-octets (digits), so `ceil(len / 2)` bytes follow.
    pub fn decode(reader: &mut BinaryReader<'_>, is_smsc: bool) -> Result<Self, CodecError> {
        let len = reader.read_byte()? as usize;
        if len == 0 {
            return Ok(Self::default());
        }

        let toa = reader.read_byte()?;
        let addr_type = AddrType::try_from((toa >> 4) & 0x07).unwrap_or(AddrType::Reserved);
        let plan = NumberingPlan::try_from(toa & 0x0F).unwrap_or(NumberingPlan::Reserved);

        let byte_count = if is_smsc { len - 1 } else { len.div_ceil(2) };
        let raw = reader.read_bytes(byte_count)?;

        let number = if addr_type == AddrType::Alphanumeric {
            let chars = if is_smsc { byte_count * 8 / 7 } else { len * 4 / 7 };
            convert_gsm_to_utf8(&unpack_7bit(raw, chars))
        } else {
            decode_bcd(raw)
        };

        Ok(Self {
            number,
            addr_type,
            plan,
        })
    }
}

impl fmt::Display for PduAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.addr_type == AddrType::International {
            write!(f, "+{}", self.number)
        } else {
            write!(f, "{}", self.number)
        }
    }
}
