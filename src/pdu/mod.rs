//! SMS transport layer PDU decoding (GSM 03.40).
//!
//! Input is the raw binary PDU as read back from the modem in PDU mode
//! (`AT+CMGF=0`), starting with the service-centre address. Hex transcoding
//! lives in [`crate::hex`].
//!
//! ```
//! use usbmodem::hex::decode_hex;
//! use usbmodem::pdu::{Pdu, PduType};
//!
//! let bytes = decode_hex("07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37").unwrap();
//! let pdu = Pdu::decode(&bytes, false).unwrap();
//! assert_eq!(pdu.pdu_type(), PduType::Deliver);
//! assert_eq!(pdu.user_data().unwrap().text, "hellohello");
//! ```

pub mod address;
pub mod datetime;
pub mod deliver;
pub mod submit;
pub mod udh;
pub mod user_data;
pub mod validity;

pub use address::{AddrType, NumberingPlan, PduAddr};
pub use datetime::PduDateTime;
pub use deliver::PduDeliver;
pub use submit::PduSubmit;
pub use udh::{AppPort, Concatenated, UserDataHeader};
pub use user_data::{UserData, decode_user_data};
pub use validity::{ValidityPeriod, ValidityPeriodFormat};

use num_enum::TryFromPrimitive;

use crate::codec::{BinaryReader, CodecError};
use crate::gsm::udl_to_bytes;

const MTI_MASK: u8 = 0x03;

/// TP-Message-Type-Indicator, combined with the direction of travel
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PduType {
    Deliver = 0,
    SubmitReport = 1,
    StatusReport = 2,
    Reserved = 3,
    DeliverReport = 4,
    Submit = 5,
    Command = 6,
    #[default]
    Unknown = 0xFF,
}

impl PduType {
    /// Resolve the message type from the first octet
    pub fn from_flags(flags: u8, to_smsc: bool) -> Self {
        match (flags & MTI_MASK, to_smsc) {
            (3, _) => PduType::Reserved,
            (mti, false) => PduType::try_from(mti).unwrap_or_default(),
            (mti, true) => PduType::try_from(mti + 4).unwrap_or_default(),
        }
    }

    /// Largest TP-UD octet count this type can carry
    pub fn max_data_size(self) -> usize {
        match self {
            PduType::Deliver | PduType::Submit => 140,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PduBody {
    Deliver(PduDeliver),
    Submit(PduSubmit),
}

/// A decoded SMS transport unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub smsc: PduAddr,
    pub body: PduBody,
}

impl Pdu {
    /// Decode a binary PDU.
    ///
    /// `to_smsc` is the direction of travel: stored outgoing messages are
    /// mobile-to-network, received ones network-to-mobile. Only SMS-DELIVER
    /// and SMS-SUBMIT are decoded.
    pub fn decode(data: &[u8], to_smsc: bool) -> Result<Self, CodecError> {
        let mut reader = BinaryReader::new(data);

        let smsc = PduAddr::decode(&mut reader, true)?;
        let flags = reader.read_byte()?;

        let body = match PduType::from_flags(flags, to_smsc) {
            PduType::Deliver => PduBody::Deliver(PduDeliver::decode(&mut reader, flags)?),
            PduType::Submit => PduBody::Submit(PduSubmit::decode(&mut reader, flags)?),
            other => return Err(CodecError::UnsupportedPduType(other)),
        };

        Ok(Self { smsc, body })
    }

    pub fn pdu_type(&self) -> PduType {
        match self.body {
            PduBody::Deliver(_) => PduType::Deliver,
            PduBody::Submit(_) => PduType::Submit,
        }
    }

    pub fn deliver(&self) -> Option<&PduDeliver> {
        match &self.body {
            PduBody::Deliver(deliver) => Some(deliver),
            _ => None,
        }
    }

    pub fn submit(&self) -> Option<&PduSubmit> {
        match &self.body {
            PduBody::Submit(submit) => Some(submit),
            _ => None,
        }
    }

    /// Originating address of a DELIVER, destination of a SUBMIT
    pub fn addr(&self) -> &PduAddr {
        match &self.body {
            PduBody::Deliver(deliver) => &deliver.src,
            PduBody::Submit(submit) => &submit.dst,
        }
    }

    pub fn dcs(&self) -> u8 {
        match &self.body {
            PduBody::Deliver(deliver) => deliver.dcs,
            PduBody::Submit(submit) => submit.dcs,
        }
    }

    pub fn udl(&self) -> u8 {
        match &self.body {
            PduBody::Deliver(deliver) => deliver.udl,
            PduBody::Submit(submit) => submit.udl,
        }
    }

    pub fn udhi(&self) -> bool {
        match &self.body {
            PduBody::Deliver(deliver) => deliver.udhi,
            PduBody::Submit(submit) => submit.udhi,
        }
    }

    pub fn data(&self) -> &[u8] {
        match &self.body {
            PduBody::Deliver(deliver) => &deliver.data,
            PduBody::Submit(submit) => &submit.data,
        }
    }
}

/// Read TP-UD, sized from TP-UDL through the coding scheme
fn read_user_data(
    reader: &mut BinaryReader<'_>,
    pdu_type: PduType,
    udl: u8,
    dcs: u8,
) -> Result<Vec<u8>, CodecError> {
    let len = udl_to_bytes(udl, dcs);
    if len == 0 && udl != 0 {
        return Err(CodecError::UnsupportedDcs(dcs));
    }

    let max = pdu_type.max_data_size();
    if len > max {
        return Err(CodecError::UserDataTooLong { length: len, max });
    }

    Ok(reader.read_bytes(len)?.to_vec())
}
