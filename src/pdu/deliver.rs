// ABOUTME: SMS-DELIVER body (network to mobile), GSM 03.40 section 9.2.2.1
// ABOUTME: Decoded after the service-centre address and the first octet

use super::address::PduAddr;
use super::datetime::PduDateTime;
use super::{PduType, read_user_data};
use crate::codec::{BinaryReader, CodecError};

const MMS: u8 = 0x04;
const LP: u8 = 0x08;
const SRI: u8 = 0x20;
const UDHI: u8 = 0x40;
const RP: u8 = 0x80;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PduDeliver {
    /// Originating address
    pub src: PduAddr,
    /// Service-centre timestamp
    pub dt: PduDateTime,
    /// TP-User-Data-Header-Indicator
    pub udhi: bool,
    /// TP-More-Messages-to-Send
    pub mms: bool,
    /// TP-Loop-Prevention
    pub lp: bool,
    /// TP-Status-Report-Indication
    pub sri: bool,
    /// TP-Reply-Path
    pub rp: bool,
    pub pid: u8,
    pub dcs: u8,
    pub udl: u8,
    pub data: Vec<u8>,
}

impl PduDeliver {
    pub fn decode(reader: &mut BinaryReader<'_>, flags: u8) -> Result<Self, CodecError> {
        let src = PduAddr::decode(reader, false)?;
        let pid = reader.read_byte()?;
        let dcs = reader.read_byte()?;
        let dt = PduDateTime::decode(reader)?;
        let udl = reader.read_byte()?;
        let data = read_user_data(reader, PduType::Deliver, udl, dcs)?;

        Ok(Self {
            src,
            dt,
            udhi: flags & UDHI != 0,
            mms: flags & MMS != 0,
            lp: flags & LP != 0,
            sri: flags & SRI != 0,
            rp: flags & RP != 0,
            pid,
            dcs,
            udl,
            data,
        })
    }
}
