// ABOUTME: SMS-SUBMIT body (mobile to network), GSM 03.40 section 9.2.2.2
// ABOUTME: Flag positions differ from SMS-DELIVER; bits 4..3 select the validity period format

use super::address::PduAddr;
use super::validity::{ValidityPeriod, ValidityPeriodFormat};
use super::{PduType, read_user_data};
use crate::codec::{BinaryReader, CodecError};

const RD: u8 = 0x04;
const VPF_SHIFT: u8 = 3;
const VPF_MASK: u8 = 0x03;
const SRR: u8 = 0x20;
const UDHI: u8 = 0x40;
const RP: u8 = 0x80;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PduSubmit {
    /// Destination address
    pub dst: PduAddr,
    pub vp: ValidityPeriod,
    /// TP-User-Data-Header-Indicator
    pub udhi: bool,
    /// TP-Reject-Duplicates
    pub rd: bool,
    /// TP-Reply-Path
    pub rp: bool,
    /// TP-Status-Report-Request
    pub srr: bool,
    /// TP-Message-Reference
    pub mr: u8,
    pub pid: u8,
    pub dcs: u8,
    pub udl: u8,
    pub data: Vec<u8>,
}

impl PduSubmit {
    pub fn decode(reader: &mut BinaryReader<'_>, flags: u8) -> Result<Self, CodecError> {
        let vpf = ValidityPeriodFormat::try_from((flags >> VPF_SHIFT) & VPF_MASK)
            .unwrap_or_default();

        let mr = reader.read_byte()?;
        let dst = PduAddr::decode(reader, false)?;
        let pid = reader.read_byte()?;
        let dcs = reader.read_byte()?;
        let vp = ValidityPeriod::decode(reader, vpf)?;
        let udl = reader.read_byte()?;
        let data = read_user_data(reader, PduType::Submit, udl, dcs)?;

        Ok(Self {
            dst,
            vp,
            udhi: flags & UDHI != 0,
            rd: flags & RD != 0,
            rp: flags & RP != 0,
            srr: flags & SRR != 0,
            mr,
            pid,
            dcs,
            udl,
            data,
        })
    }
}
