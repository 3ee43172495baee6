// ABOUTME: TP-Validity-Period of SMS-SUBMIT, tagged by the two-bit TP-VPF field

use num_enum::TryFromPrimitive;

use super::datetime::PduDateTime;
use crate::codec::{BinaryReader, CodecError};

#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ValidityPeriodFormat {
    #[default]
    Absent = 0,
    Enhanced = 1,
    Relative = 2,
    Absolute = 3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidityPeriod {
    #[default]
    Absent,
    /// Opaque relative-time code
    Relative(u8),
    /// Opaque enhanced format octets
    Enhanced([u8; 7]),
    Absolute(PduDateTime),
}

impl ValidityPeriod {
    pub fn decode(
        reader: &mut BinaryReader<'_>,
        format: ValidityPeriodFormat,
    ) -> Result<Self, CodecError> {
        Ok(match format {
            ValidityPeriodFormat::Absent => ValidityPeriod::Absent,
            ValidityPeriodFormat::Relative => ValidityPeriod::Relative(reader.read_byte()?),
            ValidityPeriodFormat::Enhanced => ValidityPeriod::Enhanced(reader.read_array()?),
            ValidityPeriodFormat::Absolute => ValidityPeriod::Absolute(PduDateTime::decode(reader)?),
        })
    }

    pub fn format(&self) -> ValidityPeriodFormat {
        match self {
            ValidityPeriod::Absent => ValidityPeriodFormat::Absent,
            ValidityPeriod::Relative(_) => ValidityPeriodFormat::Relative,
            ValidityPeriod::Enhanced(_) => ValidityPeriodFormat::Enhanced,
            ValidityPeriod::Absolute(_) => ValidityPeriodFormat::Absolute,
        }
    }
}
