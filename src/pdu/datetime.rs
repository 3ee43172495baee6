// ABOUTME: Service-centre timestamp (TP-SCTS) and absolute validity period decoding
// ABOUTME: Seven swapped-BCD octets, the last one holding a signed quarter-hour timezone

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::codec::{BinaryReader, CodecError};

/// Timezone range allowed by the field, in quarter hours (-12h..+14h)
const TZ_MIN_QUARTERS: i32 = -48;
const TZ_MAX_QUARTERS: i32 = 56;

/// A decoded timestamp: a true UTC instant plus the sender's offset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PduDateTime {
    /// Seconds since the Unix epoch, UTC
    pub timestamp: i64,
    /// Offset east of UTC, in seconds
    pub tz: i32,
}

impl PduDateTime {
    pub fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        let raw: [u8; 7] = reader.read_array()?;

        let year = swapped_bcd("year", raw[0])?;
        let month = swapped_bcd("month", raw[1])?;
        let day = swapped_bcd("day", raw[2])?;
        let hour = swapped_bcd("hour", raw[3])?;
        let minute = swapped_bcd("minute", raw[4])?;
        let second = swapped_bcd("second", raw[5])?;

        let year = if year > 80 { 1900 + year } else { 2000 + year };

        let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or(
            CodecError::InvalidTimestamp {
                field: "date",
                value: raw[2],
            },
        )?;
        let local = date
            .and_hms_opt(hour, minute, second)
            .ok_or(CodecError::InvalidTimestamp {
                field: "time",
                value: raw[3],
            })?;

        let tz = decode_timezone(raw[6])?;

        Ok(Self {
            timestamp: local.and_utc().timestamp() - tz as i64,
            tz,
        })
    }

    /// The instant in the sender's own offset
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.tz)?;
        DateTime::from_timestamp(self.timestamp, 0).map(|utc| utc.with_timezone(&offset))
    }
}

fn swapped_bcd(field: &'static str, value: u8) -> Result<u32, CodecError> {
    let lo = value & 0x0F;
    let hi = value >> 4;
    if lo > 9 || hi > 9 {
        return Err(CodecError::InvalidTimestamp { field, value });
    }
    Ok(lo as u32 * 10 + hi as u32)
}

/// Timezone octet: swapped BCD quarter hours with the sign in bit 3
fn decode_timezone(value: u8) -> Result<i32, CodecError> {
    let tens = value & 0x07;
    let units = value >> 4;
    if units > 9 {
        return Err(CodecError::InvalidTimestamp {
            field: "timezone",
            value,
        });
    }

    let mut quarters = tens as i32 * 10 + units as i32;
    if value & 0x08 != 0 {
        quarters = -quarters;
    }

    if !(TZ_MIN_QUARTERS..=TZ_MAX_QUARTERS).contains(&quarters) {
        return Err(CodecError::InvalidTimezone { quarters });
    }

    Ok(quarters * 15 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::decode_hex;

    fn decode(hex: &str) -> Result<PduDateTime, CodecError> {
        let data = decode_hex(hex).unwrap();
        let mut reader = BinaryReader::new(&data);
        PduDateTime::decode(&mut reader)
    }

    #[test]
    fn positive_offset() {
        // 1999-03-29 15:16:59 +02:00
        let dt = decode("99309251619580").unwrap();
        assert_eq!(dt.timestamp, 922713419);
        assert_eq!(dt.tz, 7200);

        let local = dt.to_datetime().unwrap();
        assert_eq!(local.to_rfc3339(), "1999-03-29T15:16:59+02:00");
    }

    #[test]
    fn negative_offset() {
        // 2005-12-31 23:59:59 -05:00
        let dt = decode("5021133295950A").unwrap();
        assert_eq!(dt.timestamp, 1136091599);
        assert_eq!(dt.tz, -18000);
    }

    #[test]
    fn year_pivot() {
        let y80 = decode("08101000000000").unwrap();
        assert_eq!(y80.to_datetime().unwrap().to_rfc3339(), "2080-01-01T00:00:00+00:00");

        let y81 = decode("18101000000000").unwrap();
        assert_eq!(y81.to_datetime().unwrap().to_rfc3339(), "1981-01-01T00:00:00+00:00");
    }

    #[test]
    fn rejects_out_of_range_fields() {
        // Month 13
        assert!(matches!(
            decode("02310100000000"),
            Err(CodecError::InvalidTimestamp { .. })
        ));
        // Non-decimal nibble
        assert!(matches!(
            decode("0A100100000000"),
            Err(CodecError::InvalidTimestamp { field: "year", .. })
        ));
        // Hour 25
        assert!(matches!(
            decode("02101052000000"),
            Err(CodecError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn timezone_limits() {
        // +14:00 is 56 quarters
        assert_eq!(decode("02101000000065").unwrap().tz, 14 * 3600);
        // +14:15 is out of range
        assert_eq!(
            decode("02101000000075"),
            Err(CodecError::InvalidTimezone { quarters: 57 })
        );
        // -12:00 is 48 quarters
        assert_eq!(decode("0210100000008C").unwrap().tz, -12 * 3600);
        assert_eq!(
            decode("0210100000009C"),
            Err(CodecError::InvalidTimezone { quarters: -49 })
        );
    }

    #[test]
    fn short_input() {
        assert!(matches!(
            decode("993092516195"),
            Err(CodecError::Incomplete { .. })
        ));
    }
}
