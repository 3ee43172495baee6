// ABOUTME: User Data Header parsing (GSM 03.40 section 9.2.3.24) for concatenation and port addressing
// ABOUTME: Unknown information elements are skipped by their declared length

use crate::codec::{BinaryReader, CodecError};

const IE_CONCAT_8BIT: u8 = 0x00;
const IE_PORT_8BIT: u8 = 0x04;
const IE_PORT_16BIT: u8 = 0x05;
const IE_CONCAT_16BIT: u8 = 0x08;

/// Concatenated short message reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Concatenated {
    pub ref_id: u16,
    pub parts: u16,
    pub part: u16,
}

impl Concatenated {
    pub fn is_valid(&self) -> bool {
        self.part >= 1 && self.part <= self.parts
    }

    /// An out-of-range part index degrades to a standalone single part
    pub fn normalized(self) -> Self {
        if self.is_valid() {
            self
        } else {
            Concatenated {
                ref_id: 0,
                parts: 1,
                part: 1,
            }
        }
    }
}

/// Application port addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppPort {
    pub dst: u16,
    pub src: u16,
    /// 16-bit port numbers (element 0x05) rather than 8-bit (0x04)
    pub wide: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDataHeader {
    pub concatenated: Option<Concatenated>,
    pub app_port: Option<AppPort>,
}

impl UserDataHeader {
    /// Decode the header at the start of `data`.
    ///
    /// Returns the header and the number of octets it occupies, including the
    /// length octet itself.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), CodecError> {
        let mut reader = BinaryReader::new(data);
        let udhl = reader
            .read_byte()
            .map_err(|_| CodecError::InvalidUserDataHeader("missing header length"))?
            as usize;

        reader
            .truncate(udhl + 1)
            .map_err(|_| CodecError::InvalidUserDataHeader("header longer than user data"))?;

        let mut header = UserDataHeader::default();

        while !reader.eof() {
            let [id, len] = reader
                .read_array::<2>()
                .map_err(|_| CodecError::InvalidUserDataHeader("truncated element"))?;
            let payload = reader
                .read_bytes(len as usize)
                .map_err(|_| CodecError::InvalidUserDataHeader("element overruns header"))?;

            match (id, payload) {
                (IE_CONCAT_8BIT, &[ref_id, parts, part]) => {
                    header.concatenated = Some(Concatenated {
                        ref_id: ref_id as u16,
                        parts: parts as u16,
                        part: part as u16,
                    });
                }
                (IE_CONCAT_16BIT, &[ref_hi, ref_lo, parts, part]) => {
                    header.concatenated = Some(Concatenated {
                        ref_id: u16::from_be_bytes([ref_hi, ref_lo]),
                        parts: parts as u16,
                        part: part as u16,
                    });
                }
                (IE_PORT_8BIT, &[dst, src]) => {
                    header.app_port = Some(AppPort {
                        dst: dst as u16,
                        src: src as u16,
                        wide: false,
                    });
                }
                (IE_PORT_16BIT, &[dst_hi, dst_lo, src_hi, src_lo]) => {
                    header.app_port = Some(AppPort {
                        dst: u16::from_be_bytes([dst_hi, dst_lo]),
                        src: u16::from_be_bytes([src_hi, src_lo]),
                        wide: true,
                    });
                }
                _ => {}
            }
        }

        Ok((header, udhl + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_8bit() {
        let data = [0x05, 0x00, 0x03, 0x2A, 0x02, 0x01, 0xFF];
        let (udh, consumed) = UserDataHeader::decode(&data).unwrap();
        assert_eq!(consumed, 6);
        assert_eq!(
            udh.concatenated,
            Some(Concatenated {
                ref_id: 0x2A,
                parts: 2,
                part: 1
            })
        );
        assert_eq!(udh.app_port, None);
    }

    #[test]
    fn concat_16bit_and_ports() {
        let data = [
            0x0C, 0x08, 0x04, 0x12, 0x34, 0x03, 0x02, 0x05, 0x04, 0x0B, 0x84, 0x23, 0xF0,
        ];
        let (udh, consumed) = UserDataHeader::decode(&data).unwrap();
        assert_eq!(consumed, 13);
        assert_eq!(
            udh.concatenated,
            Some(Concatenated {
                ref_id: 0x1234,
                parts: 3,
                part: 2
            })
        );
        assert_eq!(
            udh.app_port,
            Some(AppPort {
                dst: 2948,
                src: 9200,
                wide: true
            })
        );
    }

    #[test]
    fn unknown_elements_are_skipped() {
        // 0x24 (national language) then an 8-bit port pair
        let data = [0x07, 0x24, 0x01, 0x01, 0x04, 0x02, 0x10, 0x20];
        let (udh, consumed) = UserDataHeader::decode(&data).unwrap();
        assert_eq!(consumed, 8);
        assert_eq!(udh.concatenated, None);
        assert_eq!(
            udh.app_port,
            Some(AppPort {
                dst: 0x10,
                src: 0x20,
                wide: false
            })
        );
    }

    #[test]
    fn wrong_length_known_element_is_skipped() {
        let data = [0x04, 0x00, 0x02, 0x01, 0x02];
        let (udh, _) = UserDataHeader::decode(&data).unwrap();
        assert_eq!(udh.concatenated, None);
    }

    #[test]
    fn malformed_headers() {
        assert!(UserDataHeader::decode(&[]).is_err());
        // Declared longer than the data
        assert!(UserDataHeader::decode(&[0x05, 0x00, 0x03]).is_err());
        // Element payload runs past the header
        assert!(UserDataHeader::decode(&[0x03, 0x00, 0x03, 0x2A, 0x02, 0x01]).is_err());
        // Dangling element id
        assert!(UserDataHeader::decode(&[0x01, 0x00]).is_err());
    }

    #[test]
    fn out_of_range_part_normalizes() {
        let bad = Concatenated {
            ref_id: 7,
            parts: 2,
            part: 3,
        };
        assert!(!bad.is_valid());
        assert_eq!(
            bad.normalized(),
            Concatenated {
                ref_id: 0,
                parts: 1,
                part: 1
            }
        );

        let zero = Concatenated {
            ref_id: 7,
            parts: 2,
            part: 0,
        };
        assert_eq!(zero.normalized().parts, 1);

        let good = Concatenated {
            ref_id: 7,
            parts: 2,
            part: 2,
        };
        assert_eq!(good.normalized(), good);
    }
}
