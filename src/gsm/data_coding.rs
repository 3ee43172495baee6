// ABOUTME: Data Coding Scheme classification for SMS (GSM 03.38 section 4) and CBS/USSD (section 5)
// ABOUTME: Maps the raw DCS byte to an alphabet, compression flag, message class and language

use num_enum::TryFromPrimitive;
use std::fmt;

/// Alphabet selected by a DCS byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GsmEncoding {
    /// GSM 7-bit default alphabet, septet packed
    Gsm7,
    /// 8-bit data
    Eight,
    /// UCS-2, big-endian
    Ucs2,
}

impl fmt::Display for GsmEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            GsmEncoding::Gsm7 => "GSM 7-bit",
            GsmEncoding::Eight => "8-bit",
            GsmEncoding::Ucs2 => "UCS-2",
        };
        write!(f, "{name}")
    }
}

/// SMS message class carried by general and group 15 coding schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageClass {
    /// Class 0, displayed immediately (flash)
    Flash = 0,
    /// Class 1, mobile equipment specific
    MobileEquipment = 1,
    /// Class 2, SIM specific
    SimSpecific = 2,
    /// Class 3, terminal equipment specific
    TerminalEquipment = 3,
}

/// CBS/USSD language, as announced by the coding scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive)]
#[repr(u16)]
pub enum GsmLanguage {
    German = 0x00,
    English = 0x01,
    Italian = 0x02,
    French = 0x03,
    Spanish = 0x04,
    Dutch = 0x05,
    Swedish = 0x06,
    Danish = 0x07,
    Portuguese = 0x08,
    Finnish = 0x09,
    Norwegian = 0x0A,
    Greek = 0x0B,
    Turkish = 0x0C,
    Hungarian = 0x0D,
    Polish = 0x0E,
    #[default]
    Unspecified = 0x0F,
    Czech = 0x100,
    Hebrew = 0x101,
    Arabic = 0x102,
    Russian = 0x103,
    Icelandic = 0x104,
}

impl GsmLanguage {
    /// Languages outside the enumerated set collapse to `Unspecified`
    pub fn from_code(code: u16) -> Self {
        GsmLanguage::try_from(code).unwrap_or(GsmLanguage::Unspecified)
    }
}

/// Result of classifying a CBS/USSD coding scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbsDcs {
    pub encoding: GsmEncoding,
    pub language: GsmLanguage,
    pub compressed: bool,
    /// Text is prefixed by an ISO-639 language code
    pub has_iso_lang: bool,
}

/// Result of classifying an SMS coding scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmsDcs {
    pub encoding: GsmEncoding,
    pub compressed: bool,
    pub class: Option<MessageClass>,
}

/// Classify an SMS (TP-DCS) coding scheme.
///
/// Returns `None` for the reserved groups (0x80..=0xBF) and for the reserved
/// alphabet value in the general data coding groups.
pub fn decode_sms_dcs(dcs: u8) -> Option<SmsDcs> {
    let group = dcs >> 4;

    match group {
        // General data coding, optionally compressed and carrying a class
        0x0..=0x7 => {
            let encoding = match (dcs >> 2) & 0x03 {
                0 => GsmEncoding::Gsm7,
                1 => GsmEncoding::Eight,
                2 => GsmEncoding::Ucs2,
                _ => return None,
            };
            let class = if dcs & 0x10 != 0 {
                MessageClass::try_from(dcs & 0x03).ok()
            } else {
                None
            };
            Some(SmsDcs {
                encoding,
                compressed: dcs & 0x20 != 0,
                class,
            })
        }
        // Message waiting indication, discard or store
        0xC | 0xD => Some(SmsDcs {
            encoding: GsmEncoding::Gsm7,
            compressed: false,
            class: None,
        }),
        // Message waiting indication, store, UCS-2
        0xE => Some(SmsDcs {
            encoding: GsmEncoding::Ucs2,
            compressed: false,
            class: None,
        }),
        // Data coding / message class
        0xF => Some(SmsDcs {
            encoding: if dcs & 0x04 != 0 {
                GsmEncoding::Eight
            } else {
                GsmEncoding::Gsm7
            },
            compressed: false,
            class: MessageClass::try_from(dcs & 0x03).ok(),
        }),
        _ => None,
    }
}

/// Number of user data bytes described by a TP-UDL value.
///
/// Uncompressed 7-bit text counts septets, everything else counts octets.
/// Unknown coding schemes yield 0.
pub fn udl_to_bytes(udl: u8, dcs: u8) -> usize {
    match decode_sms_dcs(dcs) {
        Some(SmsDcs {
            encoding: GsmEncoding::Gsm7,
            compressed: false,
            ..
        }) => (udl as usize * 7).div_ceil(8),
        Some(_) => udl as usize,
        None => 0,
    }
}

/// Classify a CBS/USSD coding scheme.
pub fn decode_cbs_dcs(dcs: u8) -> Option<CbsDcs> {
    let group = dcs >> 4;
    let value = dcs & 0x0F;

    let mut out = CbsDcs {
        encoding: GsmEncoding::Gsm7,
        language: GsmLanguage::Unspecified,
        compressed: false,
        has_iso_lang: false,
    };

    match group {
        0x0 => out.language = GsmLanguage::from_code(value as u16),
        0x1 => {
            if value != 0 {
                out.encoding = GsmEncoding::Ucs2;
            }
            out.has_iso_lang = true;
        }
        0x2 => out.language = GsmLanguage::from_code(0x100 | value as u16),
        0x3 => out.language = GsmLanguage::from_code(0x110 | value as u16),
        0x4..=0x7 => {
            out.compressed = dcs & 0x20 != 0;
            out.encoding = match (value & 0x0C) >> 2 {
                0 => GsmEncoding::Gsm7,
                1 => GsmEncoding::Eight,
                2 => GsmEncoding::Ucs2,
                _ => return None,
            };
        }
        0xF => {
            if dcs & 0x04 != 0 {
                out.encoding = GsmEncoding::Eight;
            }
        }
        _ => return None,
    }

    Some(out)
}
