// ABOUTME: Turns an AT+CMGL PDU-mode listing into whole messages, joining concatenated parts
// ABOUTME: Undecodable entries are kept as readable placeholders instead of being dropped

use std::collections::HashMap;

use num_enum::TryFromPrimitive;
use tracing::warn;

use crate::at::AtParser;
use crate::codec::CodecError;
use crate::hex::{decode_hex, encode_hex};
use crate::pdu::{Pdu, PduAddr, PduBody, PduType};

/// `<stat>` of a stored message
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SmsStat {
    Unread = 0,
    Read = 1,
    Unsent = 2,
    Sent = 3,
}

impl SmsStat {
    pub fn from_code(code: i32) -> Result<Self, CodecError> {
        u8::try_from(code)
            .ok()
            .and_then(|code| SmsStat::try_from(code).ok())
            .ok_or(CodecError::InvalidStat(code))
    }

    /// Stored messages written by us travel towards the SMSC
    pub fn is_outgoing(self) -> bool {
        matches!(self, SmsStat::Unsent | SmsStat::Sent)
    }
}

/// One `+CMGL` entry with its PDU decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub index: i32,
    pub stat: SmsStat,
    pub pdu: Pdu,
}

/// Parse `+CMGL: <index>,<stat>,[<alpha>],<length>\r\n<pdu>`.
///
/// Only SMS-DELIVER and SMS-SUBMIT PDUs are accepted.
pub fn parse_listing_entry(line: &str) -> Result<ListingEntry, CodecError> {
    let mut index = 0;
    let mut stat = 0;
    let mut hex = String::new();

    let ok = AtParser::new(line)
        .parse_int(&mut index)
        .parse_int(&mut stat)
        .parse_skip()
        .parse_skip()
        .parse_new_line()
        .parse_string(&mut hex)
        .success();
    if !ok {
        return Err(CodecError::MalformedListing(line.to_string()));
    }

    let stat = SmsStat::from_code(stat)?;
    let bytes = decode_hex(&hex)?;
    let pdu = Pdu::decode(&bytes, stat.is_outgoing())?;

    Ok(ListingEntry { index, stat, pdu })
}

/// A single stored PDU rendered as text, before concatenated parts are joined
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSms {
    /// Storage index, when it could be read
    pub index: Option<i32>,
    pub stat: Option<SmsStat>,
    /// `Unknown` for undecodable entries
    pub pdu_type: PduType,
    pub smsc: PduAddr,
    /// Sender for DELIVER, recipient for SUBMIT
    pub addr: PduAddr,
    /// SMSC timestamp in UTC seconds; 0 for SUBMIT
    pub time: i64,
    pub ref_id: u16,
    pub parts: u16,
    /// 1-based
    pub part: u16,
    pub text: String,
    pub invalid: bool,
}

impl RawSms {
    /// Decode one listing entry. Never fails: a broken entry comes back
    /// marked `invalid` with the entry itself as text.
    pub fn from_entry(line: &str) -> Self {
        match Self::decode(line) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Invalid PDU in SMS ({e}): '{line}'");

                let mut parser = AtParser::new(line);
                let index = parser.next_int();
                let stat = parser
                    .next_int()
                    .and_then(|code| SmsStat::from_code(code).ok());

                RawSms {
                    index,
                    stat,
                    parts: 1,
                    part: 1,
                    text: format!("Invalid PDU:\n{line}"),
                    invalid: true,
                    ..RawSms::default()
                }
            }
        }
    }

    fn decode(line: &str) -> Result<Self, CodecError> {
        let entry = parse_listing_entry(line)?;
        let user_data = entry.pdu.user_data()?;
        let header = user_data.header;

        let concatenated = header.concatenated.map(|concat| {
            if !concat.is_valid() {
                warn!(
                    "Invalid SMS part id: {} / {}, in: '{line}'",
                    concat.part, concat.parts
                );
            }
            concat.normalized()
        });

        let (text, invalid) = match header.app_port {
            Some(port) => (
                format!(
                    "Wireless Datagram Protocol\nSrc port: {}\nDst port: {}\nData: {}\n",
                    port.src,
                    port.dst,
                    encode_hex(&user_data.payload, false)
                ),
                true,
            ),
            None => (user_data.text, false),
        };

        let time = match &entry.pdu.body {
            PduBody::Deliver(deliver) => deliver.dt.timestamp,
            PduBody::Submit(_) => 0,
        };

        Ok(RawSms {
            index: Some(entry.index),
            stat: Some(entry.stat),
            pdu_type: entry.pdu.pdu_type(),
            smsc: entry.pdu.smsc.clone(),
            addr: entry.pdu.addr().clone(),
            time,
            ref_id: concatenated.map_or(0, |c| c.ref_id),
            parts: concatenated.map_or(1, |c| c.parts),
            part: concatenated.map_or(1, |c| c.part),
            text,
            invalid,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmsPart {
    /// Storage index of the PDU carrying this part; `None` until it arrives
    pub index: Option<i32>,
    pub text: String,
}

/// A message with all of its received parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sms {
    pub pdu_type: PduType,
    /// Service centre number, `+` prefixed when international
    pub smsc: String,
    /// Peer number, `+` prefixed when international
    pub addr: String,
    pub time: i64,
    pub stat: Option<SmsStat>,
    /// Any part is still unread
    pub unread: bool,
    /// Any part failed to decode or carries port-addressed data
    pub invalid: bool,
    pub ref_id: u16,
    /// Pre-sized to the announced part count, indexed by `part - 1`
    pub parts: Vec<SmsPart>,
}

impl Sms {
    pub fn is_incoming(&self) -> bool {
        self.pdu_type == PduType::Deliver
    }

    /// Every announced part has been received
    pub fn is_complete(&self) -> bool {
        self.parts.iter().all(|part| part.index.is_some())
    }

    /// Part texts joined in order; missing parts are skipped
    pub fn text(&self) -> String {
        self.parts.iter().map(|part| part.text.as_str()).collect()
    }

    /// Storage indexes of all received parts, e.g. for `AT+CMGD`
    pub fn indexes(&self) -> Vec<i32> {
        self.parts.iter().filter_map(|part| part.index).collect()
    }

    fn from_raw(raw: &RawSms) -> Self {
        Sms {
            pdu_type: raw.pdu_type,
            smsc: raw.smsc.to_string(),
            addr: raw.addr.to_string(),
            time: raw.time,
            stat: raw.stat,
            unread: false,
            invalid: false,
            ref_id: raw.ref_id,
            parts: vec![SmsPart::default(); raw.parts.max(1) as usize],
        }
    }

    fn fill(&mut self, raw: RawSms) {
        self.unread |= raw.stat == Some(SmsStat::Unread);
        self.invalid |= raw.invalid;
        if let Some(slot) = self.parts.get_mut(raw.part.saturating_sub(1) as usize) {
            slot.index = raw.index;
            slot.text = raw.text;
        }
    }
}

/// `{pdu type, smsc number, peer number, reference, total parts}`
type SmsKey = (PduType, String, String, u16, u16);

/// Joins [`RawSms`] parts into [`Sms`] messages, keeping first-seen order
#[derive(Debug, Default)]
pub struct SmsAssembler {
    messages: Vec<Sms>,
    open: HashMap<SmsKey, Vec<usize>>,
}

impl SmsAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, raw: RawSms) {
        if raw.parts < 2 {
            let mut sms = Sms::from_raw(&raw);
            sms.fill(raw);
            self.messages.push(sms);
            return;
        }

        let key: SmsKey = (
            raw.pdu_type,
            raw.smsc.number.clone(),
            raw.addr.number.clone(),
            raw.ref_id,
            raw.parts,
        );
        let slot = raw.part.saturating_sub(1) as usize;

        // Oldest message still missing this part, else a new one
        let candidates = self.open.entry(key).or_default();
        let existing = candidates.iter().copied().find(|&i| {
            self.messages[i]
                .parts
                .get(slot)
                .is_some_and(|part| part.index.is_none())
        });

        let i = match existing {
            Some(i) => i,
            None => {
                self.messages.push(Sms::from_raw(&raw));
                let i = self.messages.len() - 1;
                candidates.push(i);
                i
            }
        };
        self.messages[i].fill(raw);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Sms> {
        self.messages
    }
}

/// Decode and join every entry of a multiline `AT+CMGL` response
pub fn assemble_listing<I, S>(lines: I) -> Vec<Sms>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut assembler = SmsAssembler::new();
    for line in lines {
        assembler.push(RawSms::from_entry(line.as_ref()));
    }
    assembler.into_messages()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART_1: &str = "004404812143000002102030405000090500032A02019069";
    const PART_2: &str = "004404812143000002102030405000090500032A0202B26F";
    const SINGLE: &str = "07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37";
    const SUBMIT: &str = "0011000A9121436587090000AA05E8329BFD06";

    fn entry(index: i32, stat: i32, pdu: &str) -> String {
        format!("+CMGL: {index},{stat},,{}\r\n{pdu}", pdu.len() / 2)
    }

    #[test]
    fn stat_codes() {
        assert_eq!(SmsStat::from_code(0), Ok(SmsStat::Unread));
        assert_eq!(SmsStat::from_code(3), Ok(SmsStat::Sent));
        assert_eq!(SmsStat::from_code(4), Err(CodecError::InvalidStat(4)));
        assert_eq!(SmsStat::from_code(-1), Err(CodecError::InvalidStat(-1)));
        assert!(SmsStat::Unsent.is_outgoing());
        assert!(!SmsStat::Read.is_outgoing());
    }

    #[test]
    fn listing_entry_deliver() {
        let parsed = parse_listing_entry(&entry(7, 1, SINGLE)).unwrap();
        assert_eq!(parsed.index, 7);
        assert_eq!(parsed.stat, SmsStat::Read);
        assert_eq!(parsed.pdu.pdu_type(), PduType::Deliver);
    }

    #[test]
    fn listing_entry_with_alpha() {
        let line = format!("+CMGL: 2,3,\"Mom\",19\r\n{SUBMIT}");
        let parsed = parse_listing_entry(&line).unwrap();
        assert_eq!(parsed.stat, SmsStat::Sent);
        assert_eq!(parsed.pdu.pdu_type(), PduType::Submit);
    }

    #[test]
    fn listing_entry_errors() {
        assert!(matches!(
            parse_listing_entry("+CMGL: 1,1,,24"),
            Err(CodecError::MalformedListing(_))
        ));
        assert_eq!(
            parse_listing_entry(&entry(1, 9, SINGLE)),
            Err(CodecError::InvalidStat(9))
        );
        assert!(matches!(
            parse_listing_entry(&entry(1, 1, "0G")),
            Err(CodecError::InvalidHex(_))
        ));
        // A SUBMIT stored as received is read as SUBMIT-REPORT
        assert_eq!(
            parse_listing_entry(&entry(1, 1, SUBMIT)),
            Err(CodecError::UnsupportedPduType(PduType::SubmitReport))
        );
    }

    #[test]
    fn raw_deliver() {
        let raw = RawSms::from_entry(&entry(4, 0, SINGLE));
        assert_eq!(raw.index, Some(4));
        assert_eq!(raw.stat, Some(SmsStat::Unread));
        assert_eq!(raw.addr.number, "27838890001");
        assert_eq!(raw.time, 922713419);
        assert_eq!((raw.ref_id, raw.parts, raw.part), (0, 1, 1));
        assert_eq!(raw.text, "hellohello");
        assert!(!raw.invalid);
    }

    #[test]
    fn raw_submit_has_no_time() {
        let raw = RawSms::from_entry(&entry(5, 2, SUBMIT));
        assert_eq!(raw.pdu_type, PduType::Submit);
        assert_eq!(raw.addr.to_string(), "+1234567890");
        assert_eq!(raw.time, 0);
        assert_eq!(raw.text, "hello");
    }

    #[test]
    fn raw_invalid_keeps_line() {
        let line = entry(9, 1, "0011");
        let raw = RawSms::from_entry(&line);
        assert!(raw.invalid);
        assert_eq!(raw.index, Some(9));
        assert_eq!(raw.stat, Some(SmsStat::Read));
        assert_eq!(raw.pdu_type, PduType::Unknown);
        assert_eq!(raw.text, format!("Invalid PDU:\n{line}"));
        assert_eq!((raw.parts, raw.part), (1, 1));
    }

    #[test]
    fn raw_out_of_range_part_is_standalone() {
        let pdu = "004404812143000002102030405000090500032A02039069";
        let raw = RawSms::from_entry(&entry(1, 1, pdu));
        assert_eq!((raw.ref_id, raw.parts, raw.part), (0, 1, 1));
        assert_eq!(raw.text, "Hi");
        assert!(!raw.invalid);
    }

    #[test]
    fn raw_port_addressed_is_dumped() {
        let pdu = "004404812143000402102030405000090605040B8423F00102";
        let raw = RawSms::from_entry(&entry(3, 1, pdu));
        assert!(raw.invalid);
        assert_eq!(
            raw.text,
            "Wireless Datagram Protocol\nSrc port: 9200\nDst port: 2948\nData: 0102\n"
        );
    }

    #[test]
    fn parts_are_joined_in_order() {
        let messages = assemble_listing([entry(11, 1, PART_2), entry(10, 0, PART_1)]);
        assert_eq!(messages.len(), 1);

        let sms = &messages[0];
        assert!(sms.is_incoming());
        assert!(sms.is_complete());
        assert!(sms.unread);
        assert_eq!(sms.addr, "1234");
        assert_eq!(sms.ref_id, 0x2A);
        assert_eq!(sms.text(), "HiYo");
        assert_eq!(sms.indexes(), vec![10, 11]);
    }

    #[test]
    fn missing_part_leaves_gap() {
        let messages = assemble_listing([entry(10, 1, PART_2)]);
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].is_complete());
        assert_eq!(messages[0].parts.len(), 2);
        assert_eq!(messages[0].parts[0], SmsPart::default());
        assert_eq!(messages[0].text(), "Yo");
    }

    #[test]
    fn duplicate_part_starts_new_message() {
        let messages = assemble_listing([
            entry(1, 1, PART_1),
            entry(2, 1, PART_1),
            entry(3, 1, PART_2),
        ]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].indexes(), vec![1, 3]);
        assert_eq!(messages[1].indexes(), vec![2]);
        assert!(!messages[1].is_complete());
    }

    #[test]
    fn duplicates_fill_oldest_gap_first() {
        let messages = assemble_listing([
            entry(1, 1, PART_1),
            entry(2, 1, PART_1),
            entry(3, 1, PART_2),
            entry(4, 1, PART_2),
        ]);
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(Sms::is_complete));
        assert_eq!(messages[0].indexes(), vec![1, 3]);
        assert_eq!(messages[1].indexes(), vec![2, 4]);
        assert_eq!(messages[1].text(), "HiYo");
    }

    #[test]
    fn single_part_messages_never_merge() {
        let messages = assemble_listing([entry(1, 1, SINGLE), entry(2, 1, SINGLE)]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].smsc, "+27381000015");
        assert!(!messages[0].unread);
    }

    #[test]
    fn invalid_entries_survive_assembly() {
        let bad = "+CMGL: 8,0,,3\r\nZZ";
        let messages = assemble_listing([bad]);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].invalid);
        assert!(messages[0].unread);
        assert_eq!(messages[0].text(), format!("Invalid PDU:\n{bad}"));
    }
}
