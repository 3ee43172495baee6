// ABOUTME: GSM 03.38 alphabets and coding schemes used by SMS, USSD and cell broadcast payloads
// ABOUTME: Re-exports the charset tables, DCS classification and text converters

pub mod charset;
pub mod data_coding;
pub mod text;

pub use charset::{convert_gsm_to_utf8, convert_utf8_to_gsm, is_gsm_compatible};
pub use data_coding::{
    CbsDcs, GsmEncoding, GsmLanguage, MessageClass, SmsDcs, decode_cbs_dcs, decode_sms_dcs,
    udl_to_bytes,
};
pub use text::{
    append_codepoint, convert_latin1_to_utf8, convert_ucs2_to_utf8, decode_bcd, decode_cbs_text,
    is_valid_ussd, max_septets, pack_7bit, unpack_7bit,
};
