pub mod at;
pub mod codec;
pub mod gsm;
pub mod hex;
pub mod pdu;
pub mod scheduler;
pub mod sms;
pub mod transport;

#[cfg(test)]
mod tests;

// Re-export the types most callers need
pub use at::{AtChannel, AtError, AtParser, AtResult, ChannelConfig, Response, ResultCode, ResultKind};
pub use codec::{BinaryReader, CodecError};
pub use pdu::{Pdu, PduType};
pub use scheduler::{Scheduler, TimerId};
pub use sms::{RawSms, Sms, SmsAssembler, assemble_listing};
pub use transport::{ReadStatus, SerialConfig, SerialTransport, Transport};

/// Error returned by most top-level helpers and the demos.
///
/// Library functions return their specific error types ([`AtError`],
/// [`CodecError`], `std::io::Error`); this boxed form lets application code
/// mix them with `?`.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for application code built on this crate.
///
/// # Examples
///
/// ## Querying signal quality
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use usbmodem::{AtChannel, AtParser, ChannelConfig, SerialConfig, SerialTransport};
///
/// fn main() -> usbmodem::Result<()> {
///     let transport = SerialTransport::open(&SerialConfig::new("/dev/ttyUSB2"))?;
///     let channel = AtChannel::new(Arc::new(transport), ChannelConfig::default());
///     channel.start()?;
///
///     let response = channel.send_command("AT+CSQ", "+CSQ").into_result()?;
///
///     let mut rssi = 0;
///     let mut ber = 0;
///     AtParser::new(response.data())
///         .parse_int(&mut rssi)
///         .parse_int(&mut ber)
///         .finish()?;
///
///     println!("rssi={rssi} ber={ber}");
///     Ok(())
/// }
/// ```
///
/// ## Reading stored SMS
///
/// Parts of concatenated messages are joined; broken PDUs come back as
/// placeholder messages marked `invalid`.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use usbmodem::{AtChannel, ChannelConfig, SerialConfig, SerialTransport, assemble_listing};
///
/// fn main() -> usbmodem::Result<()> {
///     let transport = SerialTransport::open(&SerialConfig::new("/dev/ttyUSB2"))?;
///     let channel = AtChannel::new(Arc::new(transport), ChannelConfig::default());
///     channel.start()?;
///
///     channel.send_command_no_response("AT+CMGF=0");
///     let response = channel.send_command_multiline("AT+CMGL=4", "+CMGL").into_result()?;
///
///     for sms in assemble_listing(&response.lines) {
///         println!("{} {}: {}", sms.time, sms.addr, sms.text());
///     }
///     Ok(())
/// }
/// ```
///
/// ## Reacting to unsolicited codes
///
/// Handlers run on the reader thread. Work that needs the channel is handed
/// to a [`Scheduler`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use usbmodem::{AtChannel, ChannelConfig, Scheduler, SerialConfig, SerialTransport};
///
/// fn main() -> usbmodem::Result<()> {
///     let transport = SerialTransport::open(&SerialConfig::new("/dev/ttyUSB2"))?;
///     let channel = Arc::new(AtChannel::new(Arc::new(transport), ChannelConfig::default()));
///     let scheduler = Arc::new(Scheduler::new()?);
///
///     let weak = Arc::downgrade(&channel);
///     let timers = scheduler.clone();
///     channel.on_unsolicited("+CREG", move |_| {
///         let weak = weak.clone();
///         timers.set_timeout(Duration::from_millis(100), move || {
///             if let Some(channel) = weak.upgrade() {
///                 channel.send_command("AT+COPS?", "+COPS");
///             }
///         });
///     });
///
///     channel.start()?;
///     std::thread::sleep(Duration::from_secs(60));
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
