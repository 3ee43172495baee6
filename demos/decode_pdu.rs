// ABOUTME: Demo that decodes hex SMS PDUs or USSD payloads given on the command line
// ABOUTME: Prints the decoded header fields, timestamps and text

use argh::FromArgs;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use usbmodem::gsm::decode_cbs_text;
use usbmodem::hex::decode_hex;
use usbmodem::pdu::{Pdu, PduBody};

/// Decode SMS PDUs as stored by the modem (AT+CMGL / AT+CMGR in PDU mode)
#[derive(FromArgs)]
struct CliArgs {
    /// treat the PDUs as SMS-SUBMIT (messages travelling to the SMSC)
    #[argh(switch, short = 'o')]
    outgoing: bool,

    /// decode the arguments as +CUSD payloads with this data coding scheme instead
    #[argh(option, short = 'u')]
    ussd_dcs: Option<u8>,

    /// hex strings to decode
    #[argh(positional)]
    pdus: Vec<String>,
}

fn print_pdu(pdu: &Pdu) {
    println!("type:  {:?}", pdu.pdu_type());
    if !pdu.smsc.is_empty() {
        println!("smsc:  {}", pdu.smsc);
    }

    match &pdu.body {
        PduBody::Deliver(deliver) => {
            println!("from:  {}", deliver.src);
            match deliver.dt.to_datetime() {
                Some(dt) => println!("time:  {}", dt.to_rfc3339()),
                None => println!("time:  {} (tz {})", deliver.dt.timestamp, deliver.dt.tz),
            }
        }
        PduBody::Submit(submit) => {
            println!("to:    {}", submit.dst);
            println!("mr:    {}", submit.mr);
            println!("vp:    {:?}", submit.vp);
        }
    }
    println!("dcs:   0x{:02X}", pdu.dcs());

    match pdu.user_data() {
        Ok(user_data) => {
            if let Some(concat) = user_data.header.concatenated {
                println!("part:  {}/{} ref {}", concat.part, concat.parts, concat.ref_id);
            }
            if let Some(port) = user_data.header.app_port {
                println!("port:  {} -> {}", port.src, port.dst);
            }
            println!("text:  {}", user_data.text);
        }
        Err(e) => println!("text:  <{e}>"),
    }
}

fn main() -> usbmodem::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder().with_max_level(Level::WARN).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    for hex in &cli_args.pdus {
        let bytes = decode_hex(hex)?;

        if let Some(dcs) = cli_args.ussd_dcs {
            match decode_cbs_text(&bytes, dcs) {
                Ok(text) => println!("{text}"),
                Err(e) => eprintln!("Can't decode USSD {hex} [dcs={dcs}]: {e}"),
            }
            continue;
        }

        match Pdu::decode(&bytes, cli_args.outgoing) {
            Ok(pdu) => print_pdu(&pdu),
            Err(e) => eprintln!("Invalid PDU {hex}: {e}"),
        }
        println!();
    }

    Ok(())
}
