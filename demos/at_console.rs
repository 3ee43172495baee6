// ABOUTME: Demo that opens a modem's AT port, runs the given commands and prints the replies
// ABOUTME: Optionally keeps listening afterwards and prints every unsolicited result code

use argh::FromArgs;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use usbmodem::{AtChannel, ChannelConfig, ResultKind, SerialConfig, SerialTransport};

/// Send AT commands to a USB modem and print what it answers
#[derive(FromArgs)]
struct CliArgs {
    /// log every line exchanged with the modem
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// serial device of the AT port (default: /dev/ttyUSB2)
    #[argh(option, short = 'p')]
    port: Option<String>,

    /// baud rate (default: 115200)
    #[argh(option, short = 'b')]
    baud: Option<u32>,

    /// per-command timeout in seconds (default: 10)
    #[argh(option, short = 't')]
    timeout: Option<u64>,

    /// keep printing unsolicited codes for this many seconds after the last command
    #[argh(option, short = 'w')]
    watch: Option<u64>,

    /// commands to run, e.g. ATI AT+CSQ
    #[argh(positional)]
    commands: Vec<String>,
}

fn main() -> usbmodem::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut serial = SerialConfig::new(cli_args.port.unwrap_or_else(|| "/dev/ttyUSB2".to_owned()));
    if let Some(baud) = cli_args.baud {
        serial = serial.with_baud_rate(baud);
    }
    let timeout = Duration::from_secs(cli_args.timeout.unwrap_or(10));

    let transport = SerialTransport::open(&serial)?;
    let config = ChannelConfig::default()
        .with_default_timeout(timeout)
        .with_verbose(cli_args.debugging);
    let channel = AtChannel::new(Arc::new(transport), config);

    channel.on_io_broken(|| eprintln!("Modem disappeared"));
    channel.start()?;

    for cmd in &cli_args.commands {
        println!("> {cmd}");

        // Every reply line is printed, so claim them all
        let response = channel.send(ResultKind::NoPrefix, cmd, "", None);
        for line in &response.lines {
            println!("< {line}");
        }
        if response.is_ok() {
            println!("< {}", response.status);
        } else if let Err(e) = response.into_result() {
            println!("! {e}");
        }
    }

    if let Some(seconds) = cli_args.watch {
        channel.on_unsolicited_raw("", |line| println!("~ {line}"));
        println!("Listening for {seconds}s...");
        std::thread::sleep(Duration::from_secs(seconds));
    }

    channel.stop();
    Ok(())
}
