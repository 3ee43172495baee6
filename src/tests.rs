//! Integration tests for the AT channel, scheduler and SMS pipeline working together

use crate::at::{AtChannel, ChannelConfig, ResultCode, ResultKind};
use crate::hex::decode_hex;
use crate::pdu::Pdu;
use crate::scheduler::Scheduler;
use crate::sms::assemble_listing;
use crate::transport::mock::MockTransport;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(test)]
mod integration_tests {
    use super::*;

    fn setup() -> (Arc<MockTransport>, Arc<AtChannel>) {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let transport = Arc::new(MockTransport::new());
        let config = ChannelConfig::default()
            .with_default_timeout(Duration::from_secs(2))
            .with_read_timeout(Duration::from_millis(50))
            .with_verbose(true);
        let channel = Arc::new(AtChannel::new(transport.clone(), config));
        channel.start().unwrap();
        (transport, channel)
    }

    fn recorder(channel: &AtChannel, prefix: &str) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        channel.on_unsolicited(prefix, move |line| log.lock().unwrap().push(line.to_string()));
        seen
    }

    fn wait_until(what: &str, check: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !check() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_commands_are_serialized() {
        let (transport, channel) = setup();
        transport.respond("AT+SECOND", "OK\r\n");

        let first = {
            let channel = channel.clone();
            thread::spawn(move || channel.send_command_no_response("AT+FIRST"))
        };
        wait_until("first write", || transport.sent().len() == 1);
        assert!(channel.busy());

        let second = {
            let channel = channel.clone();
            thread::spawn(move || channel.send_command_no_response("AT+SECOND"))
        };

        // The second command must not reach the wire while the first is open
        thread::sleep(Duration::from_millis(100));
        assert_eq!(transport.sent(), vec!["AT+FIRST"]);

        transport.push("OK\r\n");
        assert_eq!(first.join().unwrap(), ResultCode::Success);
        assert_eq!(second.join().unwrap(), ResultCode::Success);
        assert_eq!(transport.sent(), vec!["AT+FIRST", "AT+SECOND"]);
    }

    #[test]
    fn test_unsolicited_is_not_taken_as_response() {
        let (transport, channel) = setup();
        let creg = recorder(&channel, "+CREG");
        let cgdcont = recorder(&channel, "+CGDCONT");

        transport.respond(
            "AT+CGDCONT?",
            "\r\n+CREG: 1\r\n+CGDCONT: 1,\"IP\",\"internet\"\r\n\r\nOK\r\n",
        );
        let response = channel.send_command("AT+CGDCONT?", "+CGDCONT");

        assert_eq!(response.error, ResultCode::Success);
        assert_eq!(response.lines, vec!["+CGDCONT: 1,\"IP\",\"internet\""]);
        assert_eq!(*creg.lock().unwrap(), vec!["+CREG: 1"]);
        assert!(cgdcont.lock().unwrap().is_empty());
    }

    #[test]
    fn test_multiline_continuation_and_interruption() {
        let (transport, channel) = setup();
        let creg = recorder(&channel, "+CREG");

        transport.respond(
            "AT+CGCONTRDP",
            "+CGCONTRDP: 1,5,\"internet\"\r\nsome continuation text\r\n+CREG: 1\r\nOK\r\n",
        );
        let response = channel.send_command_multiline("AT+CGCONTRDP", "+CGCONTRDP");

        assert_eq!(
            response.lines,
            vec!["+CGCONTRDP: 1,5,\"internet\"\r\nsome continuation text"]
        );
        assert_eq!(*creg.lock().unwrap(), vec!["+CREG: 1"]);
    }

    #[test]
    fn test_no_prefix_lines_are_shared() {
        let (transport, channel) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        channel.on_unsolicited_raw("Quectel", move |line| {
            log.lock().unwrap().push(line.to_string())
        });

        transport.respond("ATI", "Quectel\r\nEC25\r\nOK\r\n");
        let response = channel.send_command_no_prefix("ATI");

        assert_eq!(response.lines, vec!["Quectel", "EC25"]);
        assert_eq!(*seen.lock().unwrap(), vec!["Quectel"]);
    }

    #[test]
    fn test_dial_outcomes() {
        let (transport, channel) = setup();

        transport.respond("ATD*99#", "CONNECT 150000000\r\n");
        let response = channel.send_command_dial("ATD*99#");
        assert_eq!(response.error, ResultCode::Success);
        assert_eq!(response.status, "CONNECT 150000000");

        transport.respond("ATD*99#", "NO CARRIER\r\n");
        let response = channel.send_command_dial("ATD*99#");
        assert_eq!(response.error, ResultCode::Error);
        assert_eq!(response.status, "NO CARRIER");
    }

    #[test]
    fn test_broken_transport() {
        let (transport, channel) = setup();
        let broken = Arc::new(AtomicUsize::new(0));
        let counter = broken.clone();
        channel.on_io_broken(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let pending = {
            let channel = channel.clone();
            thread::spawn(move || channel.send_command("AT+COPS?", "+COPS"))
        };
        wait_until("write", || transport.sent().len() == 1);

        transport.break_link();
        assert_eq!(pending.join().unwrap().error, ResultCode::IoBroken);
        wait_until("broken hook", || broken.load(Ordering::SeqCst) == 1);
        assert!(!channel.is_running());

        // Later commands fail without touching the transport
        assert_eq!(channel.send_command_no_response("AT"), ResultCode::IoBroken);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_timeout_and_late_reply() {
        let (transport, channel) = setup();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let log = errors.clone();
        channel.on_any_error(move |code, issued| {
            log.lock().unwrap().push((code, issued.elapsed()));
        });

        let response = channel.send(
            ResultKind::NoResponse,
            "AT+COPS=?",
            "",
            Some(Duration::from_millis(100)),
        );
        assert_eq!(response.error, ResultCode::Timeout);
        {
            let errors = errors.lock().unwrap();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].0, ResultCode::Timeout);
            assert!(errors[0].1 >= Duration::from_millis(100));
        }

        // The terminator arriving after the deadline must not complete the next command
        transport.push("OK\r\n");
        thread::sleep(Duration::from_millis(50));

        transport.respond("AT+CSQ", "+CSQ: 17,99\r\nOK\r\n");
        let response = channel.send_command("AT+CSQ", "+CSQ");
        assert_eq!(response.error, ResultCode::Success);
        assert_eq!(response.data(), "+CSQ: 17,99");
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stop_wakes_pending_command() {
        let (transport, channel) = setup();

        let pending = {
            let channel = channel.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let response = channel.send(
                    ResultKind::NoResponse,
                    "AT+CFUN=1",
                    "",
                    Some(Duration::from_secs(30)),
                );
                (response.error, start.elapsed())
            })
        };
        wait_until("write", || transport.sent().len() == 1);

        channel.stop();
        let (error, elapsed) = pending.join().unwrap();
        assert_eq!(error, ResultCode::IoBroken);
        assert!(elapsed < Duration::from_secs(5));
        assert!(!channel.is_running());
    }

    #[test]
    fn test_scheduled_follow_up_from_unsolicited() {
        let (transport, channel) = setup();
        let scheduler = Arc::new(Scheduler::new().unwrap());
        let (tx, rx) = mpsc::channel();

        transport.respond(
            "AT+CMGR=3",
            "+CMGR: 0,,36\r\n07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37\r\nOK\r\n",
        );

        let weak = Arc::downgrade(&channel);
        let timers = scheduler.clone();
        channel.on_unsolicited("+CMTI", move |line| {
            let index = line.rsplit(',').next().unwrap_or_default().trim().to_string();
            let weak = weak.clone();
            let tx = tx.clone();
            timers.set_timeout(Duration::from_millis(10), move || {
                if let Some(channel) = weak.upgrade() {
                    let response =
                        channel.send_command_multiline(&format!("AT+CMGR={index}"), "+CMGR");
                    tx.send(response).unwrap();
                }
            });
        });

        transport.push("+CMTI: \"SM\",3\r\n");
        let response = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(response.error, ResultCode::Success);

        let (_, hex) = response.data().split_once("\r\n").unwrap();
        let pdu = Pdu::decode(&decode_hex(hex).unwrap(), false).unwrap();
        assert_eq!(pdu.user_data().unwrap().text, "hellohello");
    }

    #[test]
    fn test_sms_listing_pipeline() {
        let (transport, channel) = setup();
        transport.respond(
            "AT+CMGL=4",
            concat!(
                "+CMGL: 0,1,,24\r\n",
                "004404812143000002102030405000090500032A02019069\r\n",
                "+CMGL: 1,0,,36\r\n",
                "07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37\r\n",
                "+CMGL: 2,1,,24\r\n",
                "004404812143000002102030405000090500032A0202B26F\r\n",
                "OK\r\n",
            ),
        );

        let response = channel.send_command_multiline("AT+CMGL=4", "+CMGL");
        assert_eq!(response.error, ResultCode::Success);
        assert_eq!(response.lines.len(), 3);

        let messages = assemble_listing(&response.lines);
        assert_eq!(messages.len(), 2);

        assert_eq!(messages[0].text(), "HiYo");
        assert_eq!(messages[0].indexes(), vec![0, 2]);
        assert!(!messages[0].unread);

        assert_eq!(messages[1].text(), "hellohello");
        assert_eq!(messages[1].addr, "27838890001");
        assert!(messages[1].unread);
    }
}
