use devcmd::{send_command, CommandClient, DevCmdError, DeviceAddress, ExchangeState, TargetConfig, RESPONSE_BUFFER_SIZE};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Test device: accepts one connection, reads the command line, then lets
/// `reply` drive the socket. Returns the bytes it received.
fn spawn_device<F>(reply: F) -> (u16, JoinHandle<Vec<u8>>)
where
    F: FnOnce(&mut TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let received = read_line(&mut stream);
        reply(&mut stream);
        received
    });

    (port, handle)
}

fn read_line(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    let mut byte = [0u8; 1];
    while let Ok(1) = stream.read(&mut byte) {
        received.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    received
}

fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[cfg(test)]
mod client_tests {
    use super::*;

    #[test]
    fn test_pulse_count_scenario() {
        let (port, device) = spawn_device(|stream| {
            stream.write_all(b"42\n").unwrap();
        });

        let response = send_command("127.0.0.1", port, "P").unwrap();

        assert_eq!(response, "42");
        assert_eq!(device.join().unwrap(), b"P\n");
    }

    #[test]
    fn test_unknown_command_scenario() {
        let (port, device) = spawn_device(|stream| {
            stream.write_all(b"Unknown command\n").unwrap();
        });

        let response = send_command("127.0.0.1", port, "Q").unwrap();

        assert_eq!(response, "Unknown command");
        assert_eq!(device.join().unwrap(), b"Q\n");
    }

    #[test]
    fn test_device_closes_without_reply() {
        let (port, device) = spawn_device(|_stream| {});

        let response = send_command("127.0.0.1", port, "D").unwrap();

        assert_eq!(response, "");
        device.join().unwrap();
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let (port, device) = spawn_device(|stream| {
            stream.write_all(b"\r\n  Door toggled \t\r\n").unwrap();
        });

        let response = send_command("127.0.0.1", port, "D").unwrap();

        assert_eq!(response, "Door toggled");
        device.join().unwrap();
    }

    #[test]
    fn test_long_reply_is_truncated() {
        let (port, device) = spawn_device(|stream| {
            // Ignore errors: the client may close before everything is written
            let _ = stream.write_all(&[b'7'; 4096]);
        });

        let response = send_command("127.0.0.1", port, "P").unwrap();

        assert!(!response.is_empty());
        assert!(response.len() <= RESPONSE_BUFFER_SIZE);
        assert!(response.bytes().all(|b| b == b'7'));
        device.join().unwrap();
    }

    #[test]
    fn test_invalid_utf8_reply() {
        let (port, device) = spawn_device(|stream| {
            stream.write_all(&[0xff, 0xfe, b'\n']).unwrap();
        });

        let result = send_command("127.0.0.1", port, "P");

        assert!(matches!(result, Err(DevCmdError::Decode(_))));
        device.join().unwrap();
    }

    #[test]
    fn test_connection_refused() {
        let result = send_command("127.0.0.1", unused_port(), "P");

        match result {
            Err(DevCmdError::Connection { addr, .. }) => assert!(addr.starts_with("127.0.0.1:")),
            other => panic!("expected connection error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_timeout_when_device_stays_silent() {
        let (port, device) = spawn_device(|_stream| {
            thread::sleep(Duration::from_millis(500));
        });

        let target = TargetConfig::new(DeviceAddress::new("127.0.0.1", port))
            .with_connect_timeout(Duration::from_secs(1))
            .with_read_timeout(Duration::from_millis(100));
        let result = CommandClient::from_target(&target).send_command("P");

        assert!(matches!(
            result,
            Err(DevCmdError::Timeout { stage: ExchangeState::AwaitingResponse, .. })
        ));
        device.join().unwrap();
    }

    #[test]
    fn test_connection_closed_after_call() {
        let (port, device) = spawn_device(|stream| {
            stream.write_all(b"ok\n").unwrap();
            // The client must hang up after its single read
            let mut rest = Vec::new();
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            assert_eq!(stream.read_to_end(&mut rest).unwrap(), 0);
        });

        assert_eq!(send_command("127.0.0.1", port, "P").unwrap(), "ok");
        device.join().unwrap();
    }

    #[test]
    fn test_client_is_reusable_across_calls() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let device = thread::spawn(move || {
            let mut commands = Vec::new();
            for reply in ["1", "2"] {
                let (mut stream, _) = listener.accept().unwrap();
                commands.push(read_line(&mut stream));
                stream.write_all(format!("{}\n", reply).as_bytes()).unwrap();
            }
            commands
        });

        let client = CommandClient::new(DeviceAddress::new("127.0.0.1", port));
        assert_eq!(client.send_command("P").unwrap(), "1");
        assert_eq!(client.send_command("D").unwrap(), "2");

        assert_eq!(device.join().unwrap(), vec![b"P\n".to_vec(), b"D\n".to_vec()]);
    }

    #[test]
    fn test_concurrent_calls_are_independent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let device = thread::spawn(move || {
            for _ in 0..4 {
                let (mut stream, _) = listener.accept().unwrap();
                let line = read_line(&mut stream);
                stream.write_all(&line).unwrap();
            }
        });

        let client = CommandClient::new(DeviceAddress::new("127.0.0.1", port));
        thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let client = &client;
                    scope.spawn(move || (i, client.send_command(&format!("cmd{}", i)).unwrap()))
                })
                .collect();

            for handle in handles {
                let (i, response) = handle.join().unwrap();
                assert_eq!(response, format!("cmd{}", i));
            }
        });

        device.join().unwrap();
    }
}
