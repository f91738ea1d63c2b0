use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use wobble_control::{BrokerClient, ControlError, MqttClient, MqttOptions};
use wobble_core::OutboundEvent;

const CONNECT: u8 = 0x10;
const PUBLISH: u8 = 0x30;

/// Read one MQTT packet: (header byte, body)
fn read_packet(stream: &mut TcpStream) -> Option<(u8, Vec<u8>)> {
    let mut header = [0u8; 1];
    stream.read_exact(&mut header).ok()?;

    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).ok()?;
        len |= ((byte[0] & 0x7F) as usize) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).ok()?;
    Some((header[0], body))
}

/// Accept one client, answer CONNECT with `return_code`, forward every packet after it
fn local_broker(return_code: u8) -> (u16, mpsc::Receiver<(u8, Vec<u8>)>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let connect = read_packet(&mut stream).unwrap();
        tx.send(connect).unwrap();
        stream.write_all(&[0x20, 0x02, 0x00, return_code]).unwrap();

        while let Some(packet) = read_packet(&mut stream) {
            if tx.send(packet).is_err() {
                break;
            }
        }
    });

    (port, rx)
}

fn wait_connected(client: &MqttClient) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if client.is_connected() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn event(led: u32, value: &str) -> OutboundEvent {
    OutboundEvent {
        topic: format!("light/led/{}", led),
        payload: format!(r#"{{"value":"{}"}}"#, value),
        timestamp: Utc::now(),
    }
}

fn decode_publish(body: &[u8]) -> (String, String) {
    let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
    let topic = String::from_utf8(body[2..2 + topic_len].to_vec()).unwrap();
    let payload = String::from_utf8(body[2 + topic_len..].to_vec()).unwrap();
    (topic, payload)
}

#[test]
fn test_batch_reaches_broker_in_order() {
    let (port, rx) = local_broker(0);
    let mut client = MqttClient::new(MqttOptions::new("127.0.0.1", port, "wobble-test")).unwrap();

    let (header, body) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(header, CONNECT);
    assert!(body.ends_with(b"wobble-test"));
    assert!(wait_connected(&client));

    client
        .publish_batch(&[event(0, "10"), event(1, "10"), event(0, "10")])
        .unwrap();

    let published: Vec<(String, String)> = (0..3)
        .map(|_| {
            let (header, body) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(header, PUBLISH);
            decode_publish(&body)
        })
        .collect();

    assert_eq!(
        published,
        vec![
            ("light/led/0".to_string(), r#"{"value":"10"}"#.to_string()),
            ("light/led/1".to_string(), r#"{"value":"10"}"#.to_string()),
            ("light/led/0".to_string(), r#"{"value":"10"}"#.to_string()),
        ]
    );
}

#[test]
fn test_refused_session_rejects_batches() {
    let (port, rx) = local_broker(5);
    let mut options = MqttOptions::new("127.0.0.1", port, "refused");
    options.reconnect_delay = Duration::from_millis(50);
    let mut client = MqttClient::new(options).unwrap();

    // Wait for the CONNECT, then give the event loop time to read the refusal
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    thread::sleep(Duration::from_millis(200));

    let err = client.publish_batch(&[event(0, "1")]).unwrap_err();
    assert!(matches!(err, ControlError::BrokerUnavailable(_)));
    assert!(!client.is_connected());
}
