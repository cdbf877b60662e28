#![cfg(feature = "cli")]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use mosaic::frame::encode_sentence;
use serde_json::Value;

const GGA: &str = "GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,";

fn spawn_run(device: &str) -> Child {
    Command::new(env!("CARGO_BIN_EXE_mosaic"))
        .env_remove("MOSAIC_CONFIG")
        .env_remove("MOSAIC_DEVICE")
        .args(["--log-level", "error", "--format", "json", "run"])
        .args(["--device", device, "--reconnect-delay", "0.05"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("run command should start")
}

#[test]
fn run_publishes_gga_from_tcp_receiver() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut child = spawn_run(&format!("tcp://127.0.0.1:{port}"));

    let (mut stream, _) = listener.accept().expect("driver should connect");
    let stdout = child.stdout.take().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let sentence = encode_sentence(GGA).unwrap();
    stream.write_all(sentence.as_bytes()).unwrap();
    // Disabled by default: must not be published.
    stream
        .write_all(encode_sentence("GPGSV,3,1,11").unwrap().as_bytes())
        .unwrap();
    stream.write_all(sentence.as_bytes()).unwrap();

    let first = rx.recv_timeout(Duration::from_secs(5)).expect("first record");
    let second = rx.recv_timeout(Duration::from_secs(5)).expect("second record");
    for line in [first, second] {
        let record: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(record["identifier"], "GPGGA");
        assert_eq!(record["destination"], "/gpgga");
        assert_eq!(record["frame_id"], "gnss");
    }

    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn run_reconnects_after_receiver_restart() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut child = spawn_run(&format!("tcp://127.0.0.1:{port}"));

    let stdout = child.stdout.take().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let sentence = encode_sentence(GGA).unwrap();
    let (first, _) = listener.accept().expect("driver should connect");
    drop(first);

    let (mut second, _) = listener.accept().expect("driver should reconnect");
    second.write_all(sentence.as_bytes()).unwrap();
    let line = rx.recv_timeout(Duration::from_secs(5)).expect("record after reconnect");
    let record: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(record["identifier"], "GPGGA");

    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn unsupported_protocol_is_a_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_mosaic"))
        .env_remove("MOSAIC_CONFIG")
        .args(["--log-level", "error", "run", "--device", "udp://127.0.0.1:5000"])
        .output()
        .expect("mosaic should run");

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("udp"), "stderr: {stderr}");
}

#[test]
fn non_positive_reconnect_delay_is_a_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_mosaic"))
        .env_remove("MOSAIC_CONFIG")
        .args(["--log-level", "error", "run", "--device", "tcp://127.0.0.1:1"])
        .args(["--reconnect-delay", "0"])
        .output()
        .expect("mosaic should run");

    assert_eq!(output.status.code(), Some(64));
}
