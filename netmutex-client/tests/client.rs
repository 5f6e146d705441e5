//! Drives the real client against a fake TCP server that hand-speaks the
//! wire protocol, so the client can be exercised without pulling in the
//! registry or the server crate.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use netmutex_client::Client;

/// Starts a background thread that accepts one connection, reads
/// newline-delimited JSON-RPC requests, and hands each one to `respond`
/// to build the reply line.
fn spawn_server<F>(respond: F) -> String
where
    F: Fn(serde_json::Value) -> serde_json::Value + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut writer = stream;
        loop {
            let mut line = String::new();
            let read = reader.read_line(&mut line).unwrap_or(0);
            if read == 0 {
                break;
            }
            let request: serde_json::Value = match serde_json::from_str(line.trim_end()) {
                Ok(value) => value,
                Err(_) => break,
            };
            let response = respond(request);
            let mut out = serde_json::to_string(&response).unwrap();
            out.push('\n');
            if writer.write_all(out.as_bytes()).is_err() {
                break;
            }
        }
    });

    addr
}

fn success_response(id: &serde_json::Value, mutex: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": mutex,
    })
}

fn error_response(id: &serde_json::Value, code: i32, message: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

#[test]
fn client_capture_then_release_round_trip() {
    let addr = spawn_server(|request| {
        let id = &request["id"];
        match request["method"].as_str().unwrap() {
            "capture" => success_response(id, "dead0000-0000-0000-0000-0000000000aa"),
            "release" => success_response(id, "dead0000-0000-0000-0000-0000000000aa"),
            other => error_response(id, -32601, &format!("unsupported method '{other}'")),
        }
    });

    let mut client = Client::open(addr).unwrap();
    let mutex = client.capture("widget-queue", 0, false).unwrap();
    assert_eq!(mutex, "dead0000-0000-0000-0000-0000000000aa");

    client.release(&mutex).unwrap();
    client.close().unwrap();
}

#[test]
fn client_surfaces_server_error() {
    let addr = spawn_server(|request| {
        let id = &request["id"];
        error_response(id, -32000, "Resource locked by 'dead0000-0000-0000-0000-0000000000aa'")
    });

    let mut client = Client::open(addr).unwrap();
    let err = client.capture("widget-queue", 0, false).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("-32000") || message.contains("Resource locked"));
}

#[test]
fn client_rejects_mismatched_response_id() {
    let addr = spawn_server(|_request| success_response(&serde_json::json!(999999), "x"));

    let mut client = Client::open(addr).unwrap();
    let err = client.capture("widget-queue", 0, false).unwrap_err();
    assert!(err.to_string().contains("did not match"));
}
