//! End-to-end scenarios against a real `Server`, driven by the real
//! `netmutex_client::Client`. Each test name matches the scenario it covers.

use std::time::Duration;

use netmutex_client::Client;
use netmutex_server::Server;

async fn spawn_test_server() -> String {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(server.run());
    addr
}

fn blocking_client(addr: &str) -> Client {
    Client::open(addr).unwrap()
}

#[tokio::test]
async fn s1_capture_then_release() {
    let addr = spawn_test_server().await;
    tokio::task::spawn_blocking({
        let addr = addr.clone();
        move || {
            let mut client = blocking_client(&addr);
            let mutex = client.capture("s1-resource", 0, false).unwrap();
            assert!(!mutex.is_empty());
            client.release(&mutex).unwrap();

            // Releasing twice fails: the mutex is gone after the first release.
            let err = client.release(&mutex).unwrap_err();
            assert!(err.to_string().contains("unknown mutex") || err.to_string().contains("-32001"));
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn s2_contention_fails_immediately() {
    let addr = spawn_test_server().await;
    tokio::task::spawn_blocking({
        let addr = addr.clone();
        move || {
            let mut a = blocking_client(&addr);
            let mut b = blocking_client(&addr);

            let held = a.capture("s2-resource", 0, false).unwrap();
            let err = b.capture("s2-resource", 0, false).unwrap_err();
            assert!(err.to_string().contains("-32000") || err.to_string().contains("locked"));

            a.release(&held).unwrap();
            let now_free = b.capture("s2-resource", 0, false).unwrap();
            assert!(!now_free.is_empty());
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn s3_lease_expiry_frees_resource() {
    let addr = spawn_test_server().await;
    tokio::task::spawn_blocking({
        let addr = addr.clone();
        move || {
            let mut a = blocking_client(&addr);
            let mut b = blocking_client(&addr);

            a.capture("s3-resource", 1, false).unwrap();
            let contended = b.capture("s3-resource", 0, false);
            assert!(contended.is_err());

            // timeout is whole seconds on the wire; wait past it plus the
            // reaper's 50ms sweep period plus scheduling slack.
            std::thread::sleep(Duration::from_millis(1200));

            let after_expiry = b.capture("s3-resource", 0, false).unwrap();
            assert!(!after_expiry.is_empty());
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn s4_auto_release_on_disconnect() {
    let addr = spawn_test_server().await;
    let addr_for_first = addr.clone();
    tokio::task::spawn_blocking(move || {
        let mut client = blocking_client(&addr_for_first);
        client.capture("s4-resource", 0, true).unwrap();
        client.close().unwrap();
    })
    .await
    .unwrap();

    // Give the server a moment to observe the disconnect and auto-release.
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::task::spawn_blocking(move || {
        let mut client = blocking_client(&addr);
        let mutex = client.capture("s4-resource", 0, false).unwrap();
        assert!(!mutex.is_empty());

        let err = client.release("invented-0000-0000-0000-000000000000").unwrap_err();
        assert!(err.to_string().contains("-32001") || err.to_string().to_lowercase().contains("unknown"));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn capture_without_autorelease_survives_disconnect() {
    let addr = spawn_test_server().await;
    let addr_for_first = addr.clone();
    let captured = tokio::task::spawn_blocking(move || {
        let mut client = blocking_client(&addr_for_first);
        let mutex = client.capture("no-autorelease-resource", 0, false).unwrap();
        client.close().unwrap();
        mutex
    })
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::task::spawn_blocking(move || {
        let mut client = blocking_client(&addr);
        // The mutex is still held: a second capture of the same resource
        // is contended even though the owning connection disconnected.
        let err = client.capture("no-autorelease-resource", 0, false).unwrap_err();
        assert!(err.to_string().contains(&captured) || err.to_string().contains("-32000"));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn s5_protocol_error_on_unsupported_method() {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpStream;

    let addr = spawn_test_server().await;
    tokio::task::spawn_blocking(move || {
        let stream = TcpStream::connect(&addr).unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);

        writer
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"destroy\",\"params\":{}}\n")
            .unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert!(line.contains("-32601") || line.contains("error"));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn s6_find_mutex_via_shard_scan() {
    let addr = spawn_test_server().await;
    tokio::task::spawn_blocking({
        let addr = addr.clone();
        move || {
            let mut writers = Vec::new();
            for i in 0..8 {
                let mut client = blocking_client(&addr);
                let mutex = client.capture(&format!("s6-resource-{i}"), 0, false).unwrap();
                writers.push((client, mutex));
            }

            // Whatever shard each mutex landed in, a second capture on the
            // same resource name must still find it and report contention.
            for (i, (_, mutex)) in writers.iter().enumerate() {
                let mut contender = blocking_client(&addr);
                let err = contender
                    .capture(&format!("s6-resource-{i}"), 0, false)
                    .unwrap_err();
                assert!(err.to_string().contains("locked") || err.to_string().contains("-32000"));
                assert!(!mutex.is_empty());
            }
        }
    })
    .await
    .unwrap();
}
