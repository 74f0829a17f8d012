// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Exercises the client-facing server over a real loopback TCP connection:
//! the store-then-load-data round trip, and the missing-file case.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

use dfs_protocol::StoreControlMessage;
use dfs_store::{client_server, Storage};

async fn spawn_server() -> (
    tempfile::TempDir,
    u16,
    Storage,
    mpsc::UnboundedReceiver<StoreControlMessage>,
) {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Storage::new(tmp.path().to_path_buf());
    storage.reset().await.unwrap();

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (acks_tx, acks_rx) = mpsc::unbounded_channel();
    let serve_storage = storage.clone();
    tokio::spawn(async move {
        let _ = client_server::serve(port, serve_storage, acks_tx).await;
    });

    // Give the listener a moment to bind before connecting.
    tokio::time::sleep(Duration::from_millis(20)).await;

    (tmp, port, storage, acks_rx)
}

#[tokio::test]
async fn store_then_load_data_round_trips_bytes_and_acks_the_controller_channel() {
    let (_tmp, port, _storage, mut acks_rx) = spawn_server().await;

    let mut conn = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    conn.write_all(b"STORE greeting 11\n").await.unwrap();
    conn.write_all(b"hello world").await.unwrap();

    let mut reader = BufReader::new(&mut conn);
    let mut ack_line = String::new();
    reader.read_line(&mut ack_line).await.unwrap();
    assert_eq!(ack_line.trim_end(), "ACK");
    drop(conn);

    let ack = timeout(Duration::from_secs(1), acks_rx.recv())
        .await
        .expect("store ack within 1s")
        .unwrap();
    assert_eq!(
        ack,
        StoreControlMessage::StoreAck {
            name: "greeting".to_string()
        }
    );

    let mut conn = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    conn.write_all(b"LOAD_DATA greeting\n").await.unwrap();

    let mut buf = Vec::new();
    conn.read_to_end(&mut buf).await.unwrap();
    assert_eq!(buf, b"hello world");
}

#[tokio::test]
async fn load_data_on_a_missing_file_closes_without_a_reply_byte() {
    let (_tmp, port, _storage, _acks_rx) = spawn_server().await;

    let mut conn = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    conn.write_all(b"LOAD_DATA nope\n").await.unwrap();

    let mut buf = Vec::new();
    conn.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());
}
