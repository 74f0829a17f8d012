// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Store's client-facing server. Each connection carries exactly one
//! request: a bulk upload (`STORE`) or a bulk download (`LOAD_DATA`).

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use dfs_protocol::{read_line, write_line, StoreClientReply, StoreClientRequest, StoreControlMessage};

use crate::storage::Storage;

pub async fn serve(
    port: u16,
    storage: Storage,
    acks: UnboundedSender<StoreControlMessage>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "store listening for clients");

    loop {
        let (socket, peer) = listener.accept().await?;
        let storage = storage.clone();
        let acks = acks.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(socket, storage, acks).await {
                warn!(%peer, error = %err, "client connection terminated");
            }
        });
    }
}

async fn handle_connection(
    socket: TcpStream,
    storage: Storage,
    acks: UnboundedSender<StoreControlMessage>,
) -> anyhow::Result<()> {
    socket.set_nodelay(true).ok();
    let (read_half, mut writer) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    let Some(line) = read_line(&mut reader).await? else {
        return Ok(());
    };

    match StoreClientRequest::parse(&line) {
        Ok(StoreClientRequest::Store { name, size }) => {
            write_line(&mut writer, &StoreClientReply::Ack.encode()).await?;
            storage.store_bytes(&name, &mut reader, size).await?;
            let _ = acks.send(StoreControlMessage::StoreAck { name });
        }
        Ok(StoreClientRequest::LoadData { name }) => match storage.open(&name).await? {
            Some(mut file) => {
                tokio::io::copy(&mut file, &mut writer).await?;
            }
            // No reply byte at all on a miss; the client treats the close
            // as a retry signal via RELOAD.
            None => {}
        },
        Err(err) => {
            warn!(error = %err, "dropping malformed client line");
        }
    }
    Ok(())
}
