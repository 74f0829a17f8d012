// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Store's control-channel client: `JOIN`, then execute whatever the
//! Controller sends, while also forwarding acks generated by the
//! client-facing server — `STORE_ACK` goes out on this channel, not back
//! to the client.
//!
//! Reconnection is intentionally not implemented: losing this connection
//! is fatal to the process. There is no reconnection protocol for a Store
//! that loses its Controller, because nothing in the wire protocol tells
//! a freshly reconnected Store how to resynchronize the Controller's view
//! of its contents.

use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use dfs_protocol::{read_line, write_line, ControllerCommand, StoreControlMessage};

use crate::storage::Storage;

/// Connects to the Controller, joins, and runs until the connection
/// closes or a transport error occurs.
pub async fn run(
    port: u16,
    cport: u16,
    dial_timeout: Duration,
    storage: Storage,
    mut acks: UnboundedReceiver<StoreControlMessage>,
) -> anyhow::Result<()> {
    let stream = tokio::time::timeout(dial_timeout, TcpStream::connect(("127.0.0.1", cport)))
        .await
        .map_err(|_| anyhow::anyhow!("timed out connecting to controller on port {cport}"))??;
    stream.set_nodelay(true).ok();
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_line(&mut writer, &StoreControlMessage::Join(port).encode()).await?;
    info!(port, cport, "joined controller");

    loop {
        tokio::select! {
            line = read_line(&mut reader) => {
                match line? {
                    None => {
                        info!("control channel closed by controller, exiting");
                        return Ok(());
                    }
                    Some(line) => handle_command(&line, &storage, &mut writer).await?,
                }
            }
            Some(ack) = acks.recv() => {
                write_line(&mut writer, &ack.encode()).await?;
            }
        }
    }
}

async fn handle_command<W>(line: &str, storage: &Storage, writer: &mut W) -> anyhow::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    match ControllerCommand::parse(line) {
        Ok(ControllerCommand::List) => {
            let names = storage.list().await?;
            write_line(writer, &StoreControlMessage::List(names).encode()).await?;
        }
        Ok(ControllerCommand::Remove { name }) => match storage.remove(&name).await? {
            true => write_line(writer, &StoreControlMessage::RemoveAck { name }.encode()).await?,
            false => {
                write_line(
                    writer,
                    &StoreControlMessage::ErrorFileDoesNotExist { name }.encode(),
                )
                .await?
            }
        },
        Err(err) => warn!(error = %err, "dropping malformed controller command"),
    }
    Ok(())
}
