// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Controller's connection acceptor.
//!
//! A connection is anonymous until its first line arrives: `JOIN <port>`
//! makes it sticky as a Store for the rest of its lifetime; anything else
//! makes it sticky as a client. Each connection then runs as its own
//! task, reading lines and forwarding them to the coordinator as
//! [`Event`]s, and writing back whatever the coordinator (or a pending
//! op's completion) pushes onto its own outgoing channel — one task per
//! connection, each talking to the shared coordinator only by message.

use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, warn};

use dfs_protocol::{read_line, write_line, ClientRequest, ControllerReply, StoreControlMessage};

use crate::coordinator::Event;

pub async fn serve(cport: u16, events: UnboundedSender<Event>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", cport)).await?;
    info!(cport, "controller listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                let events = events.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(socket, events).await {
                        warn!(%peer, error = %err, "connection terminated");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal, closing acceptor");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(socket: TcpStream, events: UnboundedSender<Event>) -> anyhow::Result<()> {
    socket.set_nodelay(true).ok();
    let (read_half, write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    let Some(first_line) = read_line(&mut reader).await? else {
        return Ok(());
    };

    // Only a literal `JOIN` as the first token makes a connection sticky as
    // a Store; anything else (including a client's own `LIST`, which would
    // otherwise parse as a valid `StoreControlMessage::List`) is a client.
    if first_line.split(' ').next() == Some("JOIN") {
        match StoreControlMessage::parse(&first_line) {
            Ok(StoreControlMessage::Join(port)) => {
                handle_store_connection(port, reader, write_half, events).await
            }
            other => {
                warn!(?other, "malformed JOIN on new connection, closing");
                Ok(())
            }
        }
    } else {
        handle_client_connection(first_line, reader, write_half, events).await
    }
}

async fn handle_client_connection(
    first_line: String,
    mut reader: BufReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    events: UnboundedSender<Event>,
) -> anyhow::Result<()> {
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ControllerReply>();
    dispatch_client_line(&first_line, &events, &reply_tx)?;

    loop {
        tokio::select! {
            line = read_line(&mut reader) => {
                match line? {
                    None => return Ok(()),
                    Some(line) => dispatch_client_line(&line, &events, &reply_tx)?,
                }
            }
            Some(reply) = reply_rx.recv() => {
                write_line(&mut writer, &reply.encode()).await?;
            }
        }
    }
}

fn dispatch_client_line(
    line: &str,
    events: &UnboundedSender<Event>,
    reply_tx: &UnboundedSender<ControllerReply>,
) -> anyhow::Result<()> {
    match ClientRequest::parse(line) {
        Ok(req) => events
            .send(Event::ClientRequest {
                req,
                reply: reply_tx.clone(),
            })
            .map_err(|_| anyhow::anyhow!("coordinator task is gone")),
        Err(err) => {
            // Protocol/parse errors are logged and the command is ignored;
            // the connection is never torn down for this reason.
            warn!(error = %err, "dropping malformed client line");
            Ok(())
        }
    }
}

async fn handle_store_connection(
    port: u16,
    mut reader: BufReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    events: UnboundedSender<Event>,
) -> anyhow::Result<()> {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<String>();
    events
        .send(Event::StoreJoined {
            port,
            commands: cmd_tx,
        })
        .map_err(|_| anyhow::anyhow!("coordinator task is gone"))?;

    let result: anyhow::Result<()> = async {
        loop {
            tokio::select! {
                line = read_line(&mut reader) => {
                    match line? {
                        None => return Ok(()),
                        Some(line) => match StoreControlMessage::parse(&line) {
                            Ok(msg) => {
                                events
                                    .send(Event::StoreAck { port, msg })
                                    .map_err(|_| anyhow::anyhow!("coordinator task is gone"))?;
                            }
                            Err(err) => warn!(port, error = %err, "dropping malformed store control line"),
                        },
                    }
                }
                Some(cmd_line) = cmd_rx.recv() => {
                    write_line(&mut writer, &cmd_line).await?;
                }
            }
        }
    }
    .await;

    // Spec §9 "Connection role detection": the task removes its own
    // membership entry before exiting, on every exit path.
    let _ = events.send(Event::StoreLeft { port });
    result
}
