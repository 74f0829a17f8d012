// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Store↔Controller control channel: `JOIN` plus the bidirectional
//! command/ack traffic that follows it on the same connection.

use crate::error::ProtocolError;
use crate::wire::{parse_port, require_arity, tokens};

/// A message read by the Controller on a Store's control connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreControlMessage {
    /// The first message a Store ever sends; makes the connection sticky
    /// as a Store in the membership table.
    Join(u16),
    StoreAck { name: String },
    RemoveAck { name: String },
    /// Sent instead of `RemoveAck` when the named file was already absent
    /// locally; deliberately *not* counted as an ack by the coordinator.
    ErrorFileDoesNotExist { name: String },
    /// Reserved for a future rebalancer; parsed but unused by the core
    /// coordinator.
    List(Vec<String>),
}

impl StoreControlMessage {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let toks = tokens(line);
        match toks.first().copied() {
            None => Err(ProtocolError::EmptyLine),
            Some("JOIN") => {
                require_arity("JOIN", &toks, 2)?;
                Ok(StoreControlMessage::Join(parse_port(toks[1])?))
            }
            Some("STORE_ACK") => {
                require_arity("STORE_ACK", &toks, 2)?;
                Ok(StoreControlMessage::StoreAck {
                    name: toks[1].to_string(),
                })
            }
            Some("REMOVE_ACK") => {
                require_arity("REMOVE_ACK", &toks, 2)?;
                Ok(StoreControlMessage::RemoveAck {
                    name: toks[1].to_string(),
                })
            }
            Some("ERROR_FILE_DOES_NOT_EXIST") => {
                require_arity("ERROR_FILE_DOES_NOT_EXIST", &toks, 2)?;
                Ok(StoreControlMessage::ErrorFileDoesNotExist {
                    name: toks[1].to_string(),
                })
            }
            Some("LIST") => Ok(StoreControlMessage::List(
                toks[1..].iter().map(|t| t.to_string()).collect(),
            )),
            Some(other) => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// A command the Controller sends to a Store over the control channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControllerCommand {
    List,
    Remove { name: String },
}

impl ControllerCommand {
    pub fn encode(&self) -> String {
        match self {
            ControllerCommand::List => "LIST".to_string(),
            ControllerCommand::Remove { name } => format!("REMOVE {name}"),
        }
    }

    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let toks = tokens(line);
        match toks.first().copied() {
            None => Err(ProtocolError::EmptyLine),
            Some("LIST") => {
                require_arity("LIST", &toks, 1)?;
                Ok(ControllerCommand::List)
            }
            Some("REMOVE") => {
                require_arity("REMOVE", &toks, 2)?;
                Ok(ControllerCommand::Remove {
                    name: toks[1].to_string(),
                })
            }
            Some(other) => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl StoreControlMessage {
    pub fn encode(&self) -> String {
        match self {
            StoreControlMessage::Join(port) => format!("JOIN {port}"),
            StoreControlMessage::StoreAck { name } => format!("STORE_ACK {name}"),
            StoreControlMessage::RemoveAck { name } => format!("REMOVE_ACK {name}"),
            StoreControlMessage::ErrorFileDoesNotExist { name } => {
                format!("ERROR_FILE_DOES_NOT_EXIST {name}")
            }
            StoreControlMessage::List(names) => {
                let mut s = String::from("LIST");
                for n in names {
                    s.push(' ');
                    s.push_str(n);
                }
                s
            }
        }
    }
}
