// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The client↔controller half of the protocol.

use crate::error::ProtocolError;
use crate::wire::{parse_port, parse_size, require_arity, tokens};

/// A command a client sends to the Controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientRequest {
    Store { name: String, size: u64 },
    List,
    Load { name: String },
    Reload { name: String },
    Remove { name: String },
}

impl ClientRequest {
    /// Parses a single line of client input.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let toks = tokens(line);
        match toks.first().copied() {
            None => Err(ProtocolError::EmptyLine),
            Some("STORE") => {
                require_arity("STORE", &toks, 3)?;
                Ok(ClientRequest::Store {
                    name: toks[1].to_string(),
                    size: parse_size(toks[2])?,
                })
            }
            Some("LIST") => {
                require_arity("LIST", &toks, 1)?;
                Ok(ClientRequest::List)
            }
            Some("LOAD") => {
                require_arity("LOAD", &toks, 2)?;
                Ok(ClientRequest::Load {
                    name: toks[1].to_string(),
                })
            }
            Some("RELOAD") => {
                require_arity("RELOAD", &toks, 2)?;
                Ok(ClientRequest::Reload {
                    name: toks[1].to_string(),
                })
            }
            Some("REMOVE") => {
                require_arity("REMOVE", &toks, 2)?;
                Ok(ClientRequest::Remove {
                    name: toks[1].to_string(),
                })
            }
            Some(other) => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    /// The filename this request concerns, if any (used to serialize
    /// composite index lookups per filename; see `dfs_controller::index`).
    pub fn name(&self) -> Option<&str> {
        match self {
            ClientRequest::Store { name, .. }
            | ClientRequest::Load { name }
            | ClientRequest::Reload { name }
            | ClientRequest::Remove { name } => Some(name),
            ClientRequest::List => None,
        }
    }
}

/// A reply the Controller sends back to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControllerReply {
    StoreTo(Vec<u16>),
    StoreComplete,
    List(Vec<String>),
    LoadFrom { port: u16, size: u64 },
    RemoveComplete,
    ErrorNotEnoughDstores,
    ErrorFileAlreadyExists,
    ErrorFileDoesNotExist,
    ErrorLoad,
}

impl ControllerReply {
    /// Encodes the reply as a single protocol line (no trailing newline).
    pub fn encode(&self) -> String {
        match self {
            ControllerReply::StoreTo(ports) => {
                let mut s = String::from("STORE_TO");
                for p in ports {
                    s.push(' ');
                    s.push_str(&p.to_string());
                }
                s
            }
            ControllerReply::StoreComplete => "STORE_COMPLETE".to_string(),
            ControllerReply::List(names) => {
                let mut s = String::from("LIST");
                for n in names {
                    s.push(' ');
                    s.push_str(n);
                }
                s
            }
            ControllerReply::LoadFrom { port, size } => format!("LOAD_FROM {port} {size}"),
            ControllerReply::RemoveComplete => "REMOVE_COMPLETE".to_string(),
            ControllerReply::ErrorNotEnoughDstores => "ERROR_NOT_ENOUGH_DSTORES".to_string(),
            ControllerReply::ErrorFileAlreadyExists => "ERROR_FILE_ALREADY_EXISTS".to_string(),
            ControllerReply::ErrorFileDoesNotExist => "ERROR_FILE_DOES_NOT_EXIST".to_string(),
            ControllerReply::ErrorLoad => "ERROR_LOAD".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store() {
        assert_eq!(
            ClientRequest::parse("STORE hello 5").unwrap(),
            ClientRequest::Store {
                name: "hello".to_string(),
                size: 5
            }
        );
    }

    #[test]
    fn parses_list_with_no_args() {
        assert_eq!(ClientRequest::parse("LIST").unwrap(), ClientRequest::List);
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(matches!(
            ClientRequest::parse("STORE hello"),
            Err(ProtocolError::WrongArity { .. })
        ));
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(matches!(
            ClientRequest::parse("FROBNICATE x"),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_size() {
        assert!(matches!(
            ClientRequest::parse("STORE hello five"),
            Err(ProtocolError::InvalidSize(_))
        ));
    }

    #[test]
    fn encodes_store_to_in_given_order() {
        assert_eq!(
            ControllerReply::StoreTo(vec![8001, 8002]).encode(),
            "STORE_TO 8001 8002"
        );
    }

    #[test]
    fn encodes_empty_list() {
        assert_eq!(ControllerReply::List(vec![]).encode(), "LIST");
    }
}
