// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The client↔Store half of the protocol: the one-line preamble that
//! precedes (or replaces) a raw byte stream on a Store's client-facing
//! port.

use crate::error::ProtocolError;
use crate::wire::{parse_size, require_arity, tokens};

/// A request a client sends directly to a Store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreClientRequest {
    /// Followed on the same connection by exactly `size` raw bytes.
    Store { name: String, size: u64 },
    /// No further bytes follow; the Store's reply *is* the byte stream (or
    /// a bare close, if the file is missing).
    LoadData { name: String },
}

impl StoreClientRequest {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let toks = tokens(line);
        match toks.first().copied() {
            None => Err(ProtocolError::EmptyLine),
            Some("STORE") => {
                require_arity("STORE", &toks, 3)?;
                Ok(StoreClientRequest::Store {
                    name: toks[1].to_string(),
                    size: parse_size(toks[2])?,
                })
            }
            Some("LOAD_DATA") => {
                require_arity("LOAD_DATA", &toks, 2)?;
                Ok(StoreClientRequest::LoadData {
                    name: toks[1].to_string(),
                })
            }
            Some(other) => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// A reply a Store sends directly to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreClientReply {
    /// Sent immediately after accepting a `STORE` preamble, before the
    /// bulk bytes are read.
    Ack,
}

impl StoreClientReply {
    pub fn encode(&self) -> String {
        match self {
            StoreClientReply::Ack => "ACK".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_load_data() {
        assert_eq!(
            StoreClientRequest::parse("LOAD_DATA hello").unwrap(),
            StoreClientRequest::LoadData {
                name: "hello".to_string()
            }
        );
    }

    #[test]
    fn ack_encodes_to_bare_token() {
        assert_eq!(StoreClientReply::Ack.encode(), "ACK");
    }
}
