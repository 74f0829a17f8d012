// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

/// An error parsing or encoding a line of the wire protocol.
///
/// Per the protocol's error handling design, a `ProtocolError` is never
/// fatal to the connection it was read from: the caller logs it and
/// continues reading the next line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty line")]
    EmptyLine,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("wrong number of arguments for {command}: expected {expected}, got {got}")]
    WrongArity {
        command: String,
        expected: usize,
        got: usize,
    },
    #[error("invalid port {0:?}")]
    InvalidPort(String),
    #[error("invalid size {0:?}")]
    InvalidSize(String),
}
