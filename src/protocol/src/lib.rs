// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Wire vocabulary shared by the distributed file store's Controller and
//! Store binaries.
//!
//! The protocol is line-oriented ASCII: every message is a single
//! LF-terminated line of space-separated tokens, with bulk file bytes sent
//! out-of-band immediately following a `STORE`/`LOAD_FROM` line whose size
//! token tells the reader how many bytes to expect. See [`wire::read_line`]
//! and [`wire::write_line`] for the framing primitives, and the
//! per-direction modules below for the messages themselves.

mod client;
mod error;
mod store_client;
mod store_control;
mod wire;

pub use client::{ClientRequest, ControllerReply};
pub use error::ProtocolError;
pub use store_client::{StoreClientReply, StoreClientRequest};
pub use store_control::{ControllerCommand, StoreControlMessage};
pub use wire::{read_line, write_line};
