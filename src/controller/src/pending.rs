// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Pending store/remove operations: per-filename ack aggregation with a
//! generation counter standing in for an idempotent-against-completion
//! timer.
//!
//! Rather than cancelling a spawned timer when an op completes, each op
//! is tagged with a `generation` when created. The coordinator hands the
//! same generation back to itself when the timer fires; [`PendingOps`]
//! accepts the timeout only if an op by that name *and* generation still
//! exists. A completed-then-superseded op therefore can't be timed out
//! twice, and an ack that arrives after a timeout finds nothing to update.

use std::collections::BTreeSet;

use tokio::sync::mpsc::UnboundedSender;

use dfs_protocol::ControllerReply;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Store,
    Remove,
}

#[derive(Debug)]
pub struct PendingOp {
    pub kind: OpKind,
    pub generation: u64,
    pub target_ports: BTreeSet<u16>,
    pub acked_ports: BTreeSet<u16>,
    /// The requesting client connection's outgoing-message channel. The
    /// immediate reply (e.g. `STORE_TO`) was already pushed through this
    /// same channel before the op was registered; completion pushes the
    /// deferred `STORE_COMPLETE`/`REMOVE_COMPLETE` through it too, so the
    /// two arrive on the wire in the right order without any extra
    /// bookkeeping.
    pub reply: UnboundedSender<ControllerReply>,
}

impl PendingOp {
    /// Adds `port` to the ack set if it's a target. Returns `true` once
    /// `acked == targets`; the caller is then responsible for finalizing
    /// and dropping this op.
    fn ack(&mut self, port: u16) -> bool {
        if self.target_ports.contains(&port) {
            self.acked_ports.insert(port);
        }
        self.acked_ports == self.target_ports
    }
}

/// The table of in-flight store/remove operations, keyed by filename. At
/// most one pending op per filename holds because this is a plain
/// `HashMap` keyed on name, owned solely by the coordinator task.
#[derive(Debug, Default)]
pub struct PendingOps {
    ops: std::collections::HashMap<String, PendingOp>,
    next_generation: u64,
}

impl PendingOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending op, returning its generation for the
    /// caller to pair with the timer it arms.
    pub fn insert(
        &mut self,
        name: String,
        kind: OpKind,
        target_ports: BTreeSet<u16>,
        reply: UnboundedSender<ControllerReply>,
    ) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.ops.insert(
            name,
            PendingOp {
                kind,
                generation,
                target_ports,
                acked_ports: BTreeSet::new(),
                reply,
            },
        );
        generation
    }

    pub fn get(&self, name: &str) -> Option<&PendingOp> {
        self.ops.get(name)
    }

    /// Applies an ack from `port` to the pending op for `name`, if one
    /// exists. Returns the completed op (removed from the table) when the
    /// ack set is now full.
    pub fn ack(&mut self, name: &str, port: u16) -> Option<PendingOp> {
        let complete = self.ops.get_mut(name)?.ack(port);
        if complete {
            self.ops.remove(name)
        } else {
            None
        }
    }

    /// Removes the pending op for `name` if it still exists *and* its
    /// generation matches — i.e. it hasn't already completed and been
    /// superseded by a newer op under the same name.
    pub fn take_for_timeout(&mut self, name: &str, generation: u64) -> Option<PendingOp> {
        if self.ops.get(name)?.generation == generation {
            self.ops.remove(name)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}
