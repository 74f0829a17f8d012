// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Controller's single-owner coordinator task.
//!
//! Rather than guarding the membership table, file index, and pending-ops
//! table with locks shared across per-connection tasks, every mutation
//! funnels through one task that processes [`Event`]s off an unbounded
//! channel, one at a time. Ack aggregation is atomic with completion and
//! timer fires are idempotent against completion for free: a single task
//! handling one event after another cannot race with itself. Connection
//! tasks communicate with the stateful owner only by message, never by
//! shared mutable state.

use std::collections::BTreeSet;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use dfs_protocol::{ClientRequest, ControllerCommand, ControllerReply, StoreControlMessage};

use crate::config::Config;
use crate::index::FileIndex;
use crate::membership::{Membership, StoreHandle};
use crate::pending::{OpKind, PendingOps};
use crate::placement;

/// A unit of work delivered to the coordinator by a connection task or a
/// pending-op timer.
#[derive(Debug)]
pub enum Event {
    ClientRequest {
        req: ClientRequest,
        reply: UnboundedSender<ControllerReply>,
    },
    StoreJoined {
        port: u16,
        commands: UnboundedSender<String>,
    },
    StoreLeft {
        port: u16,
    },
    StoreAck {
        port: u16,
        msg: StoreControlMessage,
    },
    Timeout {
        name: String,
        kind: OpKind,
        generation: u64,
    },
    /// Read-only status query, used by tests and by `Controller::snapshot`.
    Snapshot(oneshot::Sender<Snapshot>),
}

/// A read-only summary of coordinator state, for tests and for a future
/// status surface; not a rebalancer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub members: usize,
    pub indexed_files: usize,
    pub pending_ops: usize,
}

pub struct Coordinator {
    config: Config,
    membership: Membership,
    index: FileIndex,
    pending: PendingOps,
    events: UnboundedSender<Event>,
}

impl Coordinator {
    /// Spawns the coordinator task and returns a sender for feeding it
    /// events, plus a snapshot handle for introspection.
    pub fn spawn(config: Config) -> UnboundedSender<Event> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let coordinator = Coordinator {
            config,
            membership: Membership::new(),
            index: FileIndex::new(),
            pending: PendingOps::new(),
            events: events_tx.clone(),
        };
        tokio::spawn(coordinator.run(events_rx));
        events_tx
    }

    async fn run(mut self, mut events: UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        info!("coordinator event channel closed, shutting down");
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            members: self.membership.len(),
            indexed_files: self.index.len(),
            pending_ops: self.pending.len(),
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::ClientRequest { req, reply } => self.handle_client_request(req, reply),
            Event::StoreJoined { port, commands } => self.handle_store_joined(port, commands),
            Event::StoreLeft { port } => self.handle_store_left(port),
            Event::StoreAck { port, msg } => self.handle_store_ack(port, msg),
            Event::Timeout {
                name,
                kind,
                generation,
            } => self.handle_timeout(name, kind, generation),
            Event::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_client_request(&mut self, req: ClientRequest, reply: UnboundedSender<ControllerReply>) {
        if self.membership.len() < self.config.replication_factor() {
            let _ = reply.send(ControllerReply::ErrorNotEnoughDstores);
            return;
        }
        match req {
            ClientRequest::Store { name, size } => self.handle_store(name, size, reply),
            ClientRequest::List => {
                let _ = reply.send(ControllerReply::List(self.index.list_complete()));
            }
            ClientRequest::Load { name } => self.handle_load(name, reply, false),
            ClientRequest::Reload { name } => self.handle_load(name, reply, true),
            ClientRequest::Remove { name } => self.handle_remove(name, reply),
        }
    }

    fn handle_store(&mut self, name: String, size: u64, reply: UnboundedSender<ControllerReply>) {
        if self.index.contains(&name) {
            let _ = reply.send(ControllerReply::ErrorFileAlreadyExists);
            return;
        }
        let r = self.config.replication_factor();
        let Some(targets) = placement::select_targets(&self.membership, r) else {
            let _ = reply.send(ControllerReply::ErrorNotEnoughDstores);
            return;
        };

        self.index.begin_store(name.clone(), size);
        let ports: Vec<u16> = targets.iter().copied().collect();
        let _ = reply.send(ControllerReply::StoreTo(ports));

        let generation = self
            .pending
            .insert(name.clone(), OpKind::Store, targets, reply);
        self.arm_timer(name, OpKind::Store, generation);
    }

    fn handle_load(&mut self, name: String, reply: UnboundedSender<ControllerReply>, is_reload: bool) {
        let not_found_reply = if is_reload {
            ControllerReply::ErrorLoad
        } else {
            ControllerReply::ErrorFileDoesNotExist
        };

        let Some(entry) = self.index.get(&name) else {
            let _ = reply.send(not_found_reply);
            return;
        };
        if entry.state != crate::index::FileState::StoreComplete {
            let _ = reply.send(not_found_reply);
            return;
        }

        let candidates: BTreeSet<u16> = entry
            .replicas
            .iter()
            .copied()
            .filter(|p| self.membership.contains(*p))
            .collect();
        let size = entry.size;

        match placement::choose_replica(&candidates) {
            Some(port) => {
                let _ = reply.send(ControllerReply::LoadFrom { port, size });
            }
            None => {
                let _ = reply.send(not_found_reply);
            }
        }
    }

    fn handle_remove(&mut self, name: String, reply: UnboundedSender<ControllerReply>) {
        let Some(entry) = self.index.get(&name) else {
            let _ = reply.send(ControllerReply::ErrorFileDoesNotExist);
            return;
        };
        if entry.state != crate::index::FileState::StoreComplete {
            let _ = reply.send(ControllerReply::ErrorFileDoesNotExist);
            return;
        }

        let active: BTreeSet<u16> = entry
            .replicas
            .iter()
            .copied()
            .filter(|p| self.membership.contains(*p))
            .collect();
        if active.is_empty() {
            let _ = reply.send(ControllerReply::ErrorFileDoesNotExist);
            return;
        }

        self.index.begin_remove(&name);
        for &port in &active {
            self.membership
                .send_to(port, ControllerCommand::Remove { name: name.clone() }.encode());
        }

        let generation = self
            .pending
            .insert(name.clone(), OpKind::Remove, active, reply);
        self.arm_timer(name, OpKind::Remove, generation);
    }

    fn arm_timer(&self, name: String, kind: OpKind, generation: u64) {
        let events = self.events.clone();
        let timeout = self.config.timeout();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = events.send(Event::Timeout {
                name,
                kind,
                generation,
            });
        });
    }

    fn handle_store_joined(&mut self, port: u16, commands: UnboundedSender<String>) {
        info!(port, "store joined");
        self.membership.join(port, StoreHandle::new(commands));
    }

    fn handle_store_left(&mut self, port: u16) {
        info!(port, "store left");
        self.membership.leave(port);
    }

    fn handle_store_ack(&mut self, port: u16, msg: StoreControlMessage) {
        let (name, expected_kind) = match &msg {
            StoreControlMessage::StoreAck { name } => (name.clone(), OpKind::Store),
            StoreControlMessage::RemoveAck { name } => (name.clone(), OpKind::Remove),
            StoreControlMessage::ErrorFileDoesNotExist { name } => {
                // The controller does not count this toward completion. A
                // lost file hangs its remove op until timeout.
                debug!(port, name = %name, "store reports file already absent on remove");
                return;
            }
            StoreControlMessage::Join(_) | StoreControlMessage::List(_) => {
                warn!(port, ?msg, "unexpected message on established store connection");
                return;
            }
        };

        // A store's ack only ever counts toward a pending op of the same
        // kind: a stray REMOVE_ACK can't complete a STORE, and vice versa.
        match self.pending.get(&name) {
            Some(op) if op.kind == expected_kind => {}
            Some(op) => {
                warn!(port, name = %name, expected = ?expected_kind, actual = ?op.kind, "ack kind does not match pending op, ignoring");
                return;
            }
            None => return,
        }

        if let Some(completed) = self.pending.ack(&name, port) {
            match completed.kind {
                OpKind::Store => {
                    self.index.complete_store(&name, completed.target_ports);
                    let _ = completed.reply.send(ControllerReply::StoreComplete);
                }
                OpKind::Remove => {
                    self.index.complete_remove(&name);
                    let _ = completed.reply.send(ControllerReply::RemoveComplete);
                }
            }
        }
    }

    fn handle_timeout(&mut self, name: String, kind: OpKind, generation: u64) {
        let Some(op) = self.pending.take_for_timeout(&name, generation) else {
            return;
        };
        debug!(name = %name, ?kind, "pending op timed out");
        match kind {
            OpKind::Store => {
                // Client gets no message; it is expected to apply its own
                // timeout.
                self.index.abandon_store(&name);
            }
            OpKind::Remove => {
                // Index entry stays REMOVE_IN_PROGRESS until a rebalancer
                // converges it.
            }
        }
        drop(op);
    }
}
