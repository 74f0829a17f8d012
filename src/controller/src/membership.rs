// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Controller's membership table: a map from Store port to a handle
//! the coordinator uses to fan commands out to that Store's connection
//! task. The per-connection task owns the socket; the table just owns a
//! channel to it.

use std::collections::BTreeMap;

use tokio::sync::mpsc::UnboundedSender;

/// A handle the coordinator uses to send a line to one Store's control
/// connection. The connection task on the other end of `commands` owns
/// the socket and writes whatever arrives here.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    commands: UnboundedSender<String>,
}

impl StoreHandle {
    pub fn new(commands: UnboundedSender<String>) -> Self {
        Self { commands }
    }

    /// Sends an already-encoded command line. Returns `false` if the
    /// connection task has already exited (its receiver dropped) — the
    /// caller should treat the Store as gone, though in practice the
    /// membership entry is removed promptly on disconnect.
    pub fn send(&self, line: String) -> bool {
        self.commands.send(line).is_ok()
    }
}

/// `BTreeMap<u16, _>` so that "first R in iteration order" is
/// ascending-port order: deterministic and testable.
#[derive(Debug, Default)]
pub struct Membership {
    stores: BTreeMap<u16, StoreHandle>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn contains(&self, port: u16) -> bool {
        self.stores.contains_key(&port)
    }

    /// Called only from `JOIN` handling, so a port is never present in
    /// placement until it is genuinely connected.
    pub fn join(&mut self, port: u16, handle: StoreHandle) {
        self.stores.insert(port, handle);
    }

    /// Spec §4.1 "Membership loss": removed immediately, atomically with
    /// respect to any concurrent placement decision, because both run on
    /// the single coordinator task.
    pub fn leave(&mut self, port: u16) {
        self.stores.remove(&port);
    }

    pub fn send_to(&self, port: u16, line: String) -> bool {
        match self.stores.get(&port) {
            Some(handle) => handle.send(line),
            None => false,
        }
    }

    /// Every currently-connected port, ascending.
    pub fn ports(&self) -> Vec<u16> {
        self.stores.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> StoreHandle {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        StoreHandle::new(tx)
    }

    #[test]
    fn join_then_leave_round_trips_membership() {
        let mut m = Membership::new();
        m.join(8001, handle());
        assert!(m.contains(8001));
        assert_eq!(m.len(), 1);

        m.leave(8001);
        assert!(!m.contains(8001));
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn ports_are_ascending() {
        let mut m = Membership::new();
        m.join(8002, handle());
        m.join(8001, handle());
        m.join(8003, handle());
        assert_eq!(m.ports(), vec![8001, 8002, 8003]);
    }

    #[test]
    fn send_to_absent_port_fails() {
        let m = Membership::new();
        assert!(!m.send_to(9999, "LIST".to_string()));
    }
}
