// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Controller: single coordinator for the distributed file store's
//! membership table, file index, and pending store/remove operations.

pub mod config;
mod coordinator;
mod index;
mod membership;
mod pending;
mod placement;
pub mod server;

use tokio::sync::{mpsc::UnboundedSender, oneshot};
use tracing::info;

pub use config::Config;
pub use coordinator::{Event, Snapshot};

/// A handle to a running coordinator task.
///
/// Cloning is cheap: every clone shares the same event channel, so any
/// number of connection tasks (and tests) can address the same
/// coordinator.
#[derive(Clone)]
pub struct Controller {
    events: UnboundedSender<Event>,
}

impl Controller {
    /// Spawns a coordinator task and returns a handle to it.
    pub fn spawn(config: Config) -> Self {
        Controller {
            events: coordinator::Coordinator::spawn(config),
        }
    }

    /// The event channel connection tasks should use to talk to this
    /// Controller's coordinator.
    pub fn events(&self) -> UnboundedSender<Event> {
        self.events.clone()
    }

    /// A read-only snapshot of current membership/index/pending-op counts.
    pub async fn snapshot(&self) -> Snapshot {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(Event::Snapshot(tx))
            .expect("coordinator task should not drop first");
        rx.await.expect("coordinator task should not drop reply")
    }

    /// Logs a final snapshot of membership/index/pending-op state. Called
    /// once the acceptor has stopped taking new connections (e.g. on
    /// Ctrl-C); the coordinator task and any still-open connections are
    /// dropped when the process exits immediately afterwards.
    pub async fn shutdown(&self) {
        let snapshot = self.snapshot().await;
        info!(
            members = snapshot.members,
            indexed_files = snapshot.indexed_files,
            pending_ops = snapshot.pending_ops,
            "controller shutting down"
        );
    }
}
