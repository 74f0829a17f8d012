// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::time::Duration;

use clap::Parser;

/// Startup parameters for the Controller binary: `cport`, `R`, `timeout`,
/// `rebalance_period`, all positional.
#[derive(Debug, Clone, Parser)]
#[clap(name = "dfs-controller")]
pub struct Config {
    /// Port the Controller listens on for both Store and client connections.
    pub cport: u16,

    /// Replication factor: the number of Stores each stored file is placed
    /// on.
    #[clap(value_parser = clap::value_parser!(u16).range(1..))]
    pub replication_factor: u16,

    /// Milliseconds to wait for a pending store/remove op to ack before it
    /// is abandoned.
    pub timeout_ms: u64,

    /// Milliseconds between rebalance passes. Retained for interface
    /// compatibility; unused by the core coordinator.
    pub rebalance_period_ms: u64,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn replication_factor(&self) -> usize {
        self.replication_factor as usize
    }
}
