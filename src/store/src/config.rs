// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Startup parameters for the Store binary: `port`, `cport`, `timeout`,
/// `file_folder`, all positional.
#[derive(Debug, Clone, Parser)]
#[clap(name = "dfs-store")]
pub struct Config {
    /// Port this Store listens on for client connections.
    pub port: u16,

    /// The Controller's port, for the control-channel `JOIN`.
    pub cport: u16,

    /// Milliseconds to wait when connecting to the Controller before
    /// giving up.
    pub timeout_ms: u64,

    /// Local directory this Store persists files in. Reset to empty on
    /// startup.
    pub file_folder: PathBuf,
}

impl Config {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
