// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use dfs_store::{client_server, control, Config, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let storage = Storage::new(config.file_folder.clone());
    storage.reset().await?;

    let (acks_tx, acks_rx) = mpsc::unbounded_channel();

    let control_task = control::run(
        config.port,
        config.cport,
        config.dial_timeout(),
        storage.clone(),
        acks_rx,
    );
    let client_task = client_server::serve(config.port, storage, acks_tx);

    tokio::select! {
        result = control_task => result,
        result = client_task => result,
    }
}
