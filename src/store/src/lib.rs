// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The Store: owns a local directory, serves bulk bytes to clients, and
//! executes index-changing commands issued by the Controller.

pub mod client_server;
pub mod config;
pub mod control;
pub mod errors;
pub mod storage;

pub use config::Config;
pub use errors::StoreError;
pub use storage::Storage;
